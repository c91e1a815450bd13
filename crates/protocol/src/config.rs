//! Uploader configuration.
//!
//! [`UploadConfig`] is the validated, effective configuration. Every field
//! has a documented default, and deserialization fills in any missing key
//! from [`UploadConfig::default`], so a config file only needs the keys it
//! changes. [`UploadOptions`] is the programmatic equivalent: a partial set
//! of overrides merged field by field over the defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_ACCEPT, DEFAULT_FIELD_NAME, DEFAULT_FILE_SIZE_LIMIT};

/// Errors from configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("server URL is not set")]
    EmptyServer,

    #[error("field name is empty")]
    EmptyFieldName,
}

/// Effective uploader configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    /// Upload endpoint.
    pub server: String,
    /// Multipart field name the file is sent under.
    pub field_name: String,
    /// Extra form fields sent with every multipart upload.
    pub post_params: BTreeMap<String, String>,
    /// Request headers, attached verbatim.
    pub headers: BTreeMap<String, String>,
    /// Multipart body when `true`, raw binary body otherwise.
    pub use_form_data: bool,
    /// Send and store cookies for the upload endpoint.
    pub with_credentials: bool,
    /// Start uploading as soon as a selection has been queued.
    pub auto: bool,
    /// Allow selecting more than one file at a time.
    pub multiple: bool,
    /// Comma-separated MIME types; matched against an entry's subtype by substring.
    pub accept: String,
    /// Inclusive upper bound on file size, in bytes.
    pub file_size_limit: u64,
    /// Move on to the next entry after a transport-level failure instead of
    /// leaving the attempt in flight.
    pub advance_on_transport_error: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            field_name: DEFAULT_FIELD_NAME.to_string(),
            post_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            use_form_data: true,
            with_credentials: false,
            auto: false,
            multiple: false,
            accept: DEFAULT_ACCEPT.to_string(),
            file_size_limit: DEFAULT_FILE_SIZE_LIMIT,
            advance_on_transport_error: false,
        }
    }
}

impl UploadConfig {
    /// Merges `options` over the defaults and validates the result.
    pub fn configure(options: UploadOptions) -> Result<Self, ConfigError> {
        let config = Self::default().merge(options);
        config.validate()?;
        Ok(config)
    }

    /// Shallow merge: each option that is set replaces the field wholesale.
    pub fn merge(mut self, options: UploadOptions) -> Self {
        let UploadOptions {
            server,
            field_name,
            post_params,
            headers,
            use_form_data,
            with_credentials,
            auto,
            multiple,
            accept,
            file_size_limit,
            advance_on_transport_error,
        } = options;

        if let Some(v) = server {
            self.server = v;
        }
        if let Some(v) = field_name {
            self.field_name = v;
        }
        if let Some(v) = post_params {
            self.post_params = v;
        }
        if let Some(v) = headers {
            self.headers = v;
        }
        if let Some(v) = use_form_data {
            self.use_form_data = v;
        }
        if let Some(v) = with_credentials {
            self.with_credentials = v;
        }
        if let Some(v) = auto {
            self.auto = v;
        }
        if let Some(v) = multiple {
            self.multiple = v;
        }
        if let Some(v) = accept {
            self.accept = v;
        }
        if let Some(v) = file_size_limit {
            self.file_size_limit = v;
        }
        if let Some(v) = advance_on_transport_error {
            self.advance_on_transport_error = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::EmptyServer);
        }
        if self.field_name.is_empty() {
            return Err(ConfigError::EmptyFieldName);
        }
        Ok(())
    }
}

/// Partial configuration; unset fields keep their current value on merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadOptions {
    pub server: Option<String>,
    pub field_name: Option<String>,
    pub post_params: Option<BTreeMap<String, String>>,
    pub headers: Option<BTreeMap<String, String>>,
    pub use_form_data: Option<bool>,
    pub with_credentials: Option<bool>,
    pub auto: Option<bool>,
    pub multiple: Option<bool>,
    pub accept: Option<String>,
    pub file_size_limit: Option<u64>,
    pub advance_on_transport_error: Option<bool>,
}

impl UploadOptions {
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = Some(auto);
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn file_size_limit(mut self, bytes: u64) -> Self {
        self.file_size_limit = Some(bytes);
        self
    }

    pub fn use_form_data(mut self, enabled: bool) -> Self {
        self.use_form_data = Some(enabled);
        self
    }
}
