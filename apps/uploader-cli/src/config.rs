//! CLI configuration.
//!
//! Settings are read from TOML, by default from
//! - Linux: `~/.config/fileuploader/config.toml`
//! - Windows: `%APPDATA%/fileuploader/config.toml`
//!
//! Keys use the same camelCase names as the uploader options. Command-line
//! flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use fileuploader_protocol::{UploadConfig, UploadOptions};
use serde::Deserialize;

/// Contents of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(flatten)]
    pub upload: UploadOptions,

    /// Per-request timeout in seconds. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub upload: UploadConfig,
    pub timeout: Option<Duration>,
}

impl FileConfig {
    /// Reads `path`, or the default location when `None`.
    ///
    /// A missing file is only an error when the path was given explicitly.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (config_path(), false),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("config file not found: {}", path.display());
            }
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: FileConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies `overrides` on top of the file and validates the result.
    pub fn resolve(self, overrides: UploadOptions) -> anyhow::Result<Settings> {
        let upload = UploadConfig::default().merge(self.upload).merge(overrides);
        upload.validate()?;
        Ok(Settings {
            upload,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("fileuploader").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("fileuploader")
            .join("config.toml")
    }
}
