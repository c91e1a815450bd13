//! Contract between the upload controller and a transport.
//!
//! The controller builds one [`UploadRequest`] per attempt and tags it with a
//! fresh [`AttemptId`]. The transport reports back with [`TransportEvent`]s
//! carrying the same id, which lets the controller drop late events that
//! belong to an attempt it has already finished.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::UploadConfig;
use crate::UPLOAD_METHOD;
use crate::types::FileEntry;

/// Identifies one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

/// How the file is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyEncoding {
    /// `multipart/form-data`: post params first, then the file.
    Multipart,
    /// The file bytes alone, sent as `application/octet-stream`.
    Binary,
}

/// Everything a transport needs to perform one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub attempt: AttemptId,
    pub entry: FileEntry,
    pub server: String,
    pub field_name: String,
    pub post_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub encoding: BodyEncoding,
    pub with_credentials: bool,
}

impl UploadRequest {
    /// Snapshots the current configuration for one attempt.
    pub fn new(attempt: AttemptId, entry: FileEntry, config: &UploadConfig) -> Self {
        let encoding = if config.use_form_data {
            BodyEncoding::Multipart
        } else {
            BodyEncoding::Binary
        };
        Self {
            attempt,
            entry,
            server: config.server.clone(),
            field_name: config.field_name.clone(),
            post_params: config.post_params.clone(),
            headers: config.headers.clone(),
            encoding,
            with_credentials: config.with_credentials,
        }
    }

    /// Always `POST`.
    pub fn method(&self) -> &'static str {
        UPLOAD_METHOD
    }
}

/// Notification from a transport about an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportEvent {
    /// Bytes sent so far. `total` is `None` when the length is not computable.
    Progress {
        attempt: AttemptId,
        loaded: u64,
        total: Option<u64>,
    },
    /// The server answered.
    Completed {
        attempt: AttemptId,
        status: u16,
        body: String,
    },
    /// The request could not be completed (connection, I/O, timeout).
    Failed { attempt: AttemptId, error: String },
}

impl TransportEvent {
    pub fn attempt(&self) -> AttemptId {
        match self {
            Self::Progress { attempt, .. }
            | Self::Completed { attempt, .. }
            | Self::Failed { attempt, .. } => *attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadOptions;
    use crate::types::Candidate;

    fn entry() -> FileEntry {
        FileEntry::new(Candidate::new("/tmp/pic.png", 3, "image/png"))
    }

    #[test]
    fn request_snapshots_config() {
        let mut config =
            UploadConfig::default().merge(UploadOptions::default().server("http://h/up"));
        config.post_params.insert("k".into(), "v".into());
        config.headers.insert("X-Token".into(), "t".into());

        let req = UploadRequest::new(AttemptId(4), entry(), &config);
        config.post_params.clear();

        assert_eq!(req.method(), "POST");
        assert_eq!(req.server, "http://h/up");
        assert_eq!(req.field_name, "xeditorfile");
        assert_eq!(req.encoding, BodyEncoding::Multipart);
        assert_eq!(req.post_params.get("k").map(String::as_str), Some("v"));
        assert_eq!(req.headers.get("X-Token").map(String::as_str), Some("t"));
    }

    #[test]
    fn binary_encoding_when_form_data_disabled() {
        let config = UploadConfig::default().merge(UploadOptions::default().use_form_data(false));
        let req = UploadRequest::new(AttemptId(1), entry(), &config);
        assert_eq!(req.encoding, BodyEncoding::Binary);
    }

    #[test]
    fn event_attempt_accessor() {
        let ev = TransportEvent::Failed {
            attempt: AttemptId(9),
            error: "reset".into(),
        };
        assert_eq!(ev.attempt(), AttemptId(9));
        assert_eq!(AttemptId(9).to_string(), "attempt-9");
    }

    #[test]
    fn event_json_is_tagged() {
        let ev = TransportEvent::Completed {
            attempt: AttemptId(2),
            status: 200,
            body: "ok".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"], "completed");
        assert_eq!(json["status"], 200);
        let back: TransportEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }
}
