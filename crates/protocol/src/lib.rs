//! Data types shared by the upload queue, the controller and transports.
//!
//! Nothing in this crate performs I/O. The types describe selected files,
//! validation outcomes, uploader configuration and the contract between the
//! controller and a transport.

pub mod config;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use config::{ConfigError, UploadConfig, UploadOptions};
pub use messages::{AttemptId, BodyEncoding, TransportEvent, UploadRequest};
pub use types::{Candidate, FileEntry, QueueSummary, RejectReason};

/// Form field the file is sent under when none is configured.
pub const DEFAULT_FIELD_NAME: &str = "xeditorfile";

/// MIME subtypes accepted when none are configured.
pub const DEFAULT_ACCEPT: &str = "image/jpg, image/jpeg, image/png, image/gif";

/// Largest accepted file size when none is configured (1 MiB, inclusive).
pub const DEFAULT_FILE_SIZE_LIMIT: u64 = 1024 * 1024;

/// HTTP method used for every upload request.
pub const UPLOAD_METHOD: &str = "POST";

/// Content type sent with raw binary bodies.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// The only status code treated as a successful upload.
pub const SUCCESS_STATUS: u16 = 200;

/// Prefix of synthetic file entry identifiers.
pub const ENTRY_ID_PREFIX: &str = "file-";
