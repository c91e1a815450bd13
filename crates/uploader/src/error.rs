//! Uploader error types.

use std::path::PathBuf;

/// Errors produced by the uploader.
///
/// Rejections and failed uploads are not errors at this level: they are
/// reported through the lifecycle callbacks and the queue moves on.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("config error: {0}")]
    Config(#[from] fileuploader_protocol::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("upload of {entry} stalled after a transport failure")]
    Stalled { entry: String },

    #[error("transport event channel closed")]
    ChannelClosed,
}
