//! Transport seam for sequential uploads, plus an HTTP implementation.
//!
//! The upload controller never talks to the network itself. It hands each
//! attempt to a [`Transport`] and later receives [`TransportEvent`]s for it.
//! [`HttpTransport`] is the stock implementation on top of `reqwest`.

mod http;
mod progress;

// Test helpers (unit tests, or dependents with the `test-helpers` feature)
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use fileuploader_protocol::{AttemptId, TransportEvent, UploadRequest};
pub use http::{AttemptGuard, HttpTransport};
pub use progress::progress_fraction;

/// Read size used when streaming a file body (64 KiB).
///
/// One progress event is emitted per read.
pub const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Issues upload requests on behalf of the controller.
///
/// `begin` must not block on the upload. Progress and the final outcome are
/// reported later as [`TransportEvent`]s tagged with `request.attempt`, which
/// the host feeds back into the controller. The returned handle scopes the
/// attempt: the controller keeps it while the attempt is in flight and drops
/// it as soon as the attempt is finished.
pub trait Transport {
    /// Per-attempt resource, released on drop.
    type Handle;

    fn begin(&mut self, request: UploadRequest) -> Result<Self::Handle, TransferError>;
}
