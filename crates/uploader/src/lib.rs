//! Sequential queued file uploader.
//!
//! Files picked by the user are validated against the configured size limit
//! and accepted types, queued in selection order, and uploaded one at a time
//! over a pluggable [`Transport`](fileuploader_transfer::Transport). The host
//! observes the whole lifecycle through callbacks registered on [`Uploader`].
//!
//! # Lifecycle
//!
//! 1. **Select**: `select_files` validates each candidate, emitting
//!    `fileQueued` or `fileQueuedError`, then `filesQueuedComplete`
//! 2. **Upload**: `start_upload` sends the head of the queue; progress and
//!    the outcome arrive as transport events fed to `handle`
//! 3. **Advance**: each finished attempt starts the next one
//! 4. **Complete**: once the queue is drained `uploadComplete` fires once

pub mod controller;
pub mod error;
pub mod events;
pub mod queue;
pub mod selection;
pub mod validation;

pub use controller::Uploader;
pub use error::UploadError;
pub use events::{Control, SelectionControl, UploadEvent, UploadFailure};
pub use queue::Queue;
pub use selection::{candidate_from_path, candidates_from_paths};
pub use validation::validate_entry;

pub use fileuploader_protocol::{
    Candidate, FileEntry, QueueSummary, RejectReason, UploadConfig, UploadOptions,
};
