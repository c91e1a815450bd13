//! Lifecycle callbacks.
//!
//! The host registers at most one callback per event. Each callback gets a
//! [`Control`] it can use to ask for the next upload to start; the request is
//! honoured once the callback has returned, so a callback never re-enters the
//! uploader while it is in the middle of a transition.

use std::fmt;

use fileuploader_protocol::{FileEntry, QueueSummary, RejectReason};
use tracing::trace;

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// The server answered with a status other than 200.
    Status(u16),
    /// No answer: connection refused, I/O error, timeout.
    Transport(String),
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(code) => write!(f, "server responded with status {code}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// Handed to every callback.
#[derive(Debug, Default)]
pub struct Control {
    start_requested: bool,
}

impl Control {
    /// Asks the uploader to start the next upload.
    ///
    /// Has no effect while an upload is already in flight. During queueing
    /// the start is deferred until the whole selection has been queued.
    pub fn start_upload(&mut self) {
        self.start_requested = true;
    }

    pub fn start_requested(&self) -> bool {
        self.start_requested
    }
}

/// Cleared once every queued entry has been processed, so the same files
/// can be selected again.
pub trait SelectionControl {
    fn reset(&mut self);
}

impl<F: FnMut()> SelectionControl for F {
    fn reset(&mut self) {
        self()
    }
}

/// A lifecycle notification, borrowed for the duration of the dispatch.
#[derive(Debug, Clone, Copy)]
pub enum UploadEvent<'a> {
    FileQueued(&'a FileEntry),
    FileQueuedError(&'a FileEntry, RejectReason),
    FilesQueuedComplete(QueueSummary),
    /// Reserved; the uploader never emits it.
    UploadStart(&'a FileEntry),
    UploadProgress(&'a FileEntry, f64),
    UploadSuccess(&'a FileEntry, &'a str),
    UploadError(&'a FileEntry, &'a UploadFailure),
    UploadComplete,
}

impl UploadEvent<'_> {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FileQueued(..) => "fileQueued",
            Self::FileQueuedError(..) => "fileQueuedError",
            Self::FilesQueuedComplete(..) => "filesQueuedComplete",
            Self::UploadStart(..) => "uploadStart",
            Self::UploadProgress(..) => "uploadProgress",
            Self::UploadSuccess(..) => "uploadSuccess",
            Self::UploadError(..) => "uploadError",
            Self::UploadComplete => "uploadComplete",
        }
    }
}

type EntryFn = Box<dyn FnMut(&mut Control, &FileEntry)>;
type RejectFn = Box<dyn FnMut(&mut Control, &FileEntry, RejectReason)>;
type SummaryFn = Box<dyn FnMut(&mut Control, QueueSummary)>;
type ProgressFn = Box<dyn FnMut(&mut Control, &FileEntry, f64)>;
type SuccessFn = Box<dyn FnMut(&mut Control, &FileEntry, &str)>;
type FailureFn = Box<dyn FnMut(&mut Control, &FileEntry, &UploadFailure)>;
type DoneFn = Box<dyn FnMut(&mut Control)>;

/// One optional slot per event.
#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) file_queued: Option<EntryFn>,
    pub(crate) file_queued_error: Option<RejectFn>,
    pub(crate) files_queued_complete: Option<SummaryFn>,
    pub(crate) upload_start: Option<EntryFn>,
    pub(crate) upload_progress: Option<ProgressFn>,
    pub(crate) upload_success: Option<SuccessFn>,
    pub(crate) upload_error: Option<FailureFn>,
    pub(crate) upload_complete: Option<DoneFn>,
}

impl Handlers {
    /// Invokes the callback registered for `event`, if any.
    pub(crate) fn dispatch(&mut self, event: UploadEvent<'_>) -> Control {
        let mut control = Control::default();
        let called = match event {
            UploadEvent::FileQueued(entry) => {
                call(&mut self.file_queued, |f| f(&mut control, entry))
            }
            UploadEvent::FileQueuedError(entry, reason) => {
                call(&mut self.file_queued_error, |f| f(&mut control, entry, reason))
            }
            UploadEvent::FilesQueuedComplete(summary) => {
                call(&mut self.files_queued_complete, |f| f(&mut control, summary))
            }
            UploadEvent::UploadStart(entry) => {
                call(&mut self.upload_start, |f| f(&mut control, entry))
            }
            UploadEvent::UploadProgress(entry, fraction) => {
                call(&mut self.upload_progress, |f| f(&mut control, entry, fraction))
            }
            UploadEvent::UploadSuccess(entry, body) => {
                call(&mut self.upload_success, |f| f(&mut control, entry, body))
            }
            UploadEvent::UploadError(entry, failure) => {
                call(&mut self.upload_error, |f| f(&mut control, entry, failure))
            }
            UploadEvent::UploadComplete => call(&mut self.upload_complete, |f| f(&mut control)),
        };
        trace!(event = event.name(), called, "lifecycle event");
        control
    }
}

fn call<F: ?Sized>(slot: &mut Option<Box<F>>, invoke: impl FnOnce(&mut F)) -> bool {
    match slot.as_deref_mut() {
        Some(f) => {
            invoke(f);
            true
        }
        None => false,
    }
}
