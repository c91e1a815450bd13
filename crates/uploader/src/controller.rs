//! Upload controller.
//!
//! Owns the queue and drives at most one upload at a time. Selected files
//! are validated and queued; `start_upload` takes the head of the queue and
//! hands it to the transport; every terminal transport event advances to the
//! next entry until the queue is drained, at which point `uploadComplete`
//! fires once and the queue is discarded.

use std::collections::BTreeMap;

use fileuploader_protocol::{
    AttemptId, Candidate, FileEntry, QueueSummary, SUCCESS_STATUS, TransportEvent, UploadConfig,
    UploadRequest,
};
use fileuploader_transfer::{Transport, progress_fraction};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::UploadError;
use crate::events::{Control, Handlers, SelectionControl, UploadEvent, UploadFailure};
use crate::queue::Queue;
use crate::validation::validate_entry;

enum State<H> {
    Idle,
    Queueing,
    Uploading(InFlight<H>),
}

struct InFlight<H> {
    attempt: AttemptId,
    entry: FileEntry,
    /// `None` before the transport accepted the request and after it failed.
    handle: Option<H>,
    /// Set when the transport failed and the queue was told not to advance.
    stalled: bool,
}

/// Sequential upload queue driving a [`Transport`].
pub struct Uploader<T: Transport> {
    config: UploadConfig,
    transport: T,
    queue: Option<Queue<FileEntry>>,
    state: State<T::Handle>,
    handlers: Handlers,
    selection: Option<Box<dyn SelectionControl>>,
    next_attempt: u64,
    deferred_start: bool,
}

impl<T: Transport> Uploader<T> {
    /// Creates an idle uploader. Fails if `config` does not validate.
    pub fn new(config: UploadConfig, transport: T) -> Result<Self, UploadError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            queue: None,
            state: State::Idle,
            handlers: Handlers::default(),
            selection: None,
            next_attempt: 0,
            deferred_start: false,
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Replaces the extra form fields sent with every following upload.
    pub fn replace_post_params(&mut self, params: BTreeMap<String, String>) {
        self.config.post_params = params;
    }

    pub fn set_post_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.config.post_params.insert(name.into(), value.into());
    }

    /// Attaches the control that gets reset once all uploads are done.
    pub fn bind_selection(&mut self, control: impl SelectionControl + 'static) {
        self.selection = Some(Box::new(control));
    }

    // -- callbacks --

    pub fn on_file_queued(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry) + 'static,
    ) -> &mut Self {
        self.handlers.file_queued = Some(Box::new(f));
        self
    }

    pub fn on_file_queued_error(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry, fileuploader_protocol::RejectReason) + 'static,
    ) -> &mut Self {
        self.handlers.file_queued_error = Some(Box::new(f));
        self
    }

    pub fn on_files_queued_complete(
        &mut self,
        f: impl FnMut(&mut Control, QueueSummary) + 'static,
    ) -> &mut Self {
        self.handlers.files_queued_complete = Some(Box::new(f));
        self
    }

    /// Registers a callback for the reserved `uploadStart` event. Stored but
    /// never invoked.
    pub fn on_upload_start(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry) + 'static,
    ) -> &mut Self {
        self.handlers.upload_start = Some(Box::new(f));
        self
    }

    pub fn on_upload_progress(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry, f64) + 'static,
    ) -> &mut Self {
        self.handlers.upload_progress = Some(Box::new(f));
        self
    }

    pub fn on_upload_success(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry, &str) + 'static,
    ) -> &mut Self {
        self.handlers.upload_success = Some(Box::new(f));
        self
    }

    /// Called when an attempt gets a non-200 answer or fails in transport.
    pub fn on_upload_error(
        &mut self,
        f: impl FnMut(&mut Control, &FileEntry, &UploadFailure) + 'static,
    ) -> &mut Self {
        self.handlers.upload_error = Some(Box::new(f));
        self
    }

    pub fn on_upload_complete(&mut self, f: impl FnMut(&mut Control) + 'static) -> &mut Self {
        self.handlers.upload_complete = Some(Box::new(f));
        self
    }

    pub fn clear_handlers(&mut self) {
        self.handlers = Handlers::default();
    }

    // -- queue inspection --

    /// Pending entries, head first. The in-flight entry is not included.
    pub fn queued(&self) -> Vec<FileEntry> {
        self.queue.as_ref().map(Queue::to_vec).unwrap_or_default()
    }

    /// The entry currently being uploaded.
    pub fn current(&self) -> Option<&FileEntry> {
        match &self.state {
            State::Uploading(in_flight) => Some(&in_flight.entry),
            _ => None,
        }
    }

    /// `true` when nothing is in flight.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// `true` when the in-flight attempt failed in transport and is not
    /// going to advance on its own.
    pub fn is_stalled(&self) -> bool {
        matches!(&self.state, State::Uploading(in_flight) if in_flight.stalled)
    }

    /// Removes a pending entry by id.
    pub fn remove(&mut self, entry_id: &str) -> Option<FileEntry> {
        let removed = self.queue.as_mut()?.remove_where(|e| e.id() == entry_id);
        if let Some(entry) = &removed {
            debug!(entry = entry.id(), name = entry.name(), "removed from queue");
        }
        removed
    }

    /// Drops every pending entry. The in-flight upload, if any, carries on.
    pub fn clear_queue(&mut self) -> usize {
        let Some(queue) = self.queue.as_mut() else {
            return 0;
        };
        let dropped = queue.len();
        queue.clear();
        debug!(dropped, "queue cleared");
        dropped
    }

    // -- operations --

    /// Validates and queues a selection, in order.
    ///
    /// Each candidate produces either `fileQueued` or `fileQueuedError`,
    /// then `filesQueuedComplete` fires once for the batch (also for an
    /// empty one). Uploading starts afterwards when `auto` is set or a
    /// callback asked for it.
    pub fn select_files<I>(&mut self, candidates: I) -> QueueSummary
    where
        I: IntoIterator<Item = Candidate>,
    {
        let was_idle = matches!(self.state, State::Idle);
        if was_idle {
            self.state = State::Queueing;
        }
        self.queue.get_or_insert_with(Queue::new);

        let mut selected = 0;
        for candidate in candidates {
            selected += 1;
            let entry = FileEntry::new(candidate);
            let control = match validate_entry(&entry, &self.config) {
                Ok(()) => {
                    self.queue.get_or_insert_with(Queue::new).add(entry.clone());
                    debug!(entry = entry.id(), name = entry.name(), size = entry.size(), "queued");
                    self.handlers.dispatch(UploadEvent::FileQueued(&entry))
                }
                Err(reason) => {
                    debug!(name = entry.name(), size = entry.size(), %reason, "rejected");
                    self.handlers.dispatch(UploadEvent::FileQueuedError(&entry, reason))
                }
            };
            self.honor(control);
        }

        let queued = self.queue.as_ref().map_or(0, Queue::len);
        let summary = QueueSummary { selected, queued };
        if was_idle {
            self.state = State::Idle;
        }
        info!(selected, queued, "selection processed");

        let control = self
            .handlers
            .dispatch(UploadEvent::FilesQueuedComplete(summary));
        let deferred = std::mem::take(&mut self.deferred_start);
        if deferred || control.start_requested() || self.config.auto {
            self.start_upload();
        }
        summary
    }

    /// Starts the next upload.
    ///
    /// No-op while an upload is in flight or when nothing was ever queued.
    /// An empty queue ends the batch: the queue is discarded, the selection
    /// control is reset and `uploadComplete` fires. Entries the transport
    /// refuses outright are skipped in a loop when
    /// `advance_on_transport_error` is set.
    pub fn start_upload(&mut self) {
        loop {
            match self.state {
                State::Uploading(_) => {
                    debug!("upload already in flight");
                    return;
                }
                State::Queueing => {
                    self.deferred_start = true;
                    return;
                }
                State::Idle => {}
            }

            let Some(queue) = self.queue.as_mut() else {
                debug!("nothing queued");
                return;
            };
            let Some(entry) = queue.take() else {
                self.finish_batch();
                return;
            };
            if !self.begin(entry) {
                return;
            }
        }
    }

    /// Hands `entry` to the transport. Returns `true` when the transport
    /// refused it and the attempt was already cleared to move on.
    fn begin(&mut self, entry: FileEntry) -> bool {
        self.next_attempt += 1;
        let attempt = AttemptId(self.next_attempt);
        let request = UploadRequest::new(attempt, entry.clone(), &self.config);
        info!(
            %attempt,
            entry = entry.id(),
            name = entry.name(),
            size = entry.size(),
            "upload started"
        );

        // In flight before the transport sees it, so events always find it.
        self.state = State::Uploading(InFlight {
            attempt,
            entry,
            handle: None,
            stalled: false,
        });

        match self.transport.begin(request) {
            Ok(handle) => {
                if let State::Uploading(in_flight) = &mut self.state {
                    in_flight.handle = Some(handle);
                }
                false
            }
            Err(e) => self.transport_failed(e.to_string()),
        }
    }

    fn finish_batch(&mut self) {
        self.queue = None;
        if let Some(selection) = self.selection.as_mut() {
            selection.reset();
        }
        info!("all uploads finished");
        let control = self.handlers.dispatch(UploadEvent::UploadComplete);
        self.honor(control);
    }

    /// Feeds a transport event into the state machine.
    ///
    /// Events for an attempt other than the one in flight are ignored.
    pub fn handle(&mut self, event: TransportEvent) {
        let accepted = matches!(
            &self.state,
            State::Uploading(in_flight)
                if in_flight.attempt == event.attempt() && !in_flight.stalled
        );
        if !accepted {
            debug!(attempt = %event.attempt(), "ignoring event for stale attempt");
            return;
        }

        match event {
            TransportEvent::Progress { loaded, total, .. } => {
                let fraction = progress_fraction(loaded, total);
                if let State::Uploading(in_flight) = &self.state {
                    let control = self
                        .handlers
                        .dispatch(UploadEvent::UploadProgress(&in_flight.entry, fraction));
                    self.honor(control);
                }
            }
            TransportEvent::Completed { status, body, .. } => self.completed(status, &body),
            TransportEvent::Failed { error, .. } => {
                if self.transport_failed(error) {
                    self.start_upload();
                }
            }
        }
    }

    fn completed(&mut self, status: u16, body: &str) {
        let State::Uploading(in_flight) = std::mem::replace(&mut self.state, State::Idle) else {
            return;
        };
        let InFlight {
            attempt,
            entry,
            handle,
            ..
        } = in_flight;
        drop(handle);

        let control = if status == SUCCESS_STATUS {
            info!(%attempt, entry = entry.id(), "upload succeeded");
            self.handlers.dispatch(UploadEvent::UploadSuccess(&entry, body))
        } else {
            warn!(%attempt, entry = entry.id(), status, "server rejected upload");
            let failure = UploadFailure::Status(status);
            self.handlers.dispatch(UploadEvent::UploadError(&entry, &failure))
        };
        self.honor(control);
        self.start_upload();
    }

    /// Reports a transport failure for the in-flight attempt.
    ///
    /// Returns `true` when the attempt was cleared and the caller should
    /// start the next one, `false` when the queue stalls on it.
    fn transport_failed(&mut self, error: String) -> bool {
        let failure = UploadFailure::Transport(error);

        if self.config.advance_on_transport_error {
            let State::Uploading(in_flight) = std::mem::replace(&mut self.state, State::Idle)
            else {
                return false;
            };
            let InFlight {
                attempt,
                entry,
                handle,
                ..
            } = in_flight;
            drop(handle);

            warn!(%attempt, entry = entry.id(), %failure, "upload failed, moving on");
            // The caller advances regardless of what the callback asks for.
            self.handlers.dispatch(UploadEvent::UploadError(&entry, &failure));
            true
        } else {
            if let State::Uploading(in_flight) = &mut self.state {
                in_flight.stalled = true;
                in_flight.handle = None;

                warn!(
                    attempt = %in_flight.attempt,
                    entry = in_flight.entry.id(),
                    %failure,
                    "upload failed, queue stalled"
                );
                // Starting is a no-op while the stalled attempt is in flight.
                self.handlers.dispatch(UploadEvent::UploadError(&in_flight.entry, &failure));
            }
            false
        }
    }

    fn honor(&mut self, control: Control) {
        if control.start_requested() {
            self.start_upload();
        }
    }

    /// Feeds events from `events` until nothing is in flight.
    ///
    /// Returns [`UploadError::Stalled`] if an attempt fails in transport and
    /// `advance_on_transport_error` is off.
    pub async fn run_until_idle(
        &mut self,
        events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Result<(), UploadError> {
        loop {
            match &self.state {
                State::Uploading(in_flight) if in_flight.stalled => {
                    return Err(UploadError::Stalled {
                        entry: in_flight.entry.id().to_string(),
                    });
                }
                State::Uploading(_) => {}
                State::Idle | State::Queueing => return Ok(()),
            }

            match events.recv().await {
                Some(event) => self.handle(event),
                None => return Err(UploadError::ChannelClosed),
            }
        }
    }
}
