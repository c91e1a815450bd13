//! Runs one upload batch: select, upload sequentially, report.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use fileuploader::{Uploader, candidates_from_paths};
use fileuploader_transfer::HttpTransport;
use tracing::{debug, info, warn};

use crate::config::Settings;

/// Outcome counts for a finished run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub queued: usize,
    pub rejected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.rejected == 0 && self.failed == 0
    }
}

/// Uploads `paths` with the given settings and returns what happened.
pub async fn run(settings: Settings, mut paths: Vec<PathBuf>) -> anyhow::Result<Report> {
    if !settings.upload.multiple && paths.len() > 1 {
        warn!(
            given = paths.len(),
            "multiple selection is disabled, only the first file is used"
        );
        paths.truncate(1);
    }

    let candidates = candidates_from_paths(&paths)?;
    let (transport, mut events) = HttpTransport::channel(settings.timeout)?;
    let auto = settings.upload.auto;
    let mut uploader = Uploader::new(settings.upload, transport)?;

    let report = Rc::new(RefCell::new(Report::default()));
    register_callbacks(&mut uploader, &report);

    let summary = uploader.select_files(candidates);
    info!(selected = summary.selected, queued = summary.queued, "files selected");
    if !auto {
        uploader.start_upload();
    }
    uploader.run_until_idle(&mut events).await?;

    let report = report.borrow().clone();
    Ok(report)
}

fn register_callbacks(uploader: &mut Uploader<HttpTransport>, report: &Rc<RefCell<Report>>) {
    let r = Rc::clone(report);
    uploader.on_file_queued(move |_, entry| {
        r.borrow_mut().queued += 1;
        debug!(file = entry.name(), size = entry.size(), "queued");
    });

    let r = Rc::clone(report);
    uploader.on_file_queued_error(move |_, entry, reason| {
        r.borrow_mut().rejected += 1;
        warn!(file = entry.name(), size = entry.size(), code = reason.code(), "{reason}");
    });

    let mut last_percent = None;
    uploader.on_upload_progress(move |_, entry, fraction| {
        let percent = (fraction * 100.0).floor() as u32;
        if last_percent != Some((entry.id().to_string(), percent)) {
            debug!(file = entry.name(), percent, "progress");
            last_percent = Some((entry.id().to_string(), percent));
        }
    });

    let r = Rc::clone(report);
    uploader.on_upload_success(move |_, entry, body| {
        r.borrow_mut().succeeded += 1;
        info!(file = entry.name(), response = body, "uploaded");
    });

    let r = Rc::clone(report);
    uploader.on_upload_error(move |_, entry, failure| {
        r.borrow_mut().failed += 1;
        warn!(file = entry.name(), %failure, "upload failed");
    });

    uploader.on_upload_complete(|_| info!("all uploads finished"));
}
