use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ENTRY_ID_PREFIX;

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(0);

/// A file as handed over by the selection control, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    /// Media type, e.g. `image/png`. May be empty when unknown.
    pub mime_type: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Creates a candidate without touching the filesystem.
    ///
    /// The display name is the final path component.
    pub fn new(path: impl Into<PathBuf>, size: u64, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            size,
            mime_type: mime_type.into(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}

/// Normalized descriptor of one selected file.
///
/// Metadata is captured once at selection time and never changes. The
/// `path` is shared with the host; the entry never owns the file itself.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    id: String,
    path: Arc<Path>,
    name: String,
    size: u64,
    mime_type: String,
    extension: String,
    last_modified: Option<DateTime<Utc>>,
}

impl FileEntry {
    /// Wraps a candidate and assigns the next process-unique identifier.
    pub fn new(candidate: Candidate) -> Self {
        let n = NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed);
        let extension = extension_of(&candidate.mime_type).to_string();
        Self {
            id: format!("{ENTRY_ID_PREFIX}{n}"),
            path: Arc::from(candidate.path),
            name: candidate.name,
            size: candidate.size,
            mime_type: candidate.mime_type,
            extension,
            last_modified: candidate.last_modified,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared handle to the selected file on disk.
    pub fn path(&self) -> &Arc<Path> {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes as reported at selection time.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// MIME subtype, e.g. `png` for `image/png`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }
}

impl From<Candidate> for FileEntry {
    fn from(candidate: Candidate) -> Self {
        Self::new(candidate)
    }
}

/// Returns everything after the first `/`, or the whole string if there is none.
fn extension_of(mime_type: &str) -> &str {
    match mime_type.find('/') {
        Some(slash) => &mime_type[slash + 1..],
        None => mime_type,
    }
}

/// Why a candidate was kept out of the queue.
///
/// The numeric codes are stable and part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum RejectReason {
    #[error("File is too big")]
    SizeLimitExceeded = 1,
    #[error("Filetype is invalid")]
    TypeNotAccepted = 2,
}

impl RejectReason {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<RejectReason> for u8 {
    fn from(reason: RejectReason) -> Self {
        reason.code()
    }
}

impl TryFrom<u8> for RejectReason {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::SizeLimitExceeded),
            2 => Ok(Self::TypeNotAccepted),
            other => Err(format!("unknown reject reason code: {other}")),
        }
    }
}

/// Summary reported once a selected batch has been validated and queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    /// Number of candidates in the selection.
    pub selected: usize,
    /// Queue length after the batch was added.
    pub queued: usize,
}
