//! Admission checks applied to each selected file before it is queued.

use fileuploader_protocol::{FileEntry, RejectReason, UploadConfig};

/// Decides whether `entry` may enter the queue.
///
/// Size is checked first, so an oversized file of the wrong type reports
/// [`RejectReason::SizeLimitExceeded`]. The type check looks for the entry's
/// MIME subtype anywhere inside `config.accept`: it is a substring test, not a
/// list lookup, so `"pn"` passes against `"image/png"`, and an entry with no
/// detectable type (empty subtype) always passes.
pub fn validate_entry(entry: &FileEntry, config: &UploadConfig) -> Result<(), RejectReason> {
    if entry.size() > config.file_size_limit {
        return Err(RejectReason::SizeLimitExceeded);
    }
    if !config.accept.contains(entry.extension()) {
        return Err(RejectReason::TypeNotAccepted);
    }
    Ok(())
}
