//! Building candidates from files on disk.
//!
//! Stands in for a file picker: each path is turned into a [`Candidate`]
//! carrying its size, modification time and a MIME type guessed from the
//! file extension.

use std::path::Path;

use chrono::{DateTime, Utc};
use fileuploader_protocol::Candidate;
use tracing::debug;

use crate::error::UploadError;

/// Reads the metadata of a single file.
///
/// Files with an unknown extension are typed `application/octet-stream`.
pub fn candidate_from_path(path: &Path) -> Result<Candidate, UploadError> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(UploadError::NotAFile(path.to_path_buf()));
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut candidate = Candidate::new(path, metadata.len(), mime.essence_str());
    if let Ok(modified) = metadata.modified() {
        candidate = candidate.with_last_modified(DateTime::<Utc>::from(modified));
    }

    debug!(path = %path.display(), size = candidate.size, mime = %candidate.mime_type, "candidate");
    Ok(candidate)
}

/// Reads every path in order, failing on the first one that is missing or
/// not a regular file.
pub fn candidates_from_paths<I, P>(paths: I) -> Result<Vec<Candidate>, UploadError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|p| candidate_from_path(p.as_ref()))
        .collect()
}
