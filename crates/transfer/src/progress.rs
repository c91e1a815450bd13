use std::io;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use fileuploader_protocol::{AttemptId, TransportEvent};

/// Fraction of an upload completed, clamped to `[0, 1]`.
///
/// Returns 0 when the total is unknown or zero.
pub fn progress_fraction(loaded: u64, total: Option<u64>) -> f64 {
    match total {
        Some(total) if total > 0 => (loaded as f64 / total as f64).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Wraps a body stream so every chunk that goes out is reported as progress.
pub(crate) fn with_progress<S>(
    stream: S,
    attempt: AttemptId,
    total: Option<u64>,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let mut loaded: u64 = 0;
    stream.map(move |chunk| {
        if let Ok(bytes) = &chunk {
            loaded += bytes.len() as u64;
            // The receiver may already be gone if the controller was dropped.
            let _ = events.send(TransportEvent::Progress {
                attempt,
                loaded,
                total,
            });
        }
        chunk
    })
}
