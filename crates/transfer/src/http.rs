//! HTTP transport built on `reqwest`.
//!
//! Each attempt runs as its own tokio task and streams the file from disk,
//! so `begin` returns immediately. Progress and the final outcome go out on
//! an unbounded channel as [`TransportEvent`]s.

use std::collections::BTreeMap;
use std::time::Duration;

use fileuploader_protocol::{BINARY_CONTENT_TYPE, BodyEncoding, TransportEvent, UploadRequest};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::progress::with_progress;
use crate::{PROGRESS_CHUNK_SIZE, TransferError, Transport};

/// Keeps one attempt alive. Dropping it cancels the attempt's task.
#[derive(Debug)]
pub struct AttemptGuard {
    _cancel: DropGuard,
}

/// Uploads files with `reqwest`, one task per attempt.
pub struct HttpTransport {
    client: reqwest::Client,
    /// Same settings plus a cookie store, used when credentials are requested.
    credentialed: reqwest::Client,
    events: mpsc::UnboundedSender<TransportEvent>,
    runtime: tokio::runtime::Handle,
}

impl HttpTransport {
    /// Creates a transport reporting to `events`.
    ///
    /// Must be called from within a tokio runtime. `timeout` bounds each
    /// whole request; `None` waits indefinitely.
    pub fn new(
        events: mpsc::UnboundedSender<TransportEvent>,
        timeout: Option<Duration>,
    ) -> Result<Self, TransferError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransferError::NoRuntime)?;

        let mut plain = reqwest::Client::builder();
        let mut credentialed = reqwest::Client::builder().cookie_store(true);
        if let Some(timeout) = timeout {
            plain = plain.timeout(timeout);
            credentialed = credentialed.timeout(timeout);
        }

        Ok(Self {
            client: plain.build()?,
            credentialed: credentialed.build()?,
            events,
            runtime,
        })
    }

    /// Creates a transport together with the receiving end of its event channel.
    pub fn channel(
        timeout: Option<Duration>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransferError> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok((Self::new(tx, timeout)?, rx))
    }

    fn client_for(&self, request: &UploadRequest) -> reqwest::Client {
        if request.with_credentials {
            self.credentialed.clone()
        } else {
            self.client.clone()
        }
    }
}

impl Transport for HttpTransport {
    type Handle = AttemptGuard;

    fn begin(&mut self, request: UploadRequest) -> Result<AttemptGuard, TransferError> {
        // Bad headers fail the call itself, not the task.
        header_map(&request.headers)?;

        let client = self.client_for(&request);
        let events = self.events.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        debug!(
            attempt = %request.attempt,
            entry = request.entry.id(),
            server = %request.server,
            encoding = ?request.encoding,
            "starting upload"
        );

        self.runtime.spawn(async move {
            let attempt = request.attempt;
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!(%attempt, "upload task cancelled");
                    return;
                }
                outcome = perform(&client, &request, events.clone()) => outcome,
            };

            let event = match outcome {
                Ok((status, body)) => TransportEvent::Completed {
                    attempt,
                    status,
                    body,
                },
                Err(e) => {
                    warn!(%attempt, error = %e, "upload request failed");
                    TransportEvent::Failed {
                        attempt,
                        error: e.to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });

        Ok(AttemptGuard {
            _cancel: cancel.drop_guard(),
        })
    }
}

async fn perform(
    client: &reqwest::Client,
    request: &UploadRequest,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> Result<(u16, String), TransferError> {
    let builder = build_request(client, request, events).await?;
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    debug!(attempt = %request.attempt, status, "server responded");
    Ok((status, body))
}

/// Opens the file and assembles the POST request for one attempt.
pub(crate) async fn build_request(
    client: &reqwest::Client,
    request: &UploadRequest,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> Result<reqwest::RequestBuilder, TransferError> {
    let file = tokio::fs::File::open(request.entry.path()).await?;
    let total = file.metadata().await?.len();

    let stream = with_progress(
        ReaderStream::with_capacity(file, PROGRESS_CHUNK_SIZE),
        request.attempt,
        Some(total),
        events,
    );
    let body = reqwest::Body::wrap_stream(stream);

    let mut headers = header_map(&request.headers)?;
    let builder = client.post(&request.server);

    match request.encoding {
        BodyEncoding::Multipart => {
            let mut form = Form::new();
            for (name, value) in &request.post_params {
                form = form.text(name.clone(), value.clone());
            }

            let mut part =
                Part::stream_with_length(body, total).file_name(request.entry.name().to_string());
            if !request.entry.mime_type().is_empty() {
                part = part.mime_str(request.entry.mime_type())?;
            }
            form = form.part(request.field_name.clone(), part);

            Ok(builder.headers(headers).multipart(form))
        }
        BodyEncoding::Binary => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(BINARY_CONTENT_TYPE));
            Ok(builder.headers(headers).body(body))
        }
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, TransferError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransferError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| TransferError::InvalidHeader(name.clone()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
