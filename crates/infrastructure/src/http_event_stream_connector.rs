use std::time::Duration;

use async_trait::async_trait;
use fundline_application::{RealtimeConnector, RealtimeStream};
use fundline_core::{AppError, AppResult, BearerToken};
use fundline_domain::RealtimeEvent;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, warn};
use url::Url;

use crate::reqwest_http_transport::{endpoint_url, parse_base_url, transport_error};


/// Path of the event stream below the API prefix.
pub const EVENT_STREAM_PATH: &str = "/events/stream";

/// Realtime connector reading newline-delimited JSON events from a long-lived
/// `GET` response. Lines prefixed with `data:` are accepted as well.
#[derive(Clone)]
pub struct HttpEventStreamConnector {
    http_client: reqwest::Client,
    base_url: Url,
    path: String,
}

impl HttpEventStreamConnector {
    /// Creates a connector for the stream under `base_url`.
    ///
    /// `connect_timeout` bounds connection setup only; the stream itself has
    /// no deadline.
    pub fn new(base_url: &str, connect_timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            http_client,
            base_url: parse_base_url(base_url)?,
            path: EVENT_STREAM_PATH.to_owned(),
        })
    }

    /// Overrides the stream path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[async_trait]
impl RealtimeConnector for HttpEventStreamConnector {
    async fn connect(&self, bearer: Option<BearerToken>) -> AppResult<RealtimeStream> {
        let url = endpoint_url(&self.base_url, self.path.as_str(), &[])?;
        let mut builder = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/x-ndjson");
        if let Some(bearer) = &bearer {
            builder = builder.header(AUTHORIZATION, bearer.header_value());
        }

        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(self.path.as_str(), &error))?;

        match response.status() {
            status if status.is_success() => {
                debug!(path = %self.path, "event stream opened");
                Ok(ndjson_events(response.bytes_stream()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized(
                "event stream rejected the credential".to_owned(),
            )),
            status => Err(AppError::Transport(format!(
                "event stream answered with status {status}"
            ))),
        }
    }
}

struct LineReader<S> {
    chunks: S,
    buffer: Vec<u8>,
    finished: bool,
}

impl<S> LineReader<S> {
    fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(position) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=position).collect();
            line.pop();
            return Some(line);
        }

        if self.finished && !self.buffer.is_empty() {
            return Some(std::mem::take(&mut self.buffer));
        }

        None
    }
}

/// Splits a byte stream into lines and decodes each as one event.
///
/// Blank lines and comments are skipped; malformed lines are logged and
/// skipped so one bad event does not drop the connection.
pub(crate) fn ndjson_events<S, B>(chunks: S) -> RealtimeStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let reader = LineReader {
        chunks: Box::pin(chunks),
        buffer: Vec::new(),
        finished: false,
    };

    futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(line) = reader.next_line() {
                match decode_line(&line) {
                    Some(event) => return Some((Ok(event), reader)),
                    None => continue,
                }
            }

            if reader.finished {
                return None;
            }

            match reader.chunks.next().await {
                Some(Ok(chunk)) => reader.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(error)) => {
                    reader.finished = true;
                    reader.buffer.clear();
                    return Some((Err(transport_error(EVENT_STREAM_PATH, &error)), reader));
                }
                None => reader.finished = true,
            }
        }
    })
    .boxed()
}

fn decode_line(line: &[u8]) -> Option<RealtimeEvent> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    let payload = text.strip_prefix("data:").map_or(text, str::trim_start);
    if payload.is_empty() || payload.starts_with(':') {
        return None;
    }

    match serde_json::from_str::<RealtimeEvent>(payload) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!(error = %error, "skipping malformed realtime event");
            None
        }
    }
}
