//! Sample stream over HTTP
//!
//! Opens a long-lived GET against the v2 sample stream endpoint with bearer
//! auth. The body is newline-delimited JSON; each line is one envelope.
//!
//! Status mapping:
//!
//! | Status | Error |
//! |---|---|
//! | 429 | `RateLimited` (from `retry-after` or `x-rate-limit-reset`) |
//! | 401, 403 | `AuthFailed` |
//! | 5xx | `ConnectionLost` |
//! | other non-2xx | `Other` |

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::{Error, Result};
use crate::record::RawMessage;

use super::credentials::Credentials;
use super::error::UpstreamError;
use super::{UpstreamConnection, UpstreamConnector};

/// Default sample stream endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.twitter.com/2/tweets/sample/stream";

/// Fields requested on every post
const TWEET_FIELDS: &str = "author_id,entities";

/// Longest line accepted before the connection is treated as broken
const MAX_LINE_SIZE: usize = 1024 * 1024;

/// Connector for the HTTP sample stream
#[derive(Debug, Clone)]
pub struct SampleStreamConnector {
    client: reqwest::Client,
    endpoint: String,
}

impl SampleStreamConnector {
    /// Create a connector for the default endpoint
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create a connector for a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("hashtag-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint this connector targets
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UpstreamConnector for SampleStreamConnector {
    type Connection = SampleStreamConnection;

    async fn connect(&self, credentials: &Credentials) -> std::result::Result<Self::Connection, UpstreamError> {
        let response = self
            .client
            .get(&self.endpoint)
            .bearer_auth(credentials.bearer_token())
            .query(&[("tweet.fields", TWEET_FIELDS)])
            .send()
            .await
            .map_err(|e| UpstreamError::ConnectionLost(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response.headers()));
        }

        tracing::debug!(endpoint = %self.endpoint, status = %status, "Sample stream connected");

        Ok(SampleStreamConnection {
            body: Some(response.bytes_stream().boxed()),
            buffer: BytesMut::new(),
        })
    }
}

/// A live sample stream response body
pub struct SampleStreamConnection {
    body: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    buffer: BytesMut,
}

impl SampleStreamConnection {
    /// Split the next complete line off the buffer
    fn take_line(&mut self) -> Option<BytesMut> {
        let pos = self.buffer.iter().position(|b| *b == b'\n')?;
        Some(self.buffer.split_to(pos + 1))
    }
}

#[async_trait]
impl UpstreamConnection for SampleStreamConnection {
    async fn next_message(&mut self) -> std::result::Result<Option<RawMessage>, UpstreamError> {
        loop {
            while let Some(line) = self.take_line() {
                // Keep-alive
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return RawMessage::from_stream_line(&line)
                    .map_err(|e| UpstreamError::Malformed(e.to_string()));
            }

            if self.buffer.len() > MAX_LINE_SIZE {
                self.buffer.clear();
                return Err(UpstreamError::ConnectionLost(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_SIZE
                )));
            }

            let body = self
                .body
                .as_mut()
                .ok_or_else(|| UpstreamError::ConnectionLost("connection closed".into()))?;

            match body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => return Err(UpstreamError::ConnectionLost(e.to_string())),
                None => {
                    self.body = None;
                    return Err(UpstreamError::ConnectionLost(
                        "stream closed by remote".into(),
                    ));
                }
            }
        }
    }

    async fn close(&mut self) {
        self.body = None;
        self.buffer.clear();
    }
}

/// Map a non-success status to an upstream error
pub fn classify_status(status: StatusCode, headers: &HeaderMap) -> UpstreamError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited {
            retry_after: retry_after(headers),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            UpstreamError::AuthFailed(format!("upstream returned {}", status))
        }
        s if s.is_server_error() => {
            UpstreamError::ConnectionLost(format!("upstream returned {}", status))
        }
        s => UpstreamError::Other(format!("upstream returned {}", s)),
    }
}

/// Read a retry hint from `retry-after` (seconds) or `x-rate-limit-reset` (epoch seconds)
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header("retry-after") {
        return Some(Duration::from_secs(secs));
    }

    let reset = header("x-rate-limit-reset")?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(reset.saturating_sub(now)))
}
