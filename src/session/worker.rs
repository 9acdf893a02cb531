//! Session receive loop
//!
//! One worker task per session. Every suspension point (connect, next
//! message, backoff sleep) races the session's cancellation token.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::record::{decode, RawMessage};
use crate::relay::Relay;
use crate::upstream::{Credentials, UpstreamConnection, UpstreamConnector, UpstreamError};

use super::backoff::Backoff;
use super::config::SessionConfig;
use super::state::SessionState;

/// State shared between a session handle and its worker
pub(super) struct Shared<C> {
    pub(super) connector: C,
    pub(super) credentials: Credentials,
    pub(super) relay: Arc<Relay>,
    pub(super) config: SessionConfig,
    pub(super) state: watch::Sender<SessionState>,
    pub(super) failure: Mutex<Option<UpstreamError>>,
}

impl<C> Shared<C> {
    /// Move to `next` if the state machine allows it
    pub(super) fn transition(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                tracing::debug!(from = %state, to = %next, "Session state change");
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

pub(super) struct Worker<C> {
    shared: Arc<Shared<C>>,
    cancel: CancellationToken,
    backoff: Backoff,
}

impl<C: UpstreamConnector> Worker<C> {
    pub(super) fn new(shared: Arc<Shared<C>>, cancel: CancellationToken) -> Self {
        let backoff = Backoff::new(&shared.config);
        Self {
            shared,
            cancel,
            backoff,
        }
    }

    pub(super) async fn run(mut self) {
        while let Some(error) = self.run_once().await {
            if !self.on_failure(error).await {
                break;
            }
        }

        tracing::debug!("Stream session worker exited");
    }

    /// Connect and stream until the connection fails
    ///
    /// Returns `None` when the session was cancelled.
    async fn run_once(&mut self) -> Option<UpstreamError> {
        let shared = Arc::clone(&self.shared);

        let attempt = tokio::time::timeout(
            shared.config.connect_timeout,
            shared.connector.connect(&shared.credentials),
        );
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            result = attempt => result,
        };

        let mut connection = match result {
            Ok(Ok(connection)) => connection,
            Ok(Err(error)) => return Some(error),
            Err(_) => {
                return Some(UpstreamError::ConnectionLost(format!(
                    "connect timed out after {:?}",
                    shared.config.connect_timeout
                )))
            }
        };

        if !shared.transition(SessionState::Streaming) {
            connection.close().await;
            return None;
        }

        shared.relay.stats().on_connect();
        self.backoff.reset();
        tracing::info!("Upstream stream connected");

        let outcome = self.stream(&mut connection).await;
        connection.close().await;
        outcome
    }

    /// Read messages one at a time, publishing each before reading the next
    async fn stream(&self, connection: &mut C::Connection) -> Option<UpstreamError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                next = connection.next_message() => next,
            };

            // A stop that raced the read wins before anything is decoded
            if self.cancel.is_cancelled() {
                return None;
            }

            match next {
                Ok(raw) => self.dispatch(raw).await,
                Err(UpstreamError::Malformed(reason)) => {
                    self.shared.relay.stats().on_decode_error();
                    tracing::warn!(reason = %reason, "Skipping malformed upstream message");
                }
                Err(error) => return Some(error),
            }
        }
    }

    async fn dispatch(&self, raw: Option<RawMessage>) {
        let relay = &self.shared.relay;
        relay.stats().on_message();

        let Some(record) = decode(raw.as_ref()) else {
            relay.stats().on_decode_skip();
            tracing::trace!("Absent upstream message skipped");
            return;
        };

        if let Err(e) = relay.publish(record).await {
            relay.stats().on_publish_error();
            tracing::warn!(error = %e, "Failed to publish record");
        }
    }

    /// Decide what follows a failed connection
    ///
    /// Returns true if the worker should reconnect.
    async fn on_failure(&mut self, error: UpstreamError) -> bool {
        if !error.is_recoverable() {
            tracing::error!(error = %error, "Fatal upstream error, stopping session");
            *self.shared.failure.lock() = Some(error);
            self.shared.transition(SessionState::Stopped);
            return false;
        }

        if !self.shared.transition(SessionState::Backoff) {
            return false;
        }

        let rate_limited = matches!(error, UpstreamError::RateLimited { .. });
        let delay = self.backoff.next_delay(error.retry_after());
        self.shared.relay.stats().on_backoff(rate_limited);

        tracing::warn!(
            error = %error,
            attempt = self.backoff.attempt(),
            delay_ms = delay.as_millis() as u64,
            "Upstream unavailable, backing off"
        );

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            _ = tokio::time::sleep(delay) => {}
        }

        self.shared.transition(SessionState::Connecting)
    }
}
