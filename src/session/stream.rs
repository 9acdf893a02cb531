//! Stream session handle

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::relay::Relay;
use crate::stats::RelayStats;
use crate::upstream::{Credentials, UpstreamConnector, UpstreamError};

use super::config::SessionConfig;
use super::error::SessionError;
use super::state::SessionState;
use super::worker::{Shared, Worker};

/// Owns one logical upstream connection and feeds the relay from it
///
/// `start` and `stop` never block: the connection is driven by a worker task
/// spawned on the current tokio runtime. Dropping the session stops it.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use hashtag_relay::registry::SubscriberRegistry;
/// use hashtag_relay::relay::Relay;
/// use hashtag_relay::session::{SessionConfig, StreamSession};
/// use hashtag_relay::upstream::{Credentials, SampleStreamConnector};
///
/// # async fn example() -> hashtag_relay::error::Result<()> {
/// let relay = Arc::new(Relay::new(Arc::new(SubscriberRegistry::new())));
/// let session = StreamSession::new(
///     SampleStreamConnector::new()?,
///     Credentials::from_env()?,
///     relay,
///     SessionConfig::default(),
/// );
///
/// session.start()?;
/// if let Some(failure) = session.wait_stopped().await {
///     eprintln!("Session failed: {}", failure);
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamSession<C: UpstreamConnector> {
    shared: Arc<Shared<C>>,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<C: UpstreamConnector> StreamSession<C> {
    /// Create an idle session
    pub fn new(
        connector: C,
        credentials: Credentials,
        relay: Arc<Relay>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            shared: Arc::new(Shared {
                connector,
                credentials,
                relay,
                config,
                state,
                failure: Mutex::new(None),
            }),
            cancel: CancellationToken::new(),
            worker: Mutex::new(None),
        }
    }

    /// Start streaming
    ///
    /// Calling `start` on a session that is already running is a no-op. A
    /// stopped session cannot be restarted.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut worker = self.worker.lock();

        match self.state() {
            SessionState::Stopped => return Err(SessionError::AlreadyStopped),
            SessionState::Idle => {}
            state => {
                tracing::debug!(state = %state, "Session already started");
                return Ok(());
            }
        }

        self.shared.transition(SessionState::Connecting);
        tracing::info!("Stream session starting");

        let task = Worker::new(Arc::clone(&self.shared), self.cancel.clone());
        *worker = Some(tokio::spawn(task.run()));

        Ok(())
    }

    /// Stop streaming
    ///
    /// Cancels any in-flight receive or pending backoff and releases the
    /// upstream connection. Idempotent.
    pub fn stop(&self) {
        let _worker = self.worker.lock();

        self.cancel.cancel();
        if self.shared.transition(SessionState::Stopped) {
            tracing::info!("Stream session stopped");
        }
    }

    /// Wait until the session is stopped and its worker has exited
    ///
    /// Returns the fatal upstream error if the session stopped on its own.
    pub async fn wait_stopped(&self) -> Option<UpstreamError> {
        let mut state = self.shared.state.subscribe();
        let _ = state.wait_for(|s| *s == SessionState::Stopped).await;

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Stream session worker panicked");
            }
        }

        self.failure()
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Fatal error that stopped the session, if any
    pub fn failure(&self) -> Option<UpstreamError> {
        self.shared.failure.lock().clone()
    }

    /// Relay this session publishes to
    pub fn relay(&self) -> &Arc<Relay> {
        &self.shared.relay
    }

    /// Relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        self.shared.relay.stats()
    }
}

impl<C: UpstreamConnector> Drop for StreamSession<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::record::RawMessage;
    use crate::registry::{PushFrame, RegistryConfig, SubscriberRegistry};
    use crate::upstream::MemoryConnector;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> SessionConfig {
        SessionConfig::default()
            .initial_backoff(Duration::from_millis(10))
            .max_backoff(Duration::from_millis(40))
            .without_jitter()
    }

    fn setup() -> (
        MemoryConnector,
        StreamSession<MemoryConnector>,
        mpsc::Receiver<PushFrame>,
    ) {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_handle, rx) = registry.register().unwrap();
        let relay = Arc::new(Relay::new(registry));
        let connector = MemoryConnector::new();
        let session = StreamSession::new(
            connector.clone(),
            Credentials::new("k", "s", "t"),
            relay,
            fast_config(),
        );
        (connector, session, rx)
    }

    async fn wait_for_state(session: &StreamSession<MemoryConnector>, target: SessionState) {
        let mut rx = session.subscribe_state();
        tokio::time::timeout(WAIT, rx.wait_for(|s| *s == target))
            .await
            .expect("state not reached")
            .unwrap();
    }

    async fn next_author(rx: &mut mpsc::Receiver<PushFrame>) -> String {
        let frame = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("no frame")
            .unwrap();
        frame.record.author_id().to_string()
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (connector, session, _rx) = setup();
        let _feed = connector.push_connection();

        assert_ok!(session.start());
        assert_ok!(session.start());
        wait_for_state(&session, SessionState::Streaming).await;
        assert_ok!(session.start());

        assert_eq!(connector.connect_count(), 1);
        session.stop();
    }

    #[tokio::test]
    async fn test_start_after_stop_rejected() {
        let (_connector, session, _rx) = setup();

        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(assert_err!(session.start()), SessionError::AlreadyStopped);
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_connect() {
        let (connector, session, _rx) = setup();

        // Nothing scripted: connect waits forever
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Connecting);

        session.stop();
        let failure = tokio::time::timeout(WAIT, session.wait_stopped())
            .await
            .unwrap();
        assert!(failure.is_none());
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_messages_published_in_order() {
        let (connector, session, mut rx) = setup();
        let feed = connector.push_connection();
        session.start().unwrap();

        for author in ["u1", "u2", "u3"] {
            feed.send(RawMessage::new(author));
        }

        assert_eq!(next_author(&mut rx).await, "u1");
        assert_eq!(next_author(&mut rx).await, "u2");
        assert_eq!(next_author(&mut rx).await, "u3");
        session.stop();
    }

    #[tokio::test]
    async fn test_absent_and_malformed_messages_do_not_stop_feed() {
        let (connector, session, mut rx) = setup();
        let feed = connector.push_connection();
        session.start().unwrap();

        feed.send_absent();
        feed.fail(UpstreamError::Malformed("bad json".into()));
        feed.send(RawMessage::new("u1"));

        assert_eq!(next_author(&mut rx).await, "u1");
        assert_eq!(session.state(), SessionState::Streaming);

        let stats = session.stats().snapshot();
        assert_eq!(stats.decode_skips, 1);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.records_published, 1);
        session.stop();
    }

    #[tokio::test]
    async fn test_no_publish_after_stop() {
        let (connector, session, mut rx) = setup();
        let feed = connector.push_connection();
        session.start().unwrap();

        feed.send(RawMessage::new("u1"));
        assert_eq!(next_author(&mut rx).await, "u1");

        session.stop();
        session.wait_stopped().await;

        feed.send(RawMessage::new("u2"));
        assert!(tokio::time::timeout(Duration::from_millis(50), rx.recv())
            .await
            .is_err());
        assert!(feed.is_closed());
        assert_eq!(session.stats().snapshot().records_published, 1);
    }

    #[tokio::test]
    async fn test_stop_mid_delivery_publishes_nothing_further() {
        // Single-slot queue with a long timeout: the worker stalls inside publish
        let registry = Arc::new(SubscriberRegistry::with_config(
            RegistryConfig::default()
                .send_timeout(Duration::from_secs(1))
                .channel_capacity(1),
        ));
        let (_handle, mut rx) = registry.register().unwrap();
        let relay = Arc::new(Relay::new(registry));
        let connector = MemoryConnector::new();
        let session = StreamSession::new(
            connector.clone(),
            Credentials::new("k", "s", "t"),
            Arc::clone(&relay),
            fast_config(),
        );
        assert!(Arc::ptr_eq(session.relay(), &relay));

        let feed = connector.push_connection();
        let queued = ["u1", "u2", "u3", "u4", "u5"];
        for author in queued {
            feed.send(RawMessage::new(author));
        }
        session.start().unwrap();

        assert_eq!(next_author(&mut rx).await, "u1");
        session.stop();
        assert!(session.wait_stopped().await.is_none());

        // At most the publish that was already in flight completes
        let published = session.stats().snapshot().records_published;
        assert!(published < queued.len() as u64);

        let mut delivered = 1;
        while let Ok(frame) = rx.try_recv() {
            assert_eq!(frame.record.author_id(), queued[delivered]);
            delivered += 1;
        }
        assert_eq!(delivered as u64, published);
        assert!(delivered <= 2);
        assert!(feed.is_closed());
    }

    #[tokio::test]
    async fn test_reconnect_after_connection_lost() {
        let (connector, session, mut rx) = setup();
        let first = connector.push_connection();
        session.start().unwrap();

        first.send(RawMessage::new("u1"));
        assert_eq!(next_author(&mut rx).await, "u1");

        let second = connector.push_connection();
        drop(first);

        second.send(RawMessage::new("u2"));
        assert_eq!(next_author(&mut rx).await, "u2");

        assert_eq!(connector.connect_count(), 2);
        let stats = session.stats().snapshot();
        assert_eq!(stats.reconnects, 1);
        assert_eq!(stats.connects, 2);
        session.stop();
    }

    #[tokio::test]
    async fn test_rate_limited_backs_off_and_retries() {
        let (connector, session, mut rx) = setup();
        connector.push_failure(UpstreamError::RateLimited { retry_after: None });
        connector.push_failure(UpstreamError::RateLimited { retry_after: None });
        let feed = connector.push_connection();
        session.start().unwrap();

        feed.send(RawMessage::new("u1"));
        assert_eq!(next_author(&mut rx).await, "u1");

        assert_eq!(connector.connect_count(), 3);
        assert_eq!(session.stats().snapshot().rate_limited, 2);
        session.stop();
    }

    #[tokio::test]
    async fn test_stop_during_backoff() {
        let registry = Arc::new(SubscriberRegistry::new());
        let relay = Arc::new(Relay::new(registry));
        let connector = MemoryConnector::new();
        let config = SessionConfig::default()
            .initial_backoff(Duration::from_secs(30))
            .without_jitter();
        let session = StreamSession::new(
            connector.clone(),
            Credentials::new("k", "s", "t"),
            relay,
            config,
        );

        connector.push_failure(UpstreamError::ConnectionLost("reset".into()));
        session.start().unwrap();
        wait_for_state(&session, SessionState::Backoff).await;

        session.stop();
        // Cancellation cuts the 30s backoff short
        let failure = tokio::time::timeout(WAIT, session.wait_stopped())
            .await
            .unwrap();
        assert!(failure.is_none());
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let (connector, session, _rx) = setup();
        connector.push_failure(UpstreamError::AuthFailed("revoked".into()));
        session.start().unwrap();

        let failure = tokio::time::timeout(WAIT, session.wait_stopped())
            .await
            .unwrap();
        assert!(matches!(failure, Some(UpstreamError::AuthFailed(_))));
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.start(), Err(SessionError::AlreadyStopped));
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_unclassified_error_is_fatal() {
        let (connector, session, _rx) = setup();
        let feed = connector.push_connection();
        session.start().unwrap();
        wait_for_state(&session, SessionState::Streaming).await;

        feed.fail(UpstreamError::Other("unexpected".into()));

        let failure = tokio::time::timeout(WAIT, session.wait_stopped())
            .await
            .unwrap();
        assert_eq!(failure, Some(UpstreamError::Other("unexpected".into())));
    }

    #[tokio::test]
    async fn test_drop_stops_worker() {
        let (connector, session, _rx) = setup();
        let feed = connector.push_connection();
        session.start().unwrap();
        wait_for_state(&session, SessionState::Streaming).await;

        drop(session);

        tokio::time::timeout(WAIT, async {
            while !feed.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
