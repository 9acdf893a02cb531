//! In-process upstream
//!
//! `MemoryConnector` hands out connections fed by the caller. Each call to
//! `connect` consumes the next scripted attempt: either a live connection
//! backed by a [`MemoryFeed`], or a connect failure. With nothing scripted,
//! `connect` waits until the session is stopped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use crate::record::RawMessage;

use super::credentials::Credentials;
use super::error::UpstreamError;
use super::{UpstreamConnection, UpstreamConnector};

type Item = Result<Option<RawMessage>, UpstreamError>;

enum Attempt {
    Connect(mpsc::UnboundedReceiver<Item>),
    Fail(UpstreamError),
}

/// Caller-scripted upstream connector
#[derive(Clone, Default)]
pub struct MemoryConnector {
    attempts: Arc<Mutex<VecDeque<Attempt>>>,
    scripted: Arc<Notify>,
    connects: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Create a connector with no scripted attempts
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful connection; returns the feed that drives it
    pub fn push_connection(&self) -> MemoryFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attempts.lock().push_back(Attempt::Connect(rx));
        self.scripted.notify_one();
        MemoryFeed { tx }
    }

    /// Script a failed connection attempt
    pub fn push_failure(&self, error: UpstreamError) {
        self.attempts.lock().push_back(Attempt::Fail(error));
        self.scripted.notify_one();
    }

    /// Number of `connect` calls made so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn next_attempt(&self) -> Option<Attempt> {
        self.attempts.lock().pop_front()
    }
}

#[async_trait]
impl UpstreamConnector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self, _credentials: &Credentials) -> Result<Self::Connection, UpstreamError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        loop {
            match self.next_attempt() {
                Some(Attempt::Connect(rx)) => return Ok(MemoryConnection { rx }),
                Some(Attempt::Fail(error)) => return Err(error),
                None => self.scripted.notified().await,
            }
        }
    }
}

/// Sending side of one scripted connection
///
/// Dropping the feed closes the connection from the remote side.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
    tx: mpsc::UnboundedSender<Item>,
}

impl MemoryFeed {
    /// Deliver a message; returns false if the connection is gone
    pub fn send(&self, message: RawMessage) -> bool {
        self.tx.send(Ok(Some(message))).is_ok()
    }

    /// Deliver an absent message
    pub fn send_absent(&self) -> bool {
        self.tx.send(Ok(None)).is_ok()
    }

    /// Fail the connection (or a single message, for `Malformed`)
    pub fn fail(&self, error: UpstreamError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }

    /// True once the receiving connection was closed or dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving side of one scripted connection
pub struct MemoryConnection {
    rx: mpsc::UnboundedReceiver<Item>,
}

#[async_trait]
impl UpstreamConnection for MemoryConnection {
    async fn next_message(&mut self) -> Result<Option<RawMessage>, UpstreamError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(UpstreamError::ConnectionLost(
                "stream closed by remote".into(),
            )),
        }
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}
