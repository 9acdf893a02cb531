//! Subscriber entries
//!
//! A `SubscriberHandle` is the opaque reference transports keep for one
//! connected endpoint. The registry owns the matching `SubscriberEntry`,
//! which holds the sending half of the subscriber's queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use super::frame::PushFrame;
use super::report::FailureReason;

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to one connected push endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle {
    id: u64,
}

impl SubscriberHandle {
    fn next() -> Self {
        Self {
            id: SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Get the subscriber ID
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.id)
    }
}

/// Registry-side state of one subscriber
#[derive(Debug)]
pub struct SubscriberEntry {
    handle: SubscriberHandle,
    tx: mpsc::Sender<PushFrame>,
}

impl SubscriberEntry {
    /// Create an entry and the receiving half of its queue
    pub(super) fn new(capacity: usize) -> (Self, mpsc::Receiver<PushFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let entry = Self {
            handle: SubscriberHandle::next(),
            tx,
        };
        (entry, rx)
    }

    /// Handle identifying this subscriber
    #[inline]
    pub fn handle(&self) -> SubscriberHandle {
        self.handle
    }

    /// Check if the receiving side is still alive
    #[inline]
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Deliver one frame, waiting at most `timeout` for queue space
    pub(super) async fn deliver(
        &self,
        frame: PushFrame,
        timeout: Duration,
    ) -> Result<(), FailureReason> {
        match tokio::time::timeout(timeout, self.tx.send(frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(FailureReason::Closed),
            Err(_) => Err(FailureReason::TimedOut),
        }
    }
}
