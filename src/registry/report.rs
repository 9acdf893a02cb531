//! Delivery reports

use std::fmt;

use super::entry::SubscriberHandle;

/// Why a delivery to one subscriber failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Subscriber's queue is closed (disconnected)
    Closed,
    /// Subscriber did not accept the frame within the send timeout
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Closed => write!(f, "closed"),
            FailureReason::TimedOut => write!(f, "timed out"),
        }
    }
}

/// A failed delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Subscriber that failed
    pub subscriber: SubscriberHandle,
    /// Failure reason
    pub reason: FailureReason,
}

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers in the broadcast snapshot
    pub attempted: usize,
    /// Successful deliveries
    pub delivered: usize,
    /// Failed deliveries
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// True if every subscriber in the snapshot received the frame
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Handles of the subscribers that failed
    pub fn failed_subscribers(&self) -> impl Iterator<Item = SubscriberHandle> + '_ {
        self.failures.iter().map(|f| f.subscriber)
    }
}
