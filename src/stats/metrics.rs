//! Statistics and metrics for the relay
//!
//! Counters are shared between the stream session and the relay core and are
//! updated with relaxed atomics; `snapshot()` gives a consistent-enough view
//! for logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::registry::DeliveryReport;

/// Live relay counters
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    messages_received: AtomicU64,
    decode_skips: AtomicU64,
    decode_errors: AtomicU64,
    records_published: AtomicU64,
    publish_errors: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    connects: AtomicU64,
    reconnects: AtomicU64,
    rate_limited: AtomicU64,
}

/// Point-in-time copy of the relay counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Messages read from the upstream
    pub messages_received: u64,
    /// Absent messages skipped by the decoder
    pub decode_skips: u64,
    /// Upstream lines that could not be parsed
    pub decode_errors: u64,
    /// Records handed to the relay core
    pub records_published: u64,
    /// Records that could not be encoded for the push channel
    pub publish_errors: u64,
    /// Successful subscriber deliveries
    pub deliveries: u64,
    /// Failed subscriber deliveries
    pub delivery_failures: u64,
    /// Successful upstream connections
    pub connects: u64,
    /// Backoff cycles entered
    pub reconnects: u64,
    /// Rate-limit responses from the upstream
    pub rate_limited: u64,
    /// Time since the counters were created
    pub uptime: Duration,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            messages_received: AtomicU64::new(0),
            decode_skips: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            records_published: AtomicU64::new(0),
            publish_errors: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    pub(crate) fn on_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_decode_skip(&self) {
        self.decode_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_backoff(&self, rate_limited: bool) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        if rate_limited {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Account for one completed broadcast
    pub(crate) fn on_broadcast(&self, report: &DeliveryReport) {
        self.records_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(report.failures.len() as u64, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_skips: self.decode_skips.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayStatsSnapshot {
    /// Fraction of deliveries that failed (0.0 when nothing was attempted)
    pub fn failure_ratio(&self) -> f64 {
        let attempted = self.deliveries + self.delivery_failures;
        if attempted > 0 {
            self.delivery_failures as f64 / attempted as f64
        } else {
            0.0
        }
    }
}
