//! Registry configuration

use std::time::Duration;

/// Subscriber registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound for a single subscriber send
    pub send_timeout: Duration,

    /// Per-subscriber queue capacity (frames)
    pub channel_capacity: usize,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Unregister subscribers whose delivery failed
    pub evict_failed: bool,

    /// Interval between sweeps for disconnected subscribers
    pub cleanup_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(250),
            channel_capacity: 64,
            max_subscribers: 0, // Unlimited
            evict_failed: true,
            cleanup_interval: Duration::from_secs(10),
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the per-subscriber queue capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set maximum subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Keep failed subscribers registered instead of evicting them
    pub fn keep_failed(mut self) -> Self {
        self.evict_failed = false;
        self
    }

    /// Set the cleanup sweep interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
