//! Session configuration

use std::time::Duration;

/// Stream session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First backoff delay
    pub initial_backoff: Duration,

    /// Backoff ceiling
    pub max_backoff: Duration,

    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,

    /// Random jitter as a fraction of the delay (0.2 = ±20%)
    pub jitter: f64,

    /// Upper bound for one connection attempt
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: 0.2,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    /// Set the first backoff delay
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// Set the backoff ceiling
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    /// Set the growth factor (at least 1.0)
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Set the jitter fraction (clamped to 0.0..=1.0)
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Disable jitter
    pub fn without_jitter(self) -> Self {
        self.jitter(0.0)
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
