//! Reconnect backoff
//!
//! Exponential growth from `initial_backoff` by `backoff_multiplier`, capped
//! at `max_backoff`, with optional random jitter. Within one outage delays
//! never decrease; a successful connection resets the sequence.

use std::time::Duration;

use rand::Rng;

use super::config::SessionConfig;

/// Backoff state for one session
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
    attempt: u32,
    last: Duration,
}

impl Backoff {
    /// Create a backoff from session configuration
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            initial: config.initial_backoff,
            max: config.max_backoff,
            multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            attempt: 0,
            last: Duration::ZERO,
        }
    }

    /// Number of delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Un-jittered delay for the given attempt
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let secs = self.initial.as_secs_f64() * exp;

        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(self.max)
        }
    }

    /// Compute the next delay
    ///
    /// `floor` is a retry hint from the upstream; it raises the delay but never
    /// above the ceiling.
    pub fn next_delay(&mut self, floor: Option<Duration>) -> Duration {
        let nominal = self.nominal_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        let mut delay = self.apply_jitter(nominal).max(self.last);
        if let Some(floor) = floor {
            delay = delay.max(floor);
        }
        delay = delay.min(self.max);

        self.last = delay;
        delay
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last = Duration::ZERO;
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }

        let factor = 1.0 + rand::thread_rng().gen_range(-self.jitter..=self.jitter);
        Duration::try_from_secs_f64((delay.as_secs_f64() * factor).max(0.0))
            .unwrap_or(self.max)
            .min(self.max)
    }
}
