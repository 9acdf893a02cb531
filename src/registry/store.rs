//! Subscriber registry implementation

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::config::RegistryConfig;
use super::entry::{SubscriberEntry, SubscriberHandle};
use super::error::RegistryError;
use super::frame::PushFrame;
use super::report::{DeliveryFailure, DeliveryReport};

/// Registry of all connected push subscribers
///
/// Registration and broadcast may run concurrently: broadcasts operate on a
/// snapshot taken under the read lock, and the lock is never held across an
/// await.
#[derive(Debug)]
pub struct SubscriberRegistry {
    /// Active subscribers, in registration order
    subscribers: RwLock<Vec<Arc<SubscriberEntry>>>,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber's handle and the receiving end of its queue.
    pub fn register(
        &self,
    ) -> Result<(SubscriberHandle, mpsc::Receiver<PushFrame>), RegistryError> {
        let mut subscribers = self.subscribers.write();

        if self.config.max_subscribers > 0 && subscribers.len() >= self.config.max_subscribers {
            return Err(RegistryError::MaxSubscribers {
                max: self.config.max_subscribers,
            });
        }

        let (entry, rx) = SubscriberEntry::new(self.config.channel_capacity);
        let handle = entry.handle();
        subscribers.push(Arc::new(entry));

        tracing::info!(
            subscriber = handle.id(),
            subscribers = subscribers.len(),
            "Subscriber registered"
        );

        Ok((handle, rx))
    }

    /// Unregister a subscriber
    pub fn unregister(&self, handle: &SubscriberHandle) -> Result<(), RegistryError> {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.handle() != *handle);

        if subscribers.len() == original_len {
            return Err(RegistryError::SubscriberNotFound { id: handle.id() });
        }

        tracing::info!(
            subscriber = handle.id(),
            subscribers = subscribers.len(),
            "Subscriber unregistered"
        );

        Ok(())
    }

    /// Get the number of registered subscribers
    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if there are any subscribers
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    /// Check if a handle is still registered
    pub fn contains(&self, handle: &SubscriberHandle) -> bool {
        self.subscribers
            .read()
            .iter()
            .any(|s| s.handle() == *handle)
    }

    /// Broadcast a frame to every registered subscriber
    ///
    /// Sends are issued concurrently; each is bounded by `send_timeout`. The
    /// call returns once all of them have completed or timed out. A failing
    /// subscriber never prevents delivery to the rest.
    pub async fn broadcast_all(&self, frame: &PushFrame) -> DeliveryReport {
        let snapshot: Vec<Arc<SubscriberEntry>> = self.subscribers.read().clone();

        if snapshot.is_empty() {
            tracing::trace!("Broadcast with no subscribers");
            return DeliveryReport::default();
        }

        let timeout = self.config.send_timeout;
        let sends = snapshot.iter().map(|entry| {
            let frame = frame.clone();
            async move { (entry.handle(), entry.deliver(frame, timeout).await) }
        });
        let results = join_all(sends).await;

        let mut report = DeliveryReport {
            attempted: snapshot.len(),
            ..Default::default()
        };

        for (subscriber, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(reason) => {
                    tracing::warn!(
                        subscriber = subscriber.id(),
                        reason = %reason,
                        "Delivery failed"
                    );
                    report.failures.push(DeliveryFailure { subscriber, reason });
                }
            }
        }

        if self.config.evict_failed && !report.failures.is_empty() {
            self.evict(&report);
        }

        report
    }

    /// Unregister every subscriber that failed in `report`
    fn evict(&self, report: &DeliveryReport) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| !report.failed_subscribers().any(|h| h == s.handle()));

        tracing::debug!(
            evicted = report.failures.len(),
            subscribers = subscribers.len(),
            "Evicted failed subscribers"
        );
    }

    /// Remove subscribers whose receiving side has gone away
    ///
    /// Returns the number of subscribers removed.
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.is_connected());
        let removed = original_len - subscribers.len();

        if removed > 0 {
            tracing::info!(removed = removed, "Disconnected subscribers removed by cleanup");
        }

        removed
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup_disconnected();
            }
        })
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}
