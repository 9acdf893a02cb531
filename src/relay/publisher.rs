//! Relay publisher

use std::sync::Arc;

use crate::error::Result;
use crate::record::PublishedRecord;
use crate::registry::frame::DEFAULT_TOPIC;
use crate::registry::{DeliveryReport, PushFrame, SubscriberRegistry};
use crate::stats::RelayStats;

use super::observer::{ObserverId, ObserverList, RecordObserver};

/// Fans decoded records out to subscribers and in-process observers
pub struct Relay {
    registry: Arc<SubscriberRegistry>,
    observers: ObserverList,
    topic: Arc<str>,
    stats: Arc<RelayStats>,
}

impl Relay {
    /// Create a relay publishing under the default topic
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            observers: ObserverList::default(),
            topic: Arc::from(DEFAULT_TOPIC),
            stats: Arc::new(RelayStats::new()),
        }
    }

    /// Publish under a custom topic
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Share an existing stats instance
    pub fn with_stats(mut self, stats: Arc<RelayStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Get the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Get the relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Topic records are published under
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Register an observer for published records
    pub fn add_observer(&self, observer: Arc<dyn RecordObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    /// Remove an observer; returns false if it was not registered
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Publish one record
    ///
    /// Broadcasts to every subscriber first, then notifies observers with
    /// the same record. Per-subscriber failures are reported, not returned as
    /// errors; the only error is a record that cannot be encoded, in which
    /// case nothing is delivered.
    pub async fn publish(&self, record: PublishedRecord) -> Result<DeliveryReport> {
        let frame = PushFrame::encode(Arc::clone(&self.topic), record)?;

        let report = self.registry.broadcast_all(&frame).await;
        self.stats.on_broadcast(&report);

        tracing::debug!(
            author = frame.record.author_id(),
            hashtags = frame.record.hashtags().len(),
            delivered = report.delivered,
            failed = report.failures.len(),
            "Record published"
        );

        self.observers.notify(&frame.record);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::record::Hashtag;

    fn record(author: &str, tags: &[&str]) -> PublishedRecord {
        PublishedRecord::new(author, tags.iter().map(|t| Hashtag::new(*t)).collect())
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let relay = Relay::new(Arc::new(SubscriberRegistry::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = Arc::clone(&calls);
            relay.add_observer(Arc::new(move |_: &PublishedRecord| {
                calls.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let report = relay.publish(record("u1", &["go"])).await.unwrap();

        assert_eq!(report.attempted, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.stats().snapshot().records_published, 1);
    }

    #[tokio::test]
    async fn test_broadcast_before_observers() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_handle, rx) = registry.register().unwrap();
        let rx = Arc::new(Mutex::new(rx));

        let relay = Relay::new(Arc::clone(&registry));
        let observed_queued = Arc::new(Mutex::new(None));
        {
            let rx = Arc::clone(&rx);
            let observed_queued = Arc::clone(&observed_queued);
            relay.add_observer(Arc::new(move |r: &PublishedRecord| {
                // The frame is already sitting in the subscriber's queue
                let queued = rx.lock().try_recv().ok();
                *observed_queued.lock() =
                    queued.map(|f| f.record.author_id() == r.author_id());
            }));
        }

        relay.publish(record("u1", &["rust"])).await.unwrap();
        assert_eq!(*observed_queued.lock(), Some(true));
    }

    #[tokio::test]
    async fn test_custom_topic() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_handle, mut rx) = registry.register().unwrap();
        let relay = Relay::new(registry).with_topic("Hashtags");

        relay.publish(record("u1", &[])).await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(&*frame.topic, "Hashtags");
        assert!(frame.as_text().unwrap().starts_with(r#"{"target":"Hashtags""#));
    }

    #[tokio::test]
    async fn test_shared_stats_across_relays() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (_handle, _rx) = registry.register().unwrap();
        let stats = Arc::new(RelayStats::new());

        let first = Relay::new(Arc::clone(&registry)).with_stats(Arc::clone(&stats));
        let second = Relay::new(Arc::clone(&registry)).with_stats(Arc::clone(&stats));
        assert!(Arc::ptr_eq(first.registry(), second.registry()));

        first.publish(record("u1", &["go"])).await.unwrap();
        second.publish(record("u2", &[])).await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.records_published, 2);
        assert_eq!(snapshot.deliveries, 2);
    }

    #[tokio::test]
    async fn test_remove_observer_stops_notifications() {
        let relay = Relay::new(Arc::new(SubscriberRegistry::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let id = {
            let calls = Arc::clone(&calls);
            relay.add_observer(Arc::new(move |_: &PublishedRecord| {
                calls.fetch_add(1, Ordering::SeqCst);
            }))
        };

        relay.publish(record("u1", &[])).await.unwrap();
        assert!(relay.remove_observer(id));
        relay.publish(record("u2", &[])).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.observer_count(), 0);
    }
}
