//! In-process "record published" observers

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::record::PublishedRecord;

/// Receives every record after it has been broadcast
pub trait RecordObserver: Send + Sync {
    /// Called synchronously, once per published record
    fn on_record_published(&self, record: &PublishedRecord);
}

impl<F> RecordObserver for F
where
    F: Fn(&PublishedRecord) + Send + Sync,
{
    fn on_record_published(&self, record: &PublishedRecord) {
        self(record)
    }
}

/// Identifies a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observer list, read-mostly
#[derive(Default)]
pub(super) struct ObserverList {
    next_id: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn RecordObserver>)>>,
}

impl ObserverList {
    pub(super) fn add(&self, observer: Arc<dyn RecordObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    pub(super) fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let original_len = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() != original_len
    }

    pub(super) fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Notify every observer in registration order
    ///
    /// Runs over a snapshot, so observers may register or remove observers
    /// from inside the callback. A panicking observer is logged and skipped.
    pub(super) fn notify(&self, record: &PublishedRecord) {
        let snapshot: Vec<Arc<dyn RecordObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();

        for observer in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                observer.on_record_published(record);
            }));

            if result.is_err() {
                tracing::error!(author = record.author_id(), "Record observer panicked");
            }
        }
    }
}
