//! Relay core
//!
//! `Relay::publish` is called once per decoded record. It encodes the record
//! into a [`PushFrame`](crate::registry::PushFrame), broadcasts it through the
//! subscriber registry, and only then notifies in-process observers:
//!
//! ```text
//!   publish(record)
//!        │
//!        ├──► registry.broadcast_all(frame)   (external subscribers)
//!        │
//!        └──► observers[0..n].on_record_published(record)
//! ```
//!
//! Nothing is buffered. A record published with no subscribers is dropped.

pub mod publisher;
pub mod observer;

pub use publisher::Relay;
pub use observer::{ObserverId, RecordObserver};
