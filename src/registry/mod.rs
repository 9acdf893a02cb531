//! Subscriber registry for push fan-out
//!
//! The registry tracks every connected push endpoint and delivers each
//! published frame to all of them. Each subscriber owns a bounded
//! `tokio::sync::mpsc` channel; the transport task behind it drains the
//! channel onto the wire.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriberRegistry>
//!                   ┌─────────────────────────────┐
//!                   │ subscribers: Vec<Arc<       │
//!                   │   SubscriberEntry {         │
//!                   │     handle,                 │
//!                   │     tx: mpsc::Sender,       │
//!                   │   }                         │
//!                   │ >>                          │
//!                   └──────────────┬──────────────┘
//!                                  │ broadcast_all()
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!   send (≤ timeout)        send (≤ timeout)        send (≤ timeout)
//!          │                       │                       │
//!     [transport]             [transport]             [transport]
//! ```
//!
//! # Delivery
//!
//! A broadcast iterates a snapshot of the registered subscribers, so
//! concurrent connects and disconnects never race with it. Sends run
//! concurrently and each is bounded by `send_timeout`; the broadcast returns
//! once every send has completed or timed out, which keeps publish order
//! identical for every subscriber. `PushFrame` payloads are `bytes::Bytes`, so
//! all subscribers share one encoded buffer.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod report;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{SubscriberEntry, SubscriberHandle};
pub use error::RegistryError;
pub use frame::{PushFrame, DEFAULT_TOPIC};
pub use report::{DeliveryFailure, DeliveryReport, FailureReason};
pub use store::SubscriberRegistry;
