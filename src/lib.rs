//! # hashtag-relay
//!
//! Sample-stream ingest and live hashtag fan-out.
//!
//! The relay holds one long-lived connection to an upstream sample stream of
//! posts, decodes each message into `{author_id, hashtags}` and pushes the
//! record to every connected subscriber.
//!
//! ```text
//!   upstream ──► StreamSession ──► decode ──► Relay ──► SubscriberRegistry ──► PushServer
//!                    │                          │
//!                 backoff                   observers
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use hashtag_relay::{
//!     Credentials, PushServer, PushServerConfig, Relay, SampleStreamConnector,
//!     SessionConfig, StreamSession, SubscriberRegistry,
//! };
//!
//! #[tokio::main]
//! async fn main() -> hashtag_relay::Result<()> {
//!     let registry = Arc::new(SubscriberRegistry::new());
//!     let relay = Arc::new(Relay::new(Arc::clone(&registry)));
//!
//!     let session = StreamSession::new(
//!         SampleStreamConnector::new()?,
//!         Credentials::from_env()?,
//!         relay,
//!         SessionConfig::default(),
//!     );
//!     session.start()?;
//!
//!     PushServer::new(PushServerConfig::default(), registry).run().await
//! }
//! ```

pub mod error;
pub mod record;
pub mod registry;
pub mod relay;
pub mod session;
pub mod stats;
pub mod transport;
pub mod upstream;

pub use error::{Error, Result};
pub use record::{decode, Hashtag, PublishedRecord, RawMessage};
pub use registry::{DeliveryReport, PushFrame, RegistryConfig, SubscriberHandle, SubscriberRegistry};
pub use relay::{ObserverId, RecordObserver, Relay};
pub use session::{SessionConfig, SessionState, StreamSession};
pub use stats::{RelayStats, RelayStatsSnapshot};
pub use transport::{PushServer, PushServerConfig};
pub use upstream::{Credentials, SampleStreamConnector, UpstreamError};
