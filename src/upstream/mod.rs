//! Upstream provider interface
//!
//! The stream session talks to the upstream only through these traits. A
//! connector opens one connection per attempt; a connection yields decoded
//! messages one at a time until it fails.
//!
//! Two implementations ship with the crate:
//! - [`http::SampleStreamConnector`]: the v2 sample stream over HTTP
//! - [`memory::MemoryConnector`]: an in-process feed, scripted by the caller

pub mod credentials;
pub mod error;
pub mod http;
pub mod memory;

pub use credentials::Credentials;
pub use error::UpstreamError;
pub use http::SampleStreamConnector;
pub use memory::{MemoryConnector, MemoryFeed};

use async_trait::async_trait;

use crate::record::RawMessage;

/// Opens connections to the upstream stream
#[async_trait]
pub trait UpstreamConnector: Send + Sync + 'static {
    /// Connection type produced by this connector
    type Connection: UpstreamConnection;

    /// Open a new connection
    ///
    /// Returns once the upstream handshake has completed.
    async fn connect(&self, credentials: &Credentials) -> Result<Self::Connection, UpstreamError>;
}

/// One live upstream connection
#[async_trait]
pub trait UpstreamConnection: Send + 'static {
    /// Wait for the next message
    ///
    /// `Ok(None)` is an absent message (nothing to publish). A remote close is
    /// reported as [`UpstreamError::ConnectionLost`].
    async fn next_message(&mut self) -> Result<Option<RawMessage>, UpstreamError>;

    /// Release the connection
    async fn close(&mut self);
}
