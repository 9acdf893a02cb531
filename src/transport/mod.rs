//! WebSocket push transport
//!
//! Exposes the subscriber registry over WebSocket. Each accepted connection
//! registers one subscriber (connect) and unregisters it when the socket
//! closes (disconnect). Frames are sent as text messages:
//!
//! ```text
//! {"target":"PublishTweet","arguments":[{"authorId":"u1","hashtags":["go","rust"]}]}
//! ```
//!
//! Subscribers only receive; anything they send other than control frames
//! is ignored.

pub mod config;
mod connection;
pub mod server;

pub use config::PushServerConfig;
pub use server::PushServer;
pub use crate::registry::PushFrame;
