//! Stream session
//!
//! A `StreamSession` owns one logical connection to the upstream stream. It
//! runs a single worker task that connects, reads messages in arrival order,
//! decodes them and hands each record to the relay before reading the next.
//!
//! ```text
//!            start()
//!   Idle ──────────► Connecting ──────────► Streaming
//!                      ▲   │                   │
//!                      │   │ rate limited /    │ connection lost /
//!             delay    │   │ connection lost   │ rate limited
//!             elapsed  │   ▼                   │
//!                      Backoff ◄───────────────┘
//!
//!   auth failure / unclassified error ──► Stopped
//!   stop() from any state            ──► Stopped
//! ```
//!
//! `Stopped` is terminal for a session instance; create a new session to
//! start again.

pub mod backoff;
pub mod config;
pub mod error;
pub mod state;
pub mod stream;
mod worker;

pub use backoff::Backoff;
pub use config::SessionConfig;
pub use error::SessionError;
pub use state::SessionState;
pub use stream::StreamSession;
