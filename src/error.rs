//! Crate-level error types
//!
//! Each component keeps its own error enum; `Error` wraps them for callers
//! that drive the relay as a whole.

use std::io;

use thiserror::Error;

use crate::registry::RegistryError;
use crate::session::SessionError;
use crate::upstream::UpstreamError;

/// Error type for relay operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (listener, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Upstream line could not be parsed into a message
    #[error("decode error: {0}")]
    Decode(String),

    /// Record could not be encoded for the push channel
    #[error("encode error: {0}")]
    Encode(String),

    /// Subscriber registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Stream session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Upstream provider error
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Push transport error
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;
