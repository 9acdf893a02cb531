//! Session error types

use thiserror::Error;

/// Error type for session control operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `start()` called on a stopped session
    #[error("session already stopped; create a new session to restart")]
    AlreadyStopped,
}
