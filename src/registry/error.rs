//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Maximum subscribers reached
    #[error("maximum subscribers reached ({max})")]
    MaxSubscribers { max: usize },

    /// Subscriber not registered
    #[error("subscriber not found: {id}")]
    SubscriberNotFound { id: u64 },
}
