//! Session state machine

use std::fmt;

/// Lifecycle state of a stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, never started
    Idle,
    /// Opening an upstream connection
    Connecting,
    /// Connected and reading messages
    Streaming,
    /// Waiting before the next connection attempt
    Backoff,
    /// Stopped by the owner or by a fatal failure
    Stopped,
}

impl SessionState {
    /// True while a worker is running for the session
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::Streaming | SessionState::Backoff
        )
    }

    /// Check whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Idle, Connecting) => true,
            (Connecting, Streaming) | (Connecting, Backoff) => true,
            (Streaming, Backoff) => true,
            (Backoff, Connecting) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Backoff => "backoff",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn test_session_lifecycle() {
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Streaming));
        assert!(Streaming.can_transition_to(Backoff));
        assert!(Backoff.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Backoff));
    }

    #[test]
    fn test_stop_from_any_state() {
        for state in [Idle, Connecting, Streaming, Backoff] {
            assert!(state.can_transition_to(Stopped));
        }
    }

    #[test]
    fn test_stopped_is_terminal() {
        for state in [Idle, Connecting, Streaming, Backoff, Stopped] {
            assert!(!Stopped.can_transition_to(state));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!Idle.can_transition_to(Streaming));
        assert!(!Streaming.can_transition_to(Connecting));
        assert!(!Backoff.can_transition_to(Streaming));
    }

    #[test]
    fn test_is_active() {
        assert!(!Idle.is_active());
        assert!(Connecting.is_active());
        assert!(Streaming.is_active());
        assert!(Backoff.is_active());
        assert!(!Stopped.is_active());
    }
}
