//! Session lifecycle states.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SessionState
// ============================================================================

/// Where the session is in its lifecycle.
///
/// ```text
/// Idle -> Discovering -> Connecting -> AwaitingRegistration -> Ready
///            ^                                                   |
///            +------------------ Retrying <---------------------+
/// ```
///
/// `Retrying` is reachable from any non-idle state on discovery,
/// transport, or registration failure. `Disconnected` is entered only
/// by an explicit `disconnect()`; a terminal connection error returns
/// the session to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection activity.
    Idle,
    /// Probing candidate ports.
    Discovering,
    /// Dialing the discovered port.
    Connecting,
    /// Transport open, registration in flight.
    AwaitingRegistration,
    /// Registered and operational.
    Ready,
    /// Waiting out the retry interval before the next attempt.
    Retrying,
    /// Explicitly disconnected.
    Disconnected,
}

impl SessionState {
    /// Returns `true` if the session is registered and operational.
    #[inline]
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns `true` if a transport connection currently exists.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::AwaitingRegistration | Self::Ready)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Connecting => "connecting",
            Self::AwaitingRegistration => "awaiting-registration",
            Self::Ready => "ready",
            Self::Retrying => "retrying",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_ready() {
        assert!(SessionState::Ready.is_ready());
        assert!(!SessionState::AwaitingRegistration.is_ready());
        assert!(!SessionState::Idle.is_ready());
    }

    #[test]
    fn test_is_connected() {
        assert!(SessionState::Ready.is_connected());
        assert!(SessionState::AwaitingRegistration.is_connected());
        assert!(!SessionState::Discovering.is_connected());
        assert!(!SessionState::Disconnected.is_connected());
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(
            SessionState::AwaitingRegistration.to_string(),
            "awaiting-registration"
        );
    }
}
