//! Error types for the voicelink client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use voicelink::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.connect().await?;
//!     let voices = session.voices().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Discovery | [`Error::NoReachablePort`], [`Error::RetriesExhausted`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::NotConnected`] |
//! | Registration | [`Error::RegistrationRejected`] |
//! | Protocol | [`Error::Protocol`], [`Error::RequestFailed`], [`Error::RequestTimeout`] |
//! | Lookup | [`Error::VoiceNotFound`], [`Error::SoundboardNotFound`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// No candidate port accepted the WebSocket handshake.
    ///
    /// Returned after one full discovery pass over the candidate list.
    #[error("No reachable port on {host} after probing {tried} candidates")]
    NoReachablePort {
        /// Host that was probed.
        host: String,
        /// Number of candidate ports tried.
        tried: usize,
    },

    /// Reconnect retry budget exhausted.
    ///
    /// Returned when a finite retry budget runs out before reaching ready.
    #[error("Connection retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the WebSocket connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection attempt timed out.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    ///
    /// Returned when the connection is lost during operation.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation requires a live transport.
    ///
    /// Returned when an action other than registration is sent while
    /// no connection exists.
    #[error("Not connected: cannot send '{action}'")]
    NotConnected {
        /// The action that could not be sent.
        action: String,
    },

    // ========================================================================
    // Registration Errors
    // ========================================================================
    /// The application rejected the client key.
    #[error("Registration rejected: status {code}: {message}")]
    RegistrationRejected {
        /// Status code from the registration reply (e.g. "403").
        code: String,
        /// Status message from the registration reply.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected frame.
    ///
    /// Returned when an inbound frame's format is invalid.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// A request could not complete.
    ///
    /// Returned when the connection drops before the matching response
    /// arrives.
    #[error("Request '{action}' failed: {message}")]
    RequestFailed {
        /// The action that could not complete.
        action: String,
        /// Description of the failure.
        message: String,
    },

    /// A request's response did not arrive in time.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// A voice id was not present in the voice list.
    #[error("Voice not found: {voice_id}")]
    VoiceNotFound {
        /// The missing voice id.
        voice_id: String,
    },

    /// A soundboard profile id was not present in the soundboard list.
    #[error("Soundboard profile not found: {profile_id}")]
    SoundboardNotFound {
        /// The missing profile id.
        profile_id: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a no-reachable-port error.
    #[inline]
    pub fn no_reachable_port(host: impl Into<String>, tried: usize) -> Self {
        Self::NoReachablePort {
            host: host.into(),
            tried,
        }
    }

    /// Creates a retries-exhausted error.
    #[inline]
    pub fn retries_exhausted(attempts: u32) -> Self {
        Self::RetriesExhausted { attempts }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a not-connected error.
    #[inline]
    pub fn not_connected(action: impl Into<String>) -> Self {
        Self::NotConnected {
            action: action.into(),
        }
    }

    /// Creates a registration-rejected error.
    #[inline]
    pub fn registration_rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrationRejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a request-failed error.
    #[inline]
    pub fn request_failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a voice-not-found error.
    #[inline]
    pub fn voice_not_found(voice_id: impl Into<String>) -> Self {
        Self::VoiceNotFound {
            voice_id: voice_id.into(),
        }
    }

    /// Creates a soundboard-not-found error.
    #[inline]
    pub fn soundboard_not_found(profile_id: impl Into<String>) -> Self {
        Self::SoundboardNotFound {
            profile_id: profile_id.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::NotConnected { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoReachablePort { .. }
                | Self::ConnectionTimeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ConnectionClosed
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_no_reachable_port_display() {
        let err = Error::no_reachable_port("localhost", 11);
        assert_eq!(
            err.to_string(),
            "No reachable port on localhost after probing 11 candidates"
        );
    }

    #[test]
    fn test_registration_rejected_display() {
        let err = Error::registration_rejected("403", "invalid client key");
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("invalid client key"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 5000 };
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::not_connected("getVoices").is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::no_reachable_port("localhost", 11).is_recoverable());
        assert!(Error::ConnectionClosed.is_recoverable());
        assert!(!Error::registration_rejected("403", "nope").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
