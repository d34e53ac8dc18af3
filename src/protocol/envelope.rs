//! Request and response envelope types.
//!
//! Defines the message format exchanged with the application over the
//! control WebSocket.
//!
//! # Format
//!
//! Outbound:
//! ```json
//! { "action": "getVoices", "id": "uuid", "payload": {} }
//! ```
//!
//! Inbound correlated response:
//! ```json
//! {
//!   "action": "getVoices",
//!   "actionType": "getVoices",
//!   "actionID": "uuid",
//!   "actionObject": { "voices": [ ... ] }
//! }
//! ```
//!
//! Registration reply payload:
//! ```json
//! { "status": { "code": "200", "message": "registered" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::RequestId;

use super::PENDING_AUTH_NOTICE;

// ============================================================================
// RequestEnvelope
// ============================================================================

/// An outbound request frame.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Wire name of the requested action.
    pub action: String,

    /// Correlation id echoed back in the response.
    pub id: RequestId,

    /// Action arguments. `{}` when the action takes none.
    pub payload: Value,
}

impl RequestEnvelope {
    /// Creates a request with an auto-generated correlation id.
    #[inline]
    #[must_use]
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            action: action.into(),
            id: RequestId::generate(),
            payload,
        }
    }
}

// ============================================================================
// ResponseEnvelope
// ============================================================================

/// Any inbound frame.
///
/// One deserialization target covers all inbound shapes; which fields
/// are present determines the frame's classification (see
/// [`transport::router`](crate::transport)).
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Action name, or `None` for out-of-band notices.
    #[serde(default)]
    pub action: Option<String>,

    /// Echoed correlation id.
    #[serde(default)]
    pub id: Option<String>,

    /// Action name variant echoed in responses.
    #[serde(default, rename = "actionType")]
    pub action_type: Option<String>,

    /// Correlation id variant echoed in responses.
    #[serde(default, rename = "actionID")]
    pub action_id: Option<String>,

    /// The payload of interest in a correlated response or event.
    #[serde(default, rename = "actionObject")]
    pub action_object: Value,

    /// Raw payload; registration replies carry `status` here.
    #[serde(default)]
    pub payload: Value,

    /// Human-readable notice, e.g. the pending-authentication message.
    #[serde(default)]
    pub msg: Option<String>,
}

impl ResponseEnvelope {
    /// Returns the correlation id, from `id` or `actionID`.
    ///
    /// `None` if neither field holds a parseable token, which marks the
    /// frame as spontaneous.
    #[must_use]
    pub fn correlation_id(&self) -> Option<RequestId> {
        self.id
            .as_deref()
            .or(self.action_id.as_deref())
            .and_then(RequestId::parse)
    }

    /// Returns `true` if this is the pending-authentication notice.
    ///
    /// Matched case-insensitively on the `msg` field.
    #[must_use]
    pub fn is_pending_auth(&self) -> bool {
        self.msg
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case(PENDING_AUTH_NOTICE))
    }

    /// Extracts the registration status from `payload.status`.
    #[must_use]
    pub fn registration_status(&self) -> Option<RegistrationStatus> {
        serde_json::from_value(self.payload.get("status")?.clone()).ok()
    }

    /// Gets a string value from `actionObject`.
    ///
    /// Returns an empty string if the key is missing or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.action_object
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a boolean value from `actionObject`.
    ///
    /// Returns `false` if the key is missing or not a boolean. Use
    /// [`try_get_bool`](Self::try_get_bool) where a missing flag must
    /// not be mistaken for a reported `false`.
    #[inline]
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        self.try_get_bool(key).unwrap_or_default()
    }

    /// Gets a boolean value from `actionObject`, distinguishing a
    /// missing or non-boolean field from a reported `false`.
    #[inline]
    #[must_use]
    pub fn try_get_bool(&self, key: &str) -> Option<bool> {
        self.action_object.get(key).and_then(|v| v.as_bool())
    }

    /// Deserializes a field of `actionObject` into a typed value.
    pub fn get_field<T: serde::de::DeserializeOwned>(&self, key: &str) -> crate::Result<T> {
        let value = self
            .action_object
            .get(key)
            .cloned()
            .unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(crate::Error::from)
    }
}

// ============================================================================
// RegistrationStatus
// ============================================================================

/// Status block of a registration reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrationStatus {
    /// Numeric status code as a string; `"200"` means success.
    pub code: String,

    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

impl RegistrationStatus {
    /// Returns `true` if the code indicates success.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == "200"
    }
}

// ============================================================================
// Tests
// ============================================================================
