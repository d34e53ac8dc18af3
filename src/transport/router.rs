//! Inbound frame classification and dispatch.
//!
//! Every inbound frame is classified, in priority order, as:
//!
//! 1. The pending-authentication notice
//! 2. A registration reply
//! 3. A correlated response (carries `id` or `actionID`)
//! 4. A spontaneous state-change event (`action` ends in `Event`)
//! 5. A spontaneous list update (currently only the soundboard list)
//! 6. A classification failure
//!
//! Classification failures are reported, never silently dropped and
//! never fatal: they log at `warn!` and surface as
//! [`ClientEvent::ProtocolViolation`].
//!
//! Regardless of classification, every frame is first broadcast
//! verbatim to the catch-all subscribers.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{trace, warn};

use crate::protocol::{
    Action, ClientEvent, EVENT_SUFFIX, ResponseEnvelope, StateEvent,
};
use crate::session::cache::SharedCache;
use crate::session::events::EventBus;

use super::connection::CorrelationMap;

// ============================================================================
// Classification
// ============================================================================

/// The shape one inbound frame resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Registration awaits in-app user approval.
    PendingAuth {
        /// The notice text.
        message: String,
    },
    /// A response echoing a correlation id. Covers registration
    /// replies; `action` is `None` when the echoed name is unknown.
    Response {
        /// The echoed correlation id, as a string token.
        correlation_id: String,
        /// The recognized action, if the echoed name is in the closed
        /// set.
        action: Option<Action>,
    },
    /// A spontaneous state-change event from the closed table.
    StateChange(StateEvent),
    /// A spontaneous list refresh.
    ListUpdate(Action),
    /// None of the recognized shapes.
    Violation {
        /// What failed to classify.
        detail: String,
    },
}

/// Classifies one parsed envelope.
///
/// Pure function over the envelope's fields; effects are applied by
/// [`dispatch`].
#[must_use]
pub fn classify(envelope: &ResponseEnvelope) -> Classification {
    // Rule 1: pending-authentication notice.
    if envelope.is_pending_auth() {
        return Classification::PendingAuth {
            message: envelope.msg.clone().unwrap_or_default(),
        };
    }

    // Rules 2 and 3: anything echoing a correlation id is a response.
    // The registration reply is just the response whose action is
    // `registerClient`.
    if let Some(id) = envelope.id.as_deref().or(envelope.action_id.as_deref()) {
        let name = envelope
            .action_type
            .as_deref()
            .or(envelope.action.as_deref());
        return Classification::Response {
            correlation_id: id.to_string(),
            action: name.and_then(Action::from_wire),
        };
    }

    let Some(action_name) = envelope.action.as_deref() else {
        return Classification::Violation {
            detail: "frame carries no action, id, or recognized notice".to_string(),
        };
    };

    // Rule 4: spontaneous state-change events.
    if action_name.ends_with(EVENT_SUFFIX) {
        return match StateEvent::from_action(action_name) {
            Some(event) => Classification::StateChange(event),
            None => Classification::Violation {
                detail: format!("unrecognized state event '{action_name}'"),
            },
        };
    }

    // Rule 5: spontaneous list updates.
    if action_name == Action::GetAllSoundboard.wire_name() {
        return Classification::ListUpdate(Action::GetAllSoundboard);
    }

    // Rule 6.
    Classification::Violation {
        detail: format!("unrecognized spontaneous action '{action_name}'"),
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Processes one inbound text frame end to end.
///
/// Broadcasts the raw frame to the catch-all subscribers, classifies
/// it, resolves the matching pending request for responses, updates the
/// cache for spontaneous events, and emits the mapped public event.
pub fn dispatch(
    text: &str,
    correlation: &Arc<Mutex<CorrelationMap>>,
    cache: &SharedCache,
    bus: &EventBus,
) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            // Unparseable frames still reach the firehose, as a string.
            bus.broadcast_raw(&Value::String(text.to_string()));
            warn!(error = %e, "Inbound frame is not valid JSON");
            bus.emit(&ClientEvent::ProtocolViolation {
                detail: format!("invalid JSON frame: {e}"),
            });
            return;
        }
    };

    // Diagnostic firehose, independent of classification.
    bus.broadcast_raw(&value);

    let envelope: ResponseEnvelope = match serde_json::from_value(value) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Inbound frame is not an envelope");
            bus.emit(&ClientEvent::ProtocolViolation {
                detail: format!("malformed envelope: {e}"),
            });
            return;
        }
    };

    match classify(&envelope) {
        Classification::PendingAuth { message } => {
            trace!("Registration pending in-app approval");
            bus.emit(&ClientEvent::RegistrationPending { message });
        }

        Classification::Response {
            correlation_id,
            action,
        } => {
            resolve_pending(&correlation_id, &envelope, correlation);

            if let Some(action) = action
                && action.response_event().is_some()
            {
                match response_to_event(action, &envelope, cache) {
                    Some(event) => bus.emit(&event),
                    None => warn!(
                        action = %action,
                        "Response payload did not match the action's shape"
                    ),
                }
            }
        }

        Classification::StateChange(event) => {
            apply_state_event(event, &envelope, cache, bus);
        }

        Classification::ListUpdate(Action::GetAllSoundboard) => {
            match envelope.get_field("soundboards") {
                Ok(profiles) => {
                    cache.lock().soundboards = Some(Vec::clone(&profiles));
                    bus.emit(&ClientEvent::SoundboardListChanged { profiles });
                }
                Err(e) => {
                    warn!(error = %e, "Soundboard list update did not parse");
                    bus.emit(&ClientEvent::ProtocolViolation {
                        detail: format!("malformed soundboard list update: {e}"),
                    });
                }
            }
        }

        Classification::ListUpdate(action) => {
            warn!(action = %action, "Unexpected list update action");
        }

        Classification::Violation { detail } => {
            warn!(%detail, "Inbound frame failed classification");
            bus.emit(&ClientEvent::ProtocolViolation { detail });
        }
    }
}

/// Resolves the pending request matching a response's correlation id.
fn resolve_pending(
    correlation_id: &str,
    envelope: &ResponseEnvelope,
    correlation: &Arc<Mutex<CorrelationMap>>,
) {
    let Some(request_id) = crate::identifiers::RequestId::parse(correlation_id) else {
        warn!(id = correlation_id, "Response id is not a valid token");
        return;
    };

    let tx = correlation.lock().remove(&request_id);
    match tx {
        Some(tx) => {
            let _ = tx.send(Ok(envelope.clone()));
        }
        None => {
            // Not an error: fire-and-forget sends and timed-out
            // requests leave no entry behind.
            trace!(%request_id, "Response for request with no waiter");
        }
    }
}

/// Applies one spontaneous state-change event to the cache and emits
/// the mapped public event.
fn apply_state_event(
    event: StateEvent,
    envelope: &ResponseEnvelope,
    cache: &SharedCache,
    bus: &EventBus,
) {
    match event {
        StateEvent::VoiceLoaded => {
            let voice_id = envelope.get_string("voiceID");
            let voice = {
                let mut cache = cache.lock();
                cache.current_voice_id = Some(voice_id.clone());
                cache.find_voice(&voice_id)
            };
            bus.emit(&ClientEvent::VoiceChanged { voice_id, voice });
        }

        StateEvent::Toggle { toggle, enabled } => {
            cache.lock().set_toggle(toggle, enabled);
            bus.emit(&toggle.changed_event(enabled));
        }
    }
}

/// Builds the public event a correlated response maps to.
///
/// `None` if the response's `actionObject` does not match the action's
/// expected shape.
fn response_to_event(
    action: Action,
    envelope: &ResponseEnvelope,
    cache: &SharedCache,
) -> Option<ClientEvent> {
    use crate::types::UserLicense;

    let event = match action {
        Action::GetVoices => ClientEvent::VoiceListChanged {
            voices: envelope.get_field("voices").ok()?,
        },

        Action::LoadVoice => {
            let voice_id = envelope.get_string("voiceID");
            let voice = cache.lock().find_voice(&voice_id);
            ClientEvent::VoiceChanged { voice_id, voice }
        }

        Action::GetUser => ClientEvent::UserChanged {
            user_id: envelope.get_string("userID"),
        },

        Action::GetUserLicense => ClientEvent::LicenseChanged {
            license: UserLicense {
                license_type: envelope.get_string("licenseType"),
            },
        },

        Action::GetHearMyVoiceStatus
        | Action::ToggleHearMyVoice
        | Action::GetVoiceChangerStatus
        | Action::ToggleVoiceChanger
        | Action::GetBackgroundEffectsStatus
        | Action::ToggleBackground
        | Action::GetMuteMicStatus
        | Action::ToggleMuteMic => {
            let toggle = match action {
                Action::GetHearMyVoiceStatus | Action::ToggleHearMyVoice => {
                    crate::protocol::ToggleKind::HearMyVoice
                }
                Action::GetVoiceChangerStatus | Action::ToggleVoiceChanger => {
                    crate::protocol::ToggleKind::VoiceChanger
                }
                Action::GetBackgroundEffectsStatus | Action::ToggleBackground => {
                    crate::protocol::ToggleKind::BackgroundEffects
                }
                _ => crate::protocol::ToggleKind::MuteMic,
            };
            // A missing flag is a shape mismatch, not `false`.
            toggle.changed_event(envelope.try_get_bool("value")?)
        }

        Action::GetAllSoundboard => ClientEvent::SoundboardListChanged {
            profiles: envelope.get_field("soundboards").ok()?,
        },

        Action::GetActiveSoundboardProfile | Action::SetActiveSoundboardProfile => {
            ClientEvent::ActiveSoundboardChanged {
                profile_id: envelope.get_string("profileId"),
            }
        }

        Action::GetMemes => ClientEvent::MemeListChanged {
            memes: envelope.get_field("memes").ok()?,
        },

        // No mapped event.
        Action::RegisterClient | Action::PlayMeme | Action::StopAllMemeSounds => return None,
    };

    Some(event)
}

// ============================================================================
// Tests
// ============================================================================
