//! Public events and the spontaneous-event table.
//!
//! [`ClientEvent`] is everything observable on the event surface:
//! connection lifecycle, registration lifecycle, and one changed-event
//! per cached property. [`EventKind`] is the subscription key.
//!
//! [`StateEvent`] is the closed table of spontaneous state-change
//! actions the application pushes (names ending in `Event`, no
//! correlation id). An `...Event` name outside this table is a
//! classification failure, reported as [`ClientEvent::ProtocolViolation`].

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::types::{Meme, SoundboardProfile, UserLicense, Voice};

// ============================================================================
// EventKind
// ============================================================================

/// Subscription key for one event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Transport opened (before registration).
    ConnectionOpened,
    /// Transport closed.
    ConnectionClosed,
    /// Terminal connection failure (retry budget exhausted or retries
    /// disabled).
    ConnectionError,
    /// Session reached ready.
    Connected,
    /// Explicit disconnect completed.
    Disconnected,
    /// A reconnect attempt is scheduled.
    Retrying,
    /// Registration awaits in-app user approval.
    RegistrationPending,
    /// Registration accepted.
    Registered,
    /// Registration rejected.
    RegistrationFailed,
    /// An inbound frame matched no recognized shape.
    ProtocolViolation,
    /// Current voice changed.
    VoiceChanged,
    /// Voice list refreshed.
    VoiceListChanged,
    /// User id observed.
    UserChanged,
    /// License observed.
    LicenseChanged,
    /// Hear-my-voice toggle changed.
    HearMyVoiceChanged,
    /// Voice-changer toggle changed.
    VoiceChangerChanged,
    /// Background-effects toggle changed.
    BackgroundEffectsChanged,
    /// Mic-mute toggle changed.
    MuteMicChanged,
    /// Soundboard profile list refreshed.
    SoundboardListChanged,
    /// Active soundboard profile changed.
    ActiveSoundboardChanged,
    /// Meme sound list refreshed.
    MemeListChanged,
}

// ============================================================================
// ClientEvent
// ============================================================================

/// One event delivered on the event surface.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Transport opened on the discovered port.
    ConnectionOpened {
        /// Port the connection was established on.
        port: u16,
    },

    /// Transport closed.
    ConnectionClosed,

    /// Terminal connection failure.
    ConnectionError {
        /// Description of the failure.
        message: String,
    },

    /// Session reached ready.
    Connected,

    /// Explicit disconnect completed.
    Disconnected,

    /// A reconnect attempt is scheduled.
    Retrying {
        /// Attempt number, starting at 1.
        attempt: u32,
    },

    /// Registration awaits in-app user approval.
    RegistrationPending {
        /// Notice text from the application.
        message: String,
    },

    /// Registration accepted; carries the full reply payload.
    Registered {
        /// The registration reply's `payload`.
        payload: Value,
    },

    /// Registration rejected.
    RegistrationFailed {
        /// Status code (e.g. `"403"`).
        code: String,
        /// Status message.
        message: String,
    },

    /// An inbound frame matched no recognized shape.
    ProtocolViolation {
        /// What failed to classify.
        detail: String,
    },

    /// Current voice changed.
    VoiceChanged {
        /// The new voice id.
        voice_id: String,
        /// Full record, when the voice list is cached and contains the
        /// id.
        voice: Option<Voice>,
    },

    /// Voice list refreshed.
    VoiceListChanged {
        /// The new list.
        voices: Vec<Voice>,
    },

    /// User id observed.
    UserChanged {
        /// The user id.
        user_id: String,
    },

    /// License observed.
    LicenseChanged {
        /// The license.
        license: UserLicense,
    },

    /// Hear-my-voice toggle changed.
    HearMyVoiceChanged {
        /// New state.
        enabled: bool,
    },

    /// Voice-changer toggle changed.
    VoiceChangerChanged {
        /// New state.
        enabled: bool,
    },

    /// Background-effects toggle changed.
    BackgroundEffectsChanged {
        /// New state.
        enabled: bool,
    },

    /// Mic-mute toggle changed.
    MuteMicChanged {
        /// New state.
        enabled: bool,
    },

    /// Soundboard profile list refreshed.
    SoundboardListChanged {
        /// The new list.
        profiles: Vec<SoundboardProfile>,
    },

    /// Active soundboard profile changed.
    ActiveSoundboardChanged {
        /// The active profile id.
        profile_id: String,
    },

    /// Meme sound list refreshed.
    MemeListChanged {
        /// The new list.
        memes: Vec<Meme>,
    },
}

impl ClientEvent {
    /// Returns the subscription key this event is delivered under.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ConnectionOpened { .. } => EventKind::ConnectionOpened,
            Self::ConnectionClosed => EventKind::ConnectionClosed,
            Self::ConnectionError { .. } => EventKind::ConnectionError,
            Self::Connected => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::Retrying { .. } => EventKind::Retrying,
            Self::RegistrationPending { .. } => EventKind::RegistrationPending,
            Self::Registered { .. } => EventKind::Registered,
            Self::RegistrationFailed { .. } => EventKind::RegistrationFailed,
            Self::ProtocolViolation { .. } => EventKind::ProtocolViolation,
            Self::VoiceChanged { .. } => EventKind::VoiceChanged,
            Self::VoiceListChanged { .. } => EventKind::VoiceListChanged,
            Self::UserChanged { .. } => EventKind::UserChanged,
            Self::LicenseChanged { .. } => EventKind::LicenseChanged,
            Self::HearMyVoiceChanged { .. } => EventKind::HearMyVoiceChanged,
            Self::VoiceChangerChanged { .. } => EventKind::VoiceChangerChanged,
            Self::BackgroundEffectsChanged { .. } => EventKind::BackgroundEffectsChanged,
            Self::MuteMicChanged { .. } => EventKind::MuteMicChanged,
            Self::SoundboardListChanged { .. } => EventKind::SoundboardListChanged,
            Self::ActiveSoundboardChanged { .. } => EventKind::ActiveSoundboardChanged,
            Self::MemeListChanged { .. } => EventKind::MemeListChanged,
        }
    }
}

// ============================================================================
// ToggleKind
// ============================================================================

/// The per-toggle boolean properties the application reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    /// Monitor of the user's own processed voice.
    HearMyVoice,
    /// The voice changer itself.
    VoiceChanger,
    /// Background effects.
    BackgroundEffects,
    /// Microphone mute.
    MuteMic,
}

impl ToggleKind {
    /// Returns the changed-event kind for this toggle.
    #[inline]
    #[must_use]
    pub const fn event_kind(self) -> EventKind {
        match self {
            Self::HearMyVoice => EventKind::HearMyVoiceChanged,
            Self::VoiceChanger => EventKind::VoiceChangerChanged,
            Self::BackgroundEffects => EventKind::BackgroundEffectsChanged,
            Self::MuteMic => EventKind::MuteMicChanged,
        }
    }

    /// Builds the changed-event for this toggle.
    #[inline]
    #[must_use]
    pub const fn changed_event(self, enabled: bool) -> ClientEvent {
        match self {
            Self::HearMyVoice => ClientEvent::HearMyVoiceChanged { enabled },
            Self::VoiceChanger => ClientEvent::VoiceChangerChanged { enabled },
            Self::BackgroundEffects => ClientEvent::BackgroundEffectsChanged { enabled },
            Self::MuteMic => ClientEvent::MuteMicChanged { enabled },
        }
    }
}

// ============================================================================
// StateEvent
// ============================================================================

/// The closed table of spontaneous state-change actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// `voiceLoadedEvent`: the current voice changed;
    /// `actionObject.voiceID` carries the new id.
    VoiceLoaded,
    /// An `...EnabledEvent`/`...DisabledEvent` pair member for one
    /// toggle.
    Toggle {
        /// Which toggle changed.
        toggle: ToggleKind,
        /// The new state the event name encodes.
        enabled: bool,
    },
}

impl StateEvent {
    /// Resolves a spontaneous action name against the table.
    ///
    /// `None` marks a classification failure for `...Event` names.
    #[must_use]
    pub fn from_action(name: &str) -> Option<Self> {
        let event = match name {
            "voiceLoadedEvent" => Self::VoiceLoaded,
            "hearMySelfEnabledEvent" => Self::toggle(ToggleKind::HearMyVoice, true),
            "hearMySelfDisabledEvent" => Self::toggle(ToggleKind::HearMyVoice, false),
            "voiceChangerEnabledEvent" => Self::toggle(ToggleKind::VoiceChanger, true),
            "voiceChangerDisabledEvent" => Self::toggle(ToggleKind::VoiceChanger, false),
            "backgroundEffectsEnabledEvent" => Self::toggle(ToggleKind::BackgroundEffects, true),
            "backgroundEffectsDisabledEvent" => Self::toggle(ToggleKind::BackgroundEffects, false),
            "muteMicEnabledEvent" => Self::toggle(ToggleKind::MuteMic, true),
            "muteMicDisabledEvent" => Self::toggle(ToggleKind::MuteMic, false),
            _ => return None,
        };
        Some(event)
    }

    #[inline]
    const fn toggle(toggle: ToggleKind, enabled: bool) -> Self {
        Self::Toggle { toggle, enabled }
    }
}

// ============================================================================
// Tests
// ============================================================================
