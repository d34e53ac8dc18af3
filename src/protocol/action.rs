//! The closed set of actions the application understands.
//!
//! Actions are a fixed enumeration rather than free strings, so an
//! unrecognized name is an exhaustiveness gap caught by the compiler,
//! not a runtime map miss. Each action knows its wire name and the
//! public event its correlated response maps to.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use super::event::EventKind;

// ============================================================================
// Action
// ============================================================================

/// One named operation requested of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Bootstrap registration with the client key.
    RegisterClient,
    /// Fetch the full voice list.
    GetVoices,
    /// Load (select) a voice by id.
    LoadVoice,
    /// Fetch the user id.
    GetUser,
    /// Fetch the user license.
    GetUserLicense,
    /// Fetch the hear-my-voice toggle status.
    GetHearMyVoiceStatus,
    /// Flip the hear-my-voice toggle.
    ToggleHearMyVoice,
    /// Fetch the voice-changer toggle status.
    GetVoiceChangerStatus,
    /// Flip the voice-changer toggle.
    ToggleVoiceChanger,
    /// Fetch the background-effects toggle status.
    GetBackgroundEffectsStatus,
    /// Flip the background-effects toggle.
    ToggleBackground,
    /// Fetch the mic-mute toggle status.
    GetMuteMicStatus,
    /// Flip the mic-mute toggle.
    ToggleMuteMic,
    /// Fetch all soundboard profiles.
    GetAllSoundboard,
    /// Fetch the active soundboard profile id.
    GetActiveSoundboardProfile,
    /// Activate a soundboard profile by id.
    SetActiveSoundboardProfile,
    /// Fetch the meme sound list.
    GetMemes,
    /// Play a meme sound by file name.
    PlayMeme,
    /// Stop all currently playing meme sounds.
    StopAllMemeSounds,
}

/// Every action, for exhaustive iteration in tests.
pub(crate) const ALL_ACTIONS: &[Action] = &[
    Action::RegisterClient,
    Action::GetVoices,
    Action::LoadVoice,
    Action::GetUser,
    Action::GetUserLicense,
    Action::GetHearMyVoiceStatus,
    Action::ToggleHearMyVoice,
    Action::GetVoiceChangerStatus,
    Action::ToggleVoiceChanger,
    Action::GetBackgroundEffectsStatus,
    Action::ToggleBackground,
    Action::GetMuteMicStatus,
    Action::ToggleMuteMic,
    Action::GetAllSoundboard,
    Action::GetActiveSoundboardProfile,
    Action::SetActiveSoundboardProfile,
    Action::GetMemes,
    Action::PlayMeme,
    Action::StopAllMemeSounds,
];

impl Action {
    /// Returns the action's name on the wire.
    #[inline]
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::RegisterClient => "registerClient",
            Self::GetVoices => "getVoices",
            Self::LoadVoice => "loadVoice",
            Self::GetUser => "getUser",
            Self::GetUserLicense => "getUserLicense",
            Self::GetHearMyVoiceStatus => "getHearMyVoiceStatus",
            Self::ToggleHearMyVoice => "toggleHearMyVoice",
            Self::GetVoiceChangerStatus => "getVoiceChangerStatus",
            Self::ToggleVoiceChanger => "toggleVoiceChanger",
            Self::GetBackgroundEffectsStatus => "getBackgroundEffectsStatus",
            Self::ToggleBackground => "toggleBackground",
            Self::GetMuteMicStatus => "getMuteMicStatus",
            Self::ToggleMuteMic => "toggleMuteMic",
            Self::GetAllSoundboard => "getAllSoundboard",
            Self::GetActiveSoundboardProfile => "getActiveSoundboardProfile",
            Self::SetActiveSoundboardProfile => "setActiveSoundboardProfile",
            Self::GetMemes => "getMemes",
            Self::PlayMeme => "playMeme",
            Self::StopAllMemeSounds => "stopAllMemeSounds",
        }
    }

    /// Resolves a wire name (as echoed in `action` or `actionType`)
    /// back to its action.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        ALL_ACTIONS
            .iter()
            .copied()
            .find(|action| action.wire_name() == name)
    }

    /// Returns the public event a correlated response to this action
    /// maps to.
    ///
    /// `None` for actions whose responses carry no app state
    /// (registration is surfaced through the registration lifecycle
    /// events instead; meme playback is fire-and-forget).
    #[must_use]
    pub const fn response_event(self) -> Option<EventKind> {
        match self {
            Self::RegisterClient | Self::PlayMeme | Self::StopAllMemeSounds => None,
            Self::GetVoices => Some(EventKind::VoiceListChanged),
            Self::LoadVoice => Some(EventKind::VoiceChanged),
            Self::GetUser => Some(EventKind::UserChanged),
            Self::GetUserLicense => Some(EventKind::LicenseChanged),
            Self::GetHearMyVoiceStatus | Self::ToggleHearMyVoice => {
                Some(EventKind::HearMyVoiceChanged)
            }
            Self::GetVoiceChangerStatus | Self::ToggleVoiceChanger => {
                Some(EventKind::VoiceChangerChanged)
            }
            Self::GetBackgroundEffectsStatus | Self::ToggleBackground => {
                Some(EventKind::BackgroundEffectsChanged)
            }
            Self::GetMuteMicStatus | Self::ToggleMuteMic => Some(EventKind::MuteMicChanged),
            Self::GetAllSoundboard => Some(EventKind::SoundboardListChanged),
            Self::GetActiveSoundboardProfile | Self::SetActiveSoundboardProfile => {
                Some(EventKind::ActiveSoundboardChanged)
            }
            Self::GetMemes => Some(EventKind::MemeListChanged),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// Tests
// ============================================================================
