//! Last-known application state.
//!
//! The cache mirrors a fixed set of remote properties so accessors can
//! answer without a round trip once a value has been observed. Fields
//! are typed per property instead of a stringly-keyed map. Every field
//! starts unset and is overwritten last-write-wins, in frame arrival
//! order: writes come only from the message router's handling of
//! inbound frames and from the echoed result of an outbound set or
//! toggle.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::ToggleKind;
use crate::types::{Meme, SoundboardProfile, UserLicense, Voice};

// ============================================================================
// Types
// ============================================================================

/// Cache handle shared between the session, the router, and accessors.
pub type SharedCache = Arc<Mutex<StateCache>>;

// ============================================================================
// StateCache
// ============================================================================

/// Last observed value of each cacheable property.
#[derive(Debug, Clone, Default)]
pub struct StateCache {
    /// Currently loaded voice id.
    pub current_voice_id: Option<String>,
    /// Full voice list.
    pub voices: Option<Vec<Voice>>,
    /// User id.
    pub user_id: Option<String>,
    /// User license.
    pub license: Option<UserLicense>,
    /// Soundboard profile list.
    pub soundboards: Option<Vec<SoundboardProfile>>,
    /// Active soundboard profile id.
    pub active_soundboard_id: Option<String>,
    /// Meme sound list.
    pub memes: Option<Vec<Meme>>,
    hear_my_voice: Option<bool>,
    voice_changer: Option<bool>,
    background_effects: Option<bool>,
    mute_mic: Option<bool>,
}

impl StateCache {
    /// Creates an empty cache with every property unset.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last observed state of one toggle.
    #[inline]
    #[must_use]
    pub fn toggle(&self, kind: ToggleKind) -> Option<bool> {
        match kind {
            ToggleKind::HearMyVoice => self.hear_my_voice,
            ToggleKind::VoiceChanger => self.voice_changer,
            ToggleKind::BackgroundEffects => self.background_effects,
            ToggleKind::MuteMic => self.mute_mic,
        }
    }

    /// Records the state of one toggle.
    #[inline]
    pub fn set_toggle(&mut self, kind: ToggleKind, enabled: bool) {
        let slot = match kind {
            ToggleKind::HearMyVoice => &mut self.hear_my_voice,
            ToggleKind::VoiceChanger => &mut self.voice_changer,
            ToggleKind::BackgroundEffects => &mut self.background_effects,
            ToggleKind::MuteMic => &mut self.mute_mic,
        };
        *slot = Some(enabled);
    }

    /// Looks up a voice record by id in the cached voice list.
    #[must_use]
    pub fn find_voice(&self, voice_id: &str) -> Option<Voice> {
        self.voices
            .as_ref()?
            .iter()
            .find(|voice| voice.id == voice_id)
            .cloned()
    }

    /// Looks up a soundboard profile by id in the cached list.
    #[must_use]
    pub fn find_soundboard(&self, profile_id: &str) -> Option<SoundboardProfile> {
        self.soundboards
            .as_ref()?
            .iter()
            .find(|profile| profile.id == profile_id)
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
