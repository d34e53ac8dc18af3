//! High-level accessors over the session engine.
//!
//! Thin, mechanical wrappers: each cacheable property has a getter
//! following one policy — a cached value is returned synchronously with
//! no network I/O; a miss issues one request, stores the result, and
//! returns it. Set and toggle accessors always round-trip and trust
//! only the echoed result, never a locally assumed value. The message
//! router emits the matching changed-event for every correlated
//! response, so accessors do not emit separately.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};
use tracing::trace;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{Action, ResponseEnvelope, ToggleKind};
use crate::session::{Session, StateCache};
use crate::types::{Meme, SoundboardProfile, UserLicense, Voice};

// ============================================================================
// Cache-or-Fetch
// ============================================================================

impl Session {
    /// The one fetch-or-cache routine behind every getter.
    ///
    /// `read` inspects the cache; on a miss, the action is requested
    /// and `write` stores the parsed result.
    async fn cached_or_fetch<T, R, W>(
        &self,
        action: Action,
        payload: Value,
        read: R,
        write: W,
    ) -> Result<T>
    where
        R: FnOnce(&StateCache) -> Option<T>,
        W: FnOnce(&mut StateCache, &ResponseEnvelope) -> Result<T>,
    {
        if let Some(value) = read(&self.inner.cache.lock()) {
            trace!(action = %action, "Serving from cache");
            return Ok(value);
        }

        let reply = self.request(action, payload).await?;
        write(&mut self.inner.cache.lock(), &reply)
    }
}

// ============================================================================
// Voices
// ============================================================================

impl Session {
    /// Returns the voice list, fetching it once.
    pub async fn voices(&self) -> Result<Vec<Voice>> {
        self.cached_or_fetch(
            Action::GetVoices,
            json!({}),
            |cache| cache.voices.clone(),
            |cache, reply| {
                let voices: Vec<Voice> = reply.get_field("voices")?;
                let current = reply.get_string("currentVoice");
                if !current.is_empty() {
                    cache.current_voice_id = Some(current);
                }
                cache.voices = Some(voices.clone());
                Ok(voices)
            },
        )
        .await
    }

    /// Returns the full record of the currently loaded voice.
    ///
    /// Resolving the current id needs the whole voice list, which is
    /// fetched under the same cache policy and filtered locally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoiceNotFound`] if no current voice is known or
    /// its id is absent from the list.
    pub async fn current_voice(&self) -> Result<Voice> {
        let voices = self.voices().await?;

        let voice_id = self
            .inner
            .cache
            .lock()
            .current_voice_id
            .clone()
            .ok_or_else(|| Error::voice_not_found("(none reported)"))?;

        voices
            .into_iter()
            .find(|voice| voice.id == voice_id)
            .ok_or_else(|| Error::voice_not_found(voice_id))
    }

    /// Loads a voice by id.
    ///
    /// The cache takes the echoed id, not the requested one.
    pub async fn load_voice(&self, voice_id: &str) -> Result<()> {
        let reply = self
            .request(Action::LoadVoice, json!({ "voiceID": voice_id }))
            .await?;

        let echoed = reply.get_string("voiceID");
        self.inner.cache.lock().current_voice_id = Some(if echoed.is_empty() {
            voice_id.to_string()
        } else {
            echoed
        });
        Ok(())
    }

    /// Loads a uniformly chosen voice among the enabled ones and
    /// returns its record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VoiceNotFound`] if no voice is enabled.
    pub async fn random_voice(&self) -> Result<Voice> {
        let enabled: Vec<Voice> = self
            .voices()
            .await?
            .into_iter()
            .filter(|voice| voice.enabled)
            .collect();

        if enabled.is_empty() {
            return Err(Error::voice_not_found("(no enabled voices)"));
        }

        let pick = (Uuid::new_v4().as_u128() % enabled.len() as u128) as usize;
        let voice = enabled[pick].clone();
        self.load_voice(&voice.id).await?;
        Ok(voice)
    }
}

// ============================================================================
// User & License
// ============================================================================

impl Session {
    /// Returns the user id, fetching it once.
    pub async fn user(&self) -> Result<String> {
        self.cached_or_fetch(
            Action::GetUser,
            json!({}),
            |cache| cache.user_id.clone(),
            |cache, reply| {
                let user_id = reply.get_string("userID");
                if user_id.is_empty() {
                    return Err(Error::protocol("getUser reply carries no userID"));
                }
                cache.user_id = Some(user_id.clone());
                Ok(user_id)
            },
        )
        .await
    }

    /// Returns the user license, fetching it once.
    pub async fn user_license(&self) -> Result<UserLicense> {
        self.cached_or_fetch(
            Action::GetUserLicense,
            json!({}),
            |cache| cache.license.clone(),
            |cache, reply| {
                let license_type = reply.get_string("licenseType");
                if license_type.is_empty() {
                    return Err(Error::protocol("getUserLicense reply carries no licenseType"));
                }
                let license = UserLicense { license_type };
                cache.license = Some(license.clone());
                Ok(license)
            },
        )
        .await
    }
}

// ============================================================================
// Toggles
// ============================================================================

impl Session {
    /// Returns one toggle's status, fetching it once.
    ///
    /// A reply without a boolean `value` is a protocol error, never a
    /// fabricated `false`; nothing is cached from it.
    pub async fn toggle_status(&self, toggle: ToggleKind) -> Result<bool> {
        self.cached_or_fetch(
            status_action(toggle),
            json!({}),
            move |cache| cache.toggle(toggle),
            move |cache, reply| {
                let enabled = reply
                    .try_get_bool("value")
                    .ok_or_else(|| Error::protocol("toggle reply carries no boolean value"))?;
                cache.set_toggle(toggle, enabled);
                Ok(enabled)
            },
        )
        .await
    }

    /// Flips one toggle and returns the state the application echoed.
    ///
    /// Only the echoed state is trusted: a reply without a boolean
    /// `value` is a protocol error and leaves the cache untouched.
    pub async fn flip_toggle(&self, toggle: ToggleKind) -> Result<bool> {
        let reply = self.request(toggle_action(toggle), json!({})).await?;
        let enabled = reply
            .try_get_bool("value")
            .ok_or_else(|| Error::protocol("toggle reply carries no boolean value"))?;
        self.inner.cache.lock().set_toggle(toggle, enabled);
        Ok(enabled)
    }

    /// Returns whether hear-my-voice is on.
    pub async fn hear_my_voice_status(&self) -> Result<bool> {
        self.toggle_status(ToggleKind::HearMyVoice).await
    }

    /// Flips hear-my-voice.
    pub async fn toggle_hear_my_voice(&self) -> Result<bool> {
        self.flip_toggle(ToggleKind::HearMyVoice).await
    }

    /// Returns whether the voice changer is on.
    pub async fn voice_changer_status(&self) -> Result<bool> {
        self.toggle_status(ToggleKind::VoiceChanger).await
    }

    /// Flips the voice changer.
    pub async fn toggle_voice_changer(&self) -> Result<bool> {
        self.flip_toggle(ToggleKind::VoiceChanger).await
    }

    /// Returns whether background effects are on.
    pub async fn background_effects_status(&self) -> Result<bool> {
        self.toggle_status(ToggleKind::BackgroundEffects).await
    }

    /// Flips background effects.
    pub async fn toggle_background_effects(&self) -> Result<bool> {
        self.flip_toggle(ToggleKind::BackgroundEffects).await
    }

    /// Returns whether the mic is muted.
    pub async fn mute_mic_status(&self) -> Result<bool> {
        self.toggle_status(ToggleKind::MuteMic).await
    }

    /// Flips mic mute.
    pub async fn toggle_mute_mic(&self) -> Result<bool> {
        self.flip_toggle(ToggleKind::MuteMic).await
    }
}

fn status_action(toggle: ToggleKind) -> Action {
    match toggle {
        ToggleKind::HearMyVoice => Action::GetHearMyVoiceStatus,
        ToggleKind::VoiceChanger => Action::GetVoiceChangerStatus,
        ToggleKind::BackgroundEffects => Action::GetBackgroundEffectsStatus,
        ToggleKind::MuteMic => Action::GetMuteMicStatus,
    }
}

fn toggle_action(toggle: ToggleKind) -> Action {
    match toggle {
        ToggleKind::HearMyVoice => Action::ToggleHearMyVoice,
        ToggleKind::VoiceChanger => Action::ToggleVoiceChanger,
        ToggleKind::BackgroundEffects => Action::ToggleBackground,
        ToggleKind::MuteMic => Action::ToggleMuteMic,
    }
}

// ============================================================================
// Soundboard
// ============================================================================

impl Session {
    /// Returns the soundboard profile list, fetching it once.
    pub async fn soundboards(&self) -> Result<Vec<SoundboardProfile>> {
        self.cached_or_fetch(
            Action::GetAllSoundboard,
            json!({}),
            |cache| cache.soundboards.clone(),
            |cache, reply| {
                let profiles: Vec<SoundboardProfile> = reply.get_field("soundboards")?;
                cache.soundboards = Some(profiles.clone());
                Ok(profiles)
            },
        )
        .await
    }

    /// Returns the active soundboard profile id, fetching it once.
    pub async fn active_soundboard_profile(&self) -> Result<String> {
        self.cached_or_fetch(
            Action::GetActiveSoundboardProfile,
            json!({}),
            |cache| cache.active_soundboard_id.clone(),
            |cache, reply| {
                let profile_id = reply.get_string("profileId");
                if profile_id.is_empty() {
                    return Err(Error::protocol(
                        "getActiveSoundboardProfile reply carries no profileId",
                    ));
                }
                cache.active_soundboard_id = Some(profile_id.clone());
                Ok(profile_id)
            },
        )
        .await
    }

    /// Returns the full record of the active soundboard profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SoundboardNotFound`] if the active id is absent
    /// from the profile list.
    pub async fn active_soundboard(&self) -> Result<SoundboardProfile> {
        let profiles = self.soundboards().await?;
        let profile_id = self.active_soundboard_profile().await?;

        profiles
            .into_iter()
            .find(|profile| profile.id == profile_id)
            .ok_or_else(|| Error::soundboard_not_found(profile_id))
    }

    /// Activates a soundboard profile by id.
    ///
    /// The cache takes the echoed id, not the requested one.
    pub async fn set_active_soundboard_profile(&self, profile_id: &str) -> Result<()> {
        let reply = self
            .request(
                Action::SetActiveSoundboardProfile,
                json!({ "profileId": profile_id }),
            )
            .await?;

        let echoed = reply.get_string("profileId");
        self.inner.cache.lock().active_soundboard_id = Some(if echoed.is_empty() {
            profile_id.to_string()
        } else {
            echoed
        });
        Ok(())
    }
}

// ============================================================================
// Memes
// ============================================================================

impl Session {
    /// Returns the meme sound list, fetching it once.
    pub async fn memes(&self) -> Result<Vec<Meme>> {
        self.cached_or_fetch(
            Action::GetMemes,
            json!({}),
            |cache| cache.memes.clone(),
            |cache, reply| {
                let memes: Vec<Meme> = reply.get_field("memes")?;
                cache.memes = Some(memes.clone());
                Ok(memes)
            },
        )
        .await
    }

    /// Starts playing a meme sound. Fire-and-forget.
    pub fn play_meme(&self, file_name: &str, loop_playback: bool) -> Result<RequestId> {
        self.send(
            Action::PlayMeme,
            json!({ "fileName": file_name, "loop": loop_playback }),
        )
    }

    /// Stops every playing meme sound. Fire-and-forget.
    pub fn stop_all_meme_sounds(&self) -> Result<RequestId> {
        self.send(Action::StopAllMemeSounds, json!({}))
    }
}

// ============================================================================
// Tests
// ============================================================================
