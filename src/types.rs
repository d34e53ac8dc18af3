//! Application data models.
//!
//! Typed views of the records the application reports: voices,
//! soundboard profiles, meme sounds, and the user license. All of them
//! arrive inside `actionObject` payloads and deserialize with serde.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Voice
// ============================================================================

/// One voice the application can load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Stable voice id (e.g. `"nofx"`).
    pub id: String,

    /// Display name.
    pub friendly_name: String,

    /// Whether the voice is available under the current license.
    #[serde(default)]
    pub enabled: bool,

    /// Whether the user has favorited the voice.
    #[serde(default)]
    pub favorited: bool,
}

// ============================================================================
// SoundboardProfile
// ============================================================================

/// One soundboard profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundboardProfile {
    /// Stable profile id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Whether the profile is user-created.
    #[serde(default)]
    pub is_custom: bool,
}

// ============================================================================
// Meme
// ============================================================================

/// One meme sound playable through the soundboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    /// Audio file name, used as the play handle.
    pub file_name: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Sound type reported by the application (e.g. `"memeSound"`).
    #[serde(default, rename = "type")]
    pub kind: String,
}

// ============================================================================
// UserLicense
// ============================================================================

/// The user's license tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLicense {
    /// License type (e.g. `"free"`, `"pro"`).
    pub license_type: String,
}

// ============================================================================
// Tests
// ============================================================================
