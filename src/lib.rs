//! VoiceLink - Client for the desktop voice-changer control API.
//!
//! This library connects to the locally running voice-changer
//! application over its WebSocket control protocol and exposes its
//! voices, toggles, soundboards, and meme sounds as a typed async API.
//!
//! # Architecture
//!
//! The client follows a layered model:
//!
//! - **Discovery**: probes a fixed candidate port list until one
//!   accepts a WebSocket handshake at `/v1`
//! - **Transport**: one [`transport::Connection`] owns the socket and
//!   an event-loop task; a correlation map pairs requests with the
//!   responses echoing their id
//! - **Session**: a state machine drives discovery, connection, and
//!   client registration, and retries the whole cycle on loss
//! - **Accessors**: cache-first getters and round-tripping setters over
//!   the registered session
//!
//! Key design principles:
//!
//! - Requests carry a generated id; responses correlate by echoing it
//! - Spontaneous events (action names ending in `Event`) update the
//!   local cache and fan out to subscribers
//! - Cached reads cost zero network round-trips
//! - Event-driven architecture (no polling)
//!
//! # Quick Start
//!
//! ```no_run
//! use voicelink::{Session, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Build a session with the key identifying this client
//!     let config = Session::builder()
//!         .client_key("my-app-key")
//!         .build()?;
//!     let session = Session::new(config);
//!
//!     // Discover the port, connect, and register
//!     session.connect().await?;
//!
//!     // Load a random voice and read back the current one
//!     let voice = session.random_voice().await?;
//!     println!("Now speaking as {}", voice.friendly_name);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Client configuration and [`ClientBuilder`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types and the action table |
//! | [`session`] | Session state machine, event bus, state cache |
//! | [`transport`] | Port discovery, connection, message router |
//! | [`types`] | Application records: voices, soundboards, memes |
//!
//! # Features
//!
//! - **Port discovery**: finds the application among its candidate ports
//! - **Automatic reconnection**: configurable fixed-interval retry
//! - **Request correlation**: concurrent requests resolve independently
//! - **State cache**: last known application state, served locally

// ============================================================================
// Modules
// ============================================================================

/// High-level accessors: voices, toggles, soundboard, memes.
mod api;

/// Client configuration.
///
/// Use [`Session::builder()`] or [`ClientBuilder::new()`] to configure
/// host, ports, timeouts, and the reconnect policy.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Wire protocol message types.
///
/// Request/response envelopes, the closed action table, and the event
/// surface types.
pub mod protocol;

/// Session state machine, event bus, and state cache.
pub mod session;

/// Transport layer: port discovery, connection, message router.
pub mod transport;

/// Application records: voices, soundboard profiles, memes, license.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{CANDIDATE_PORTS, ClientBuilder, ClientConfig, ReconnectPolicy};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SubscriptionId};

// Protocol types
pub use protocol::{
    Action, ClientEvent, EventKind, RequestEnvelope, ResponseEnvelope, ToggleKind,
};

// Session types
pub use session::{EventBus, Session, SessionState, StateCache};

// Application records
pub use types::{Meme, SoundboardProfile, UserLicense, Voice};
