//! Wire protocol message types.
//!
//! The application speaks JSON text frames over one WebSocket at `/v1`:
//!
//! - Requests carry `action`, `id`, and `payload`.
//! - Correlated responses echo the `id` and add `actionType` and
//!   `actionObject`.
//! - Spontaneous events carry an `action` ending in `Event` and no id.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`action`] | Closed [`Action`] enumeration and wire names |
//! | [`envelope`] | [`RequestEnvelope`], [`ResponseEnvelope`] |
//! | [`event`] | [`ClientEvent`], [`EventKind`], spontaneous-event table |

mod action;
mod envelope;
mod event;

pub use action::Action;
#[cfg(test)]
pub(crate) use action::ALL_ACTIONS;
pub use envelope::{RegistrationStatus, RequestEnvelope, ResponseEnvelope};
pub use event::{ClientEvent, EventKind, StateEvent, ToggleKind};

/// Suffix carried by every spontaneous state-change action name.
pub const EVENT_SUFFIX: &str = "Event";

/// The `msg` value announcing that registration awaits user approval.
pub const PENDING_AUTH_NOTICE: &str = "pending authentication";
