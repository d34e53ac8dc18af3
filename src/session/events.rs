//! The event surface.
//!
//! [`EventBus`] is an explicit publish/subscribe object owned by the
//! session instance. Handlers subscribe per [`EventKind`]; a catch-all
//! subscription receives every inbound frame verbatim, before and
//! independently of classification. That raw channel is the diagnostic
//! firehose and is never gated by classification success.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::identifiers::SubscriptionId;
use crate::protocol::{ClientEvent, EventKind};

// ============================================================================
// Types
// ============================================================================

/// Handler for one subscribed event kind.
pub type EventHandler = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Handler receiving every inbound frame as raw JSON.
pub type RawHandler = Arc<dyn Fn(&Value) + Send + Sync>;

// ============================================================================
// EventBus
// ============================================================================

/// Per-session publish/subscribe hub.
///
/// Cheaply cloneable; clones share the same subscriber lists.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<FxHashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>>,
    raw: Mutex<Vec<(SubscriptionId, RawHandler)>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a handler to one event kind.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.inner
            .handlers
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Removes one subscription from one event kind.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.lock();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        list.len() != before
    }

    /// Subscribes a catch-all handler for every inbound frame.
    pub fn subscribe_all(
        &self,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.inner.raw.lock().push((id, Arc::new(handler)));
        id
    }

    /// Removes one catch-all subscription.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe_all(&self, id: SubscriptionId) -> bool {
        let mut raw = self.inner.raw.lock();
        let before = raw.len();
        raw.retain(|(sub_id, _)| *sub_id != id);
        raw.len() != before
    }

    /// Delivers an event to every handler subscribed to its kind.
    ///
    /// The handler list is snapshotted before invocation, so handlers
    /// may call back into the bus (or the session that owns it) without
    /// deadlocking.
    pub fn emit(&self, event: &ClientEvent) {
        let snapshot: Vec<EventHandler> = {
            let handlers = self.inner.handlers.lock();
            match handlers.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };
        for handler in snapshot {
            handler(event);
        }
    }

    /// Delivers a raw inbound frame to every catch-all handler.
    ///
    /// Snapshots the list like [`emit`](Self::emit).
    pub fn broadcast_raw(&self, frame: &Value) {
        let snapshot: Vec<RawHandler> = {
            let raw = self.inner.raw.lock();
            raw.iter().map(|(_, h)| Arc::clone(h)).collect()
        };
        for handler in snapshot {
            handler(frame);
        }
    }

    #[inline]
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    #[test]
    fn test_subscribe_and_emit() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        bus.subscribe(EventKind::Connected, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&ClientEvent::Connected);
        bus.emit(&ClientEvent::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_only_matching_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        bus.subscribe(EventKind::VoiceChangerChanged, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&ClientEvent::Connected);
        bus.emit(&ClientEvent::MuteMicChanged { enabled: true });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.emit(&ClientEvent::VoiceChangerChanged { enabled: false });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let id = bus.subscribe(EventKind::Connected, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(bus.unsubscribe(EventKind::Connected, id));
        assert!(!bus.unsubscribe(EventKind::Connected, id));

        bus.emit(&ClientEvent::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscriptions_independent_per_kind() {
        let bus = EventBus::new();
        let connected = Arc::new(AtomicUsize::new(0));
        let muted = Arc::new(AtomicUsize::new(0));

        let connected_clone = Arc::clone(&connected);
        bus.subscribe(EventKind::Connected, move |_| {
            connected_clone.fetch_add(1, Ordering::SeqCst);
        });
        let muted_clone = Arc::clone(&muted);
        let mute_id = bus.subscribe(EventKind::MuteMicChanged, move |_| {
            muted_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.unsubscribe(EventKind::MuteMicChanged, mute_id);

        bus.emit(&ClientEvent::Connected);
        bus.emit(&ClientEvent::MuteMicChanged { enabled: true });

        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(muted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_catch_all_receives_raw_frames() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let id = bus.subscribe_all(move |frame| {
            assert!(frame.get("action").is_some());
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.broadcast_raw(&json!({"action": "voiceLoadedEvent"}));
        bus.broadcast_raw(&json!({"action": "whoKnowsWhatThisIs"}));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        assert!(bus.unsubscribe_all(id));
        bus.broadcast_raw(&json!({"action": "getVoices"}));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_handler_may_reenter_the_bus() {
        // A handler calling back into the bus (emit, subscribe,
        // unsubscribe) must not deadlock on the subscriber lists.
        let bus = EventBus::new();
        let nested = Arc::new(AtomicUsize::new(0));

        let nested_clone = Arc::clone(&nested);
        bus.subscribe(EventKind::Disconnected, move |_| {
            nested_clone.fetch_add(1, Ordering::SeqCst);
        });

        let reentrant_bus = bus.clone();
        bus.subscribe(EventKind::RegistrationFailed, move |_| {
            reentrant_bus.emit(&ClientEvent::Disconnected);
        });

        bus.emit(&ClientEvent::RegistrationFailed {
            code: "403".into(),
            message: "invalid key".into(),
        });
        assert_eq!(nested.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_raw_handler_may_subscribe_during_broadcast() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let seen_clone = Arc::clone(&seen);
        let reentrant_bus = bus.clone();
        bus.subscribe_all(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            reentrant_bus.subscribe_all(|_| {});
        });

        bus.broadcast_raw(&json!({"action": "voiceLoadedEvent"}));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        bus.subscribe(EventKind::Connected, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let cloned = bus.clone();
        cloned.emit(&ClientEvent::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
