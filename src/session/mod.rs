//! The protocol session engine.
//!
//! [`Session`] is the single caller-visible handle: it sequences
//! discovery, connection, and registration, reacts to transport loss
//! with the configured retry policy, and owns the state cache and the
//! event surface. The underlying connection may be torn down and
//! recreated by the retry policy while the `Session` handle stays
//! stable.
//!
//! # Lifecycle
//!
//! ```text
//! connect():  Idle -> Discovering -> Connecting
//!                  -> AwaitingRegistration -> Ready
//! ```
//!
//! Failures at any step enter `Retrying` and re-run the whole sequence
//! after the fixed retry interval, unless reconnect is disabled, the
//! budget is exhausted, or `disconnect()` was called. Reaching ready
//! resets the retry counter. Registration rejection and an unreachable
//! application are surfaced as distinct events.

// ============================================================================
// Modules
// ============================================================================

pub mod cache;
pub mod events;
pub mod state;

pub use cache::StateCache;
pub use events::EventBus;
pub use state::SessionState;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::config::{ClientBuilder, ClientConfig};
use crate::error::{Error, Result};
use crate::identifiers::{RequestId, SubscriptionId};
use crate::protocol::{Action, ClientEvent, EventKind, RequestEnvelope, ResponseEnvelope};
use crate::transport::{Connection, discover_port};

use cache::SharedCache;

// ============================================================================
// Session
// ============================================================================

/// One logical session with the application.
///
/// Cheaply cloneable; clones share the same connection, cache, and
/// event surface.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) config: ClientConfig,
    pub(crate) cache: SharedCache,
    bus: EventBus,
    state: Mutex<SessionState>,
    connection: Mutex<Option<Connection>>,
    /// Set by explicit `disconnect()`; suppresses auto-reconnect.
    force_disconnect: AtomicBool,
    /// Held for the duration of one discover/dial/register cycle, so
    /// concurrent `connect()` calls and the transport monitor never run
    /// two cycles (and race over `connection`) at once.
    cycle_lock: AsyncMutex<()>,
    retry_count: AtomicU32,
    /// Bumped on disconnect and re-registration so stale transport
    /// monitors exit instead of reconnecting.
    generation: AtomicU64,
}

impl SessionInner {
    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock();
        if *state != next {
            trace!(from = %*state, to = %next, "Session state change");
            *state = next;
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Session {
    /// Creates a session from a validated configuration.
    ///
    /// No network activity happens until [`connect()`](Self::connect).
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                cache: Arc::new(Mutex::new(StateCache::new())),
                bus: EventBus::new(),
                state: Mutex::new(SessionState::Idle),
                connection: Mutex::new(None),
                force_disconnect: AtomicBool::new(false),
                cycle_lock: AsyncMutex::new(()),
                retry_count: AtomicU32::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a builder for the session configuration.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

impl Session {
    /// Discovers the live port, connects, and registers.
    ///
    /// A no-op if the session is already ready. Honors the reconnect
    /// policy: failed attempts are retried at the fixed interval until
    /// ready, the budget runs out, or [`disconnect()`](Self::disconnect)
    /// is called. With an unlimited budget this only returns once
    /// ready or disconnected.
    ///
    /// # Errors
    ///
    /// - [`Error::NoReachablePort`] / [`Error::Connection`] if the
    ///   application cannot be reached and retries are disabled
    /// - [`Error::RegistrationRejected`] if the key is refused and
    ///   retries are disabled
    /// - [`Error::RetriesExhausted`] if a finite budget runs out
    pub async fn connect(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        self.inner.force_disconnect.store(false, Ordering::SeqCst);
        self.inner.retry_count.store(0, Ordering::SeqCst);

        Self::run_cycle(&self.inner, false).await
    }

    /// Disconnects and suppresses auto-reconnect.
    ///
    /// Every outstanding request is failed before this returns, so no
    /// caller waits past an intentional disconnect. A later
    /// [`connect()`](Self::connect) starts over from idle.
    pub fn disconnect(&self) {
        self.inner.force_disconnect.store(true, Ordering::SeqCst);
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        let connection = self.inner.connection.lock().take();
        if let Some(connection) = connection {
            connection.fail_pending();
            connection.shutdown();
        }

        self.inner.set_state(SessionState::Disconnected);
        self.inner.bus.emit(&ClientEvent::Disconnected);
        debug!("Session disconnected");
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Returns `true` if the session is registered and operational.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Returns a snapshot of the last-known application state.
    #[must_use]
    pub fn cache_snapshot(&self) -> StateCache {
        self.inner.cache.lock().clone()
    }

    /// One full discovery -> connect -> register cycle with retries.
    ///
    /// `delay_first` is set on the transport-loss path, where the
    /// retry interval must elapse before re-entering discovery.
    async fn run_cycle(inner: &Arc<SessionInner>, mut delay_first: bool) -> Result<()> {
        // One cycle at a time. A caller arriving while a cycle is
        // already underway waits here and joins its outcome.
        let _cycle = inner.cycle_lock.lock().await;

        if inner.state.lock().is_ready() && inner.connection.lock().is_some() {
            return Ok(());
        }

        let mut last_error: Option<Error> = None;

        loop {
            if inner.force_disconnect.load(Ordering::SeqCst) {
                return Err(Error::ConnectionClosed);
            }

            if delay_first {
                let attempts = inner.retry_count.load(Ordering::SeqCst);
                if !inner.config.reconnect.allows_retry(attempts) {
                    let err = if inner.config.reconnect.enabled {
                        Error::retries_exhausted(attempts)
                    } else {
                        last_error.take().unwrap_or(Error::ConnectionClosed)
                    };
                    warn!(error = %err, "Giving up on connection");
                    inner.bus.emit(&ClientEvent::ConnectionError {
                        message: err.to_string(),
                    });
                    inner.set_state(SessionState::Idle);
                    return Err(err);
                }

                let attempt = attempts + 1;
                inner.retry_count.store(attempt, Ordering::SeqCst);
                inner.set_state(SessionState::Retrying);
                inner.bus.emit(&ClientEvent::Retrying { attempt });
                sleep(inner.config.reconnect.interval).await;

                if inner.force_disconnect.load(Ordering::SeqCst) {
                    return Err(Error::ConnectionClosed);
                }
            }

            match Self::attempt_once(inner).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(error = %err, "Connection attempt failed");
                    last_error = Some(err);
                    delay_first = true;
                }
            }
        }
    }

    /// One attempt: discover, dial, register.
    async fn attempt_once(inner: &Arc<SessionInner>) -> Result<()> {
        inner.set_state(SessionState::Discovering);
        let port = discover_port(&inner.config).await?;

        inner.set_state(SessionState::Connecting);
        let endpoint = inner.config.ws_url(port);
        let connection =
            Connection::open(&endpoint, Arc::clone(&inner.cache), inner.bus.clone()).await?;
        inner.bus.emit(&ClientEvent::ConnectionOpened { port });
        *inner.connection.lock() = Some(connection.clone());

        inner.set_state(SessionState::AwaitingRegistration);
        let register = RequestEnvelope::new(
            Action::RegisterClient.wire_name(),
            json!({ "clientKey": inner.config.client_key }),
        );

        let reply = match connection
            .request(register, inner.config.request_timeout)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                Self::teardown(inner, &connection);
                return Err(err);
            }
        };

        let Some(status) = reply.registration_status() else {
            Self::teardown(inner, &connection);
            return Err(Error::protocol("registration reply carries no status"));
        };

        if !status.is_success() {
            warn!(code = %status.code, "Registration rejected");
            inner.bus.emit(&ClientEvent::RegistrationFailed {
                code: status.code.clone(),
                message: status.message.clone(),
            });
            Self::teardown(inner, &connection);
            return Err(Error::registration_rejected(status.code, status.message));
        }

        info!(port, "Registered with the application");
        inner.retry_count.store(0, Ordering::SeqCst);
        inner.set_state(SessionState::Ready);
        inner.bus.emit(&ClientEvent::Registered {
            payload: reply.payload.clone(),
        });
        inner.bus.emit(&ClientEvent::Connected);

        Self::spawn_monitor(Arc::clone(inner), connection);
        Ok(())
    }

    /// Watches one ready connection and drives reconnection when it
    /// drops for any reason other than explicit disconnect.
    fn spawn_monitor(inner: Arc<SessionInner>, connection: Connection) {
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::spawn(async move {
            connection.wait_closed().await;

            if inner.generation.load(Ordering::SeqCst) != generation
                || inner.force_disconnect.load(Ordering::SeqCst)
            {
                return;
            }

            debug!("Transport lost while ready");
            *inner.connection.lock() = None;

            if inner.config.reconnect.enabled {
                let _ = Session::run_cycle(&inner, true).await;
            } else {
                inner.bus.emit(&ClientEvent::ConnectionError {
                    message: Error::ConnectionClosed.to_string(),
                });
                inner.set_state(SessionState::Idle);
            }
        });
    }

    fn teardown(inner: &Arc<SessionInner>, connection: &Connection) {
        connection.shutdown();
        *inner.connection.lock() = None;
    }
}

// ============================================================================
// Requests
// ============================================================================

impl Session {
    /// Queues a request without awaiting its response.
    ///
    /// Returns the correlation id carried on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no live transport exists, or
    /// if the session is not ready and `action` is not the bootstrap
    /// registration.
    pub fn send(&self, action: Action, payload: Value) -> Result<RequestId> {
        let connection = self.guard_transport(action)?;
        connection.send(RequestEnvelope::new(action.wire_name(), payload))
    }

    /// Sends a request and awaits the response echoing its id.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] per the same gate as [`send`](Self::send)
    /// - [`Error::RequestFailed`] if the connection drops before the
    ///   response arrives
    /// - [`Error::RequestTimeout`] if the configured per-request
    ///   timeout elapses
    pub async fn request(&self, action: Action, payload: Value) -> Result<ResponseEnvelope> {
        let connection = self.guard_transport(action)?;
        let envelope = RequestEnvelope::new(action.wire_name(), payload);

        connection
            .request(envelope, self.inner.config.request_timeout)
            .await
            .map_err(|err| match err {
                Error::ConnectionClosed => Error::request_failed(
                    action.wire_name(),
                    "connection lost before the response arrived",
                ),
                other => other,
            })
    }

    /// Only the bootstrap registration may be sent before ready.
    fn guard_transport(&self, action: Action) -> Result<Connection> {
        let connection = self
            .inner
            .connection
            .lock()
            .clone()
            .ok_or_else(|| Error::not_connected(action.wire_name()))?;

        if action != Action::RegisterClient && !self.is_ready() {
            return Err(Error::not_connected(action.wire_name()));
        }

        Ok(connection)
    }
}

// ============================================================================
// Event Surface
// ============================================================================

impl Session {
    /// Subscribes a handler to one event kind.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.bus.subscribe(kind, handler)
    }

    /// Removes one subscription from one event kind.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(kind, id)
    }

    /// Subscribes a catch-all handler receiving every inbound frame.
    pub fn subscribe_all(
        &self,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.bus.subscribe_all(handler)
    }

    /// Removes one catch-all subscription.
    pub fn unsubscribe_all(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe_all(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
