//! WebSocket connection and event loop.
//!
//! One [`Connection`] owns one WebSocket to the application: a spawned
//! tokio task multiplexes inbound frames and outbound commands, and the
//! correlation map pairs each awaited request with the response echoing
//! its id.
//!
//! # Event Loop
//!
//! The task handles:
//!
//! - Inbound frames, handed to the [router](super::router) for
//!   classification
//! - Outbound requests from the session and accessor layers
//! - Request/response correlation by [`RequestId`]
//! - Failing every pending request when the connection ends

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::to_string;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::{ClientEvent, RequestEnvelope, ResponseEnvelope};
use crate::session::cache::SharedCache;
use crate::session::events::EventBus;

use super::router;

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// Map of correlation ids to response channels.
pub(crate) type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<ResponseEnvelope>>>;

/// The client-side WebSocket stream type.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request; `response_tx` is `None` for fire-and-forget.
    Send {
        envelope: RequestEnvelope,
        response_tx: Option<oneshot::Sender<Result<ResponseEnvelope>>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(RequestId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// One live WebSocket connection to the application.
///
/// `Connection` is `Send + Sync` and can be shared across tasks; all
/// operations are non-blocking.
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Correlation map (shared with event loop).
    correlation: Arc<Mutex<CorrelationMap>>,
    /// Flips to `true` when the event loop terminates.
    closed_rx: watch::Receiver<bool>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            correlation: Arc::clone(&self.correlation),
            closed_rx: self.closed_rx.clone(),
        }
    }
}

impl Connection {
    /// Dials the endpoint and spawns the event loop task.
    ///
    /// Inbound frames are routed against `cache` and `bus`; the loop
    /// emits [`ClientEvent::ConnectionClosed`] on `bus` when it ends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the handshake fails.
    pub async fn open(endpoint: &str, cache: SharedCache, bus: EventBus) -> Result<Self> {
        let (ws_stream, _response) = connect_async(endpoint).await?;
        debug!(endpoint, "WebSocket connection established");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let correlation = Arc::new(Mutex::new(CorrelationMap::default()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&correlation),
            cache,
            bus,
            closed_tx,
        ));

        Ok(Self {
            command_tx,
            correlation,
            closed_rx,
        })
    }

    /// Queues a request without awaiting its response.
    ///
    /// Returns the correlation id carried by the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has ended.
    pub fn send(&self, envelope: RequestEnvelope) -> Result<RequestId> {
        let id = envelope.id;
        self.command_tx
            .send(ConnectionCommand::Send {
                envelope,
                response_tx: None,
            })
            .map_err(|_| Error::ConnectionClosed)?;
        Ok(id)
    }

    /// Sends a request and awaits the response echoing its id.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the connection ends first
    /// - [`Error::RequestTimeout`] if `request_timeout` elapses
    /// - [`Error::Protocol`] if too many requests are already pending
    pub async fn request(
        &self,
        envelope: RequestEnvelope,
        request_timeout: Option<Duration>,
    ) -> Result<ResponseEnvelope> {
        let request_id = envelope.id;

        {
            let correlation = self.correlation.lock();
            if correlation.len() >= MAX_PENDING_REQUESTS {
                warn!(
                    pending = correlation.len(),
                    max = MAX_PENDING_REQUESTS,
                    "Too many pending requests"
                );
                return Err(Error::protocol(format!(
                    "Too many pending requests: {}/{}",
                    correlation.len(),
                    MAX_PENDING_REQUESTS
                )));
            }
        }

        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                envelope,
                response_tx: Some(response_tx),
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match request_timeout {
            None => response_rx.await.map_err(|_| Error::ConnectionClosed)?,
            Some(limit) => match timeout(limit, response_rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(Error::ConnectionClosed),
                Err(_) => {
                    // Timeout; clean up the correlation entry.
                    let _ = self
                        .command_tx
                        .send(ConnectionCommand::RemoveCorrelation(request_id));

                    Err(Error::request_timeout(request_id, limit.as_millis() as u64))
                }
            },
        }
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.correlation.lock().len()
    }

    /// Resolves every outstanding request as failed, immediately.
    ///
    /// Used by explicit disconnect so callers never wait past an
    /// intentional teardown.
    pub(crate) fn fail_pending(&self) {
        fail_pending_requests(&self.correlation);
    }

    /// Shuts down the connection gracefully.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Completes when the event loop has terminated.
    pub async fn wait_closed(&self) {
        let mut rx = self.closed_rx.clone();
        while !*rx.borrow() {
            // A dropped sender also means the loop is gone.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        correlation: Arc<Mutex<CorrelationMap>>,
        cache: SharedCache,
        bus: EventBus,
        closed_tx: watch::Sender<bool>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Inbound frames from the application
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            router::dispatch(text.as_str(), &correlation, &cache, &bus);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the session
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { envelope, response_tx }) => {
                            Self::handle_send_command(
                                envelope,
                                response_tx,
                                &mut ws_write,
                                &correlation,
                            ).await;
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        // Correlation failure path: nothing may hang past the
        // connection's end.
        fail_pending_requests(&correlation);
        bus.emit(&ClientEvent::ConnectionClosed);
        let _ = closed_tx.send(true);

        debug!("Event loop terminated");
    }

    /// Handles one queued outbound request.
    async fn handle_send_command(
        envelope: RequestEnvelope,
        response_tx: Option<oneshot::Sender<Result<ResponseEnvelope>>>,
        ws_write: &mut SplitSink<WsStream, Message>,
        correlation: &Arc<Mutex<CorrelationMap>>,
    ) {
        let request_id = envelope.id;

        let json = match to_string(&envelope) {
            Ok(j) => j,
            Err(e) => {
                if let Some(tx) = response_tx {
                    let _ = tx.send(Err(Error::Json(e)));
                }
                return;
            }
        };

        // Store correlation before sending
        if let Some(tx) = response_tx {
            correlation.lock().insert(request_id, tx);
        }

        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
            if let Some(tx) = correlation.lock().remove(&request_id) {
                let _ = tx.send(Err(Error::connection(e.to_string())));
            } else {
                warn!(%request_id, error = %e, "Failed to send fire-and-forget request");
            }
            return;
        }

        trace!(%request_id, action = %envelope.action, "Request sent");
    }
}

/// Fails all pending requests with [`Error::ConnectionClosed`].
fn fail_pending_requests(correlation: &Arc<Mutex<CorrelationMap>>) {
    let pending: Vec<_> = correlation.lock().drain().collect();
    let count = pending.len();

    for (_, tx) in pending {
        let _ = tx.send(Err(Error::ConnectionClosed));
    }

    if count > 0 {
        debug!(count, "Failed pending requests on connection loss");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_fail_pending_resolves_all() {
        let correlation: Arc<Mutex<CorrelationMap>> = Arc::new(Mutex::new(Default::default()));
        let mut receivers = Vec::new();

        for _ in 0..5 {
            let (tx, rx) = oneshot::channel();
            correlation.lock().insert(RequestId::generate(), tx);
            receivers.push(rx);
        }

        fail_pending_requests(&correlation);

        assert_eq!(correlation.lock().len(), 0);
        for mut rx in receivers {
            let result = rx.try_recv().expect("resolved synchronously");
            assert!(matches!(result, Err(Error::ConnectionClosed)));
        }
    }

    #[test]
    fn test_envelope_id_matches_send_result() {
        let envelope = RequestEnvelope::new("getVoices", json!({}));
        let id = envelope.id;
        // The id returned by send() is the one serialized on the wire.
        let text = serde_json::to_string(&envelope).expect("serialize");
        assert!(text.contains(&id.to_string()));
    }
}
