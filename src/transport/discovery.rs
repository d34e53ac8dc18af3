//! Port discovery.
//!
//! The application listens on one of a fixed list of candidate ports,
//! and the port changes across application restarts. Discovery probes
//! each candidate in list order with a bounded wait: the first port
//! that completes a WebSocket handshake wins. The probe connection is
//! closed immediately so it cannot race the real connection attempt
//! that follows.
//!
//! One call is one pass over the list; retrying a failed pass is the
//! session state machine's decision.

// ============================================================================
// Imports
// ============================================================================

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, trace};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

// ============================================================================
// Discovery
// ============================================================================

/// Probes the configured candidate ports in order and returns the
/// first one accepting the protocol's WebSocket handshake.
///
/// # Errors
///
/// - [`Error::Config`] if a candidate produces an invalid URL
/// - [`Error::NoReachablePort`] if no candidate completes a handshake
pub async fn discover_port(config: &ClientConfig) -> Result<u16> {
    for &port in &config.ports {
        let endpoint = config.ws_url(port);
        let url = Url::parse(&endpoint)
            .map_err(|e| Error::config(format!("invalid endpoint {endpoint}: {e}")))?;

        trace!(port, "Probing candidate port");

        match timeout(config.probe_timeout, connect_async(url.as_str())).await {
            Ok(Ok((mut ws_stream, _response))) => {
                // The probe's only job was the handshake.
                let _ = ws_stream.close(None).await;
                debug!(port, "Discovered live port");
                return Ok(port);
            }
            Ok(Err(e)) => {
                trace!(port, error = %e, "Candidate refused handshake");
            }
            Err(_) => {
                trace!(port, timeout_ms = config.probe_timeout.as_millis() as u64,
                    "Candidate probe timed out");
            }
        }
    }

    debug!(tried = config.ports.len(), "No candidate port reachable");
    Err(Error::no_reachable_port(&config.host, config.ports.len()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::net::TcpListener;

    use crate::config::ClientBuilder;

    /// Binds a WebSocket acceptor on an ephemeral port and returns the
    /// port. The acceptor serves exactly one handshake.
    async fn spawn_ws_acceptor() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let _ = tokio_tungstenite::accept_async(stream).await;
            }
        });

        port
    }

    /// Returns a port that was just released, so dialing it fails fast.
    async fn dead_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        port
    }

    fn config_with_ports(ports: Vec<u16>) -> ClientConfig {
        ClientBuilder::new()
            .client_key("test-key")
            .host("127.0.0.1")
            .ports(ports)
            .probe_timeout(Duration::from_millis(500))
            .build()
            .expect("valid config")
    }

    #[tokio::test]
    async fn test_discovers_single_live_port() {
        let port = spawn_ws_acceptor().await;
        let config = config_with_ports(vec![port]);

        let found = discover_port(&config).await.expect("discovery");
        assert_eq!(found, port);
    }

    #[tokio::test]
    async fn test_skips_dead_candidates_in_order() {
        let dead_a = dead_port().await;
        let dead_b = dead_port().await;
        let live = spawn_ws_acceptor().await;
        let config = config_with_ports(vec![dead_a, dead_b, live]);

        let found = discover_port(&config).await.expect("discovery");
        assert_eq!(found, live);
    }

    #[tokio::test]
    async fn test_fails_when_no_candidate_reachable() {
        let dead_a = dead_port().await;
        let dead_b = dead_port().await;
        let config = config_with_ports(vec![dead_a, dead_b]);

        let err = discover_port(&config).await.unwrap_err();
        assert!(matches!(err, Error::NoReachablePort { tried: 2, .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_non_websocket_listener_is_skipped() {
        // Accepts TCP but never answers the upgrade; the probe timeout
        // bounds the wait.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let silent = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            let _held = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let live = spawn_ws_acceptor().await;
        let config = config_with_ports(vec![silent, live]);

        let found = discover_port(&config).await.expect("discovery");
        assert_eq!(found, live);
    }
}
