//! Client configuration and builder.
//!
//! Provides a fluent API for configuring and creating [`Session`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use voicelink::Session;
//!
//! # fn example() -> voicelink::Result<()> {
//! let config = Session::builder()
//!     .client_key("my-app-key")
//!     .retry_interval_ms(5_000)
//!     .max_retries(10)
//!     .build()?;
//! let session = Session::new(config);
//! # Ok(())
//! # }
//! ```
//!
//! [`Session`]: crate::session::Session

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Candidate TCP ports the application may be listening on, in probe
/// priority order. The port is not fixed across application restarts.
pub const CANDIDATE_PORTS: &[u16] = &[
    59129, 20000, 39273, 42152, 43782, 46667, 35679, 37170, 38501, 33952, 30546,
];

/// WebSocket path the control API is served on.
pub const API_PATH: &str = "/v1";

/// Default host running the application.
const DEFAULT_HOST: &str = "localhost";

/// Default bounded wait for one port probe's handshake.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1_500);

/// Default timeout for one request's response.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between reconnect attempts.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Reconnect behavior after discovery or transport failure.
///
/// The retry delay is a fixed interval, not exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to reconnect automatically.
    pub enabled: bool,
    /// Fixed delay between attempts.
    pub interval: Duration,
    /// Maximum attempts before giving up. `0` means unlimited.
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: DEFAULT_RETRY_INTERVAL,
            max_retries: 0,
        }
    }
}

impl ReconnectPolicy {
    /// Returns `true` if another attempt is allowed after `attempts`
    /// failures.
    #[inline]
    #[must_use]
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.enabled && (self.max_retries == 0 || attempts < self.max_retries)
    }
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Validated configuration for one [`Session`].
///
/// Created via [`ClientBuilder`].
///
/// [`Session`]: crate::session::Session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host running the application.
    pub host: String,
    /// Credential presented during registration.
    pub client_key: String,
    /// Candidate ports, tried in order during discovery.
    pub ports: Vec<u16>,
    /// Bounded wait for one port probe's handshake.
    pub probe_timeout: Duration,
    /// Timeout applied to each awaited request. `None` disables it.
    pub request_timeout: Option<Duration>,
    /// Reconnect behavior.
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Returns the WebSocket URL for a given port.
    ///
    /// Format: `ws://{host}:{port}/v1`
    #[inline]
    #[must_use]
    pub fn ws_url(&self, port: u16) -> String {
        format!("ws://{}:{}{}", self.host, port, API_PATH)
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for [`ClientConfig`].
///
/// Use [`Session::builder()`] to create one.
///
/// [`Session::builder()`]: crate::session::Session::builder
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    host: Option<String>,
    client_key: Option<String>,
    ports: Option<Vec<u16>>,
    probe_timeout: Option<Duration>,
    request_timeout: Option<Option<Duration>>,
    reconnect_enabled: Option<bool>,
    retry_interval: Option<Duration>,
    max_retries: Option<u32>,
}

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host running the application. Defaults to `localhost`.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the client key presented during registration. Required.
    #[inline]
    #[must_use]
    pub fn client_key(mut self, key: impl Into<String>) -> Self {
        self.client_key = Some(key.into());
        self
    }

    /// Overrides the candidate port list.
    ///
    /// Defaults to [`CANDIDATE_PORTS`]. Ports are probed in the order
    /// given.
    #[inline]
    #[must_use]
    pub fn ports(mut self, ports: impl Into<Vec<u16>>) -> Self {
        self.ports = Some(ports.into());
        self
    }

    /// Sets the bounded wait for one port probe's handshake.
    #[inline]
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Sets the per-request response timeout. Defaults to 30s.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(Some(timeout));
        self
    }

    /// Disables the per-request response timeout.
    ///
    /// A request sent while the application keeps the socket open but
    /// stops replying will then wait until the connection drops.
    #[inline]
    #[must_use]
    pub fn no_request_timeout(mut self) -> Self {
        self.request_timeout = Some(None);
        self
    }

    /// Enables or disables automatic reconnect. Defaults to enabled.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, enabled: bool) -> Self {
        self.reconnect_enabled = Some(enabled);
        self
    }

    /// Sets the fixed delay between reconnect attempts, in milliseconds.
    #[inline]
    #[must_use]
    pub fn retry_interval_ms(mut self, millis: u64) -> Self {
        self.retry_interval = Some(Duration::from_millis(millis));
        self
    }

    /// Sets the maximum reconnect attempts. `0` means unlimited.
    #[inline]
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = Some(max);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no client key was set
    /// - [`Error::Config`] if the port list was overridden with an empty
    ///   list
    pub fn build(self) -> Result<ClientConfig> {
        let client_key = self.client_key.ok_or_else(|| {
            Error::config(
                "Client key is required. Use .client_key() to set it.\n\
                 Example: Session::builder().client_key(\"my-app-key\")",
            )
        })?;

        let ports = self.ports.unwrap_or_else(|| CANDIDATE_PORTS.to_vec());
        if ports.is_empty() {
            return Err(Error::config("Candidate port list must not be empty"));
        }

        Ok(ClientConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            client_key,
            ports,
            probe_timeout: self.probe_timeout.unwrap_or(DEFAULT_PROBE_TIMEOUT),
            request_timeout: self
                .request_timeout
                .unwrap_or(Some(DEFAULT_REQUEST_TIMEOUT)),
            reconnect: ReconnectPolicy {
                enabled: self.reconnect_enabled.unwrap_or(true),
                interval: self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL),
                max_retries: self.max_retries.unwrap_or(0),
            },
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
