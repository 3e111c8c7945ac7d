//! Client configuration types.
//!
//! [`ClientConfig`] is the single source of truth for all runtime settings.
//! It is read from a TOML file (see `infrastructure::config_store`), then
//! overridden field by field from CLI arguments in `main.rs`.
//!
//! ```toml
//! [connection]
//! host = "192.168.100.4"     # optional: connect immediately on start
//! scheme = "ws"
//! port = 3244
//! connect_timeout_ms = 5000
//! outbound_capacity = 32
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field has a serde default, so an empty file (or no file at all) is a
//! valid configuration.

use std::time::Duration;

use pablet_core::domain::endpoint::{EndpointConfig, DEFAULT_PORT, DEFAULT_SCHEME};
use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How and where to reach the remote host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Host to connect to at startup.  When absent the client waits for a
    /// `connect` line on the input feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// URI scheme of the endpoint.  The binary accepts only `ws`.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Port the host listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Give up on an open attempt after this many milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Frames that may sit between the dispatcher and the socket writer.
    ///
    /// When the writer falls this far behind, new frames are dropped rather
    /// than delivered late.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_outbound_capacity() -> usize {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: None,
            scheme: default_scheme(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ConnectionSettings {
    /// The fixed scheme and port every user-entered host is combined with.
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            scheme: self.scheme.clone(),
            port: self.port,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
