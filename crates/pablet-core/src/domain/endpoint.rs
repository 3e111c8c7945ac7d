//! Turning a user-entered host into the endpoint URI the transport dials.
//!
//! The user only ever types a host (`192.168.100.4`, `desk.local`, `::1`).
//! The scheme and port are configuration constants; they are never typed by
//! the user and never negotiated with the host.
//!
//! ```text
//! "192.168.100.4"  +  EndpointConfig { scheme: "ws", port: 3244 }
//!                  =  ws://192.168.100.4:3244
//! ```

use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// URI scheme used when none is configured.
pub const DEFAULT_SCHEME: &str = "ws";

/// Port the remote host listens on when none is configured.
pub const DEFAULT_PORT: u16 = 3244;

/// Errors produced while validating a user-entered host.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// Nothing was entered.
    #[error("no host address entered")]
    Empty,

    /// The host contains a character that cannot appear in a bare host name.
    #[error("host '{host}' contains invalid character {ch:?}")]
    InvalidCharacter { host: String, ch: char },

    /// The user typed `host:port`; the port is fixed by configuration.
    #[error("host '{0}' includes a port; only the host may be entered")]
    UnexpectedPort(String),
}

/// The fixed parts of every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub scheme: String,
    pub port: u16,
}

impl Default for EndpointConfig {
    /// `ws` on port 3244.
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl EndpointConfig {
    /// Validates `address` and combines it with the configured scheme and port.
    ///
    /// Surrounding whitespace is trimmed.  IPv6 literals may be entered with
    /// or without brackets.
    ///
    /// # Errors
    ///
    /// Returns an [`EndpointError`] when the address is empty, contains
    /// characters that are not valid in a host, or carries its own port.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pablet_core::EndpointConfig;
    ///
    /// let endpoint = EndpointConfig::default().endpoint_for(" 10.0.0.7 ").unwrap();
    /// assert_eq!(endpoint.uri(), "ws://10.0.0.7:3244");
    /// ```
    pub fn endpoint_for(&self, address: &str) -> Result<Endpoint, EndpointError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(EndpointError::Empty);
        }

        let unbracketed = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .unwrap_or(trimmed);

        if let Ok(ip) = unbracketed.parse::<Ipv6Addr>() {
            return Ok(Endpoint {
                scheme: self.scheme.clone(),
                host: Host::Ipv6(ip),
                port: self.port,
            });
        }

        if let Some(ch) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@' | '[' | ']' | '\\'))
        {
            return Err(EndpointError::InvalidCharacter {
                host: trimmed.to_string(),
                ch,
            });
        }

        if trimmed.contains(':') {
            return Err(EndpointError::UnexpectedPort(trimmed.to_string()));
        }

        Ok(Endpoint {
            scheme: self.scheme.clone(),
            host: Host::Name(trimmed.to_string()),
            port: self.port,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Host {
    Name(String),
    Ipv6(Ipv6Addr),
}

/// A validated host combined with the configured scheme and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: Host,
    port: u16,
}

impl Endpoint {
    /// The host as the user entered it (brackets stripped for IPv6).
    pub fn host(&self) -> String {
        match &self.host {
            Host::Name(name) => name.clone(),
            Host::Ipv6(ip) => ip.to_string(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The URI handed to the transport, e.g. `ws://10.0.0.7:3244`.
    pub fn uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            Host::Name(name) => write!(f, "{}://{}:{}", self.scheme, name, self.port),
            Host::Ipv6(ip) => write!(f, "{}://[{}]:{}", self.scheme, ip, self.port),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
