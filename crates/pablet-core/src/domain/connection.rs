//! Connection lifecycle states and their legal transitions.
//!
//! The state machine is deliberately tiny:
//!
//! ```text
//!                 Configure            Opened
//! Disconnected ─────────────► Connecting ───────► Connected
//!      ▲                          │                   │
//!      └──────────────────────────┴───────────────────┘
//!                 Closed / Failed / Disconnect
//! ```
//!
//! Every pass through `Connecting` belongs to a fresh [`ConnectionId`].  A
//! connection that has dropped is never revived; the user supplies an address
//! again and a new connection is created.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of the transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No endpoint configured, or the previous connection closed.
    #[default]
    Disconnected,
    /// An endpoint was supplied and the socket is being opened.
    Connecting,
    /// The socket is open; frames may be sent.
    Connected,
}

/// Inputs that drive [`ConnectionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    /// The user supplied a target address.
    Configure,
    /// The transport reported a successful open.
    Opened,
    /// The transport reported that the connection closed.
    Closed,
    /// The transport reported an error.
    Failed,
    /// The user asked to disconnect.
    Disconnect,
}

impl ConnectionState {
    /// Returns the state reached by applying `signal`, or `None` when the
    /// signal is not meaningful in the current state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pablet_core::{ConnectionSignal, ConnectionState};
    ///
    /// let s = ConnectionState::Disconnected;
    /// assert_eq!(s.on(ConnectionSignal::Configure), Some(ConnectionState::Connecting));
    /// assert_eq!(s.on(ConnectionSignal::Opened), None);
    /// ```
    pub fn on(self, signal: ConnectionSignal) -> Option<ConnectionState> {
        use ConnectionSignal as S;
        use ConnectionState::*;

        match (self, signal) {
            (Disconnected, S::Configure) => Some(Connecting),
            (Connecting, S::Opened) => Some(Connected),
            (Connecting | Connected, S::Closed | S::Failed | S::Disconnect) => Some(Disconnected),
            _ => None,
        }
    }

    /// `true` only in [`ConnectionState::Connected`].
    pub fn can_send(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        };
        f.write_str(label)
    }
}

/// Identifies one connection attempt.
///
/// Transport callbacks carry the id of the attempt they belong to, so a late
/// callback from a replaced connection can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Generates a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first block of the UUID is plenty to tell attempts apart in logs.
        let full = self.0.to_string();
        f.write_str(&full[..8])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
