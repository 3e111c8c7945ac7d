//! The line-oriented input feed.
//!
//! The client reads newline-delimited JSON.  Each line is either a raw
//! pointer event from the touch surface or a connection command typed by the
//! user:
//!
//! ```json
//! {"type":"connect","host":"192.168.100.4"}
//! {"type":"pointer","kind":"mouse_down","timestamp_ms":0,"position":{"x":100,"y":100}}
//! {"type":"pointer","kind":"mouse_move","timestamp_ms":16,"position":{"x":103.4,"y":98.1}}
//! {"type":"disconnect"}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` selects the variant; the pointer event's
//! own fields sit next to the tag in the same object.

use pablet_core::PointerEvent;
use serde::{Deserialize, Serialize};

/// One line of the input feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedLine {
    /// A raw event from the touch surface.
    Pointer(PointerEvent),

    /// The user entered a host address and wants to connect.
    Connect { host: String },

    /// The user asked to drop the current connection.
    Disconnect,
}

impl FeedLine {
    /// Parses one feed line.  Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for anything that is not a valid feed
    /// object.
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(trimmed).map(Some)
    }

    /// Short name for log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FeedLine::Pointer(_) => "Pointer",
            FeedLine::Connect { .. } => "Connect",
            FeedLine::Disconnect => "Disconnect",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
