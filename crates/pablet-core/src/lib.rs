//! # pablet-core
//!
//! Shared library for the pablet remote pointer containing the binary wire
//! format, the gesture classifier, and the connection domain types.
//!
//! This crate has zero dependencies on OS APIs, sockets, or async runtimes.
//! Everything in it is deterministic and can be tested without a network.
//!
//! # Architecture overview (for beginners)
//!
//! pablet turns a touchscreen into a trackpad for another machine.  Touch and
//! mouse events from the screen are classified into gestures, the gestures are
//! encoded into a few bytes each, and the bytes are sent to the remote host
//! over a WebSocket.
//!
//! ```text
//! PointerEvent ──► GestureClassifier ──► GestureEvent ──► WireFrame ──► bytes
//! ```
//!
//! - **`domain`** – Pure logic: pointer samples, the gesture classifier, the
//!   connection state machine, and the rules for turning a user-entered host
//!   into an endpoint URI.
//!
//! - **`protocol`** – How gestures travel over the wire.  A click is a single
//!   byte; a motion delta is two little-endian `i16` values scaled by 100.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `pablet_core::GestureClassifier` instead of the full module path.
pub use domain::connection::{ConnectionId, ConnectionSignal, ConnectionState};
pub use domain::endpoint::{Endpoint, EndpointConfig, EndpointError};
pub use domain::gesture::{GestureClassifier, GestureEvent};
pub use domain::pointer::{Point, PointerEvent, PointerEventKind, PointerSample};
pub use protocol::frame::{decode_frame, encode_motion, quantize, FrameError, WireFrame};
