//! Application layer for pablet-client.
//!
//! The application layer knows *what* happens to a pointer event, but
//! delegates *how* bytes reach the network to the infrastructure layer.
//!
//! # Responsibilities
//!
//! - Classifying pointer events into gestures and encoding them as frames
//! - The connection lifecycle and the send gate ([`TransportSession`])
//! - The single dispatch loop ([`run`])
//!
//! # What does NOT belong here?
//!
//! - Opening sockets or spawning link tasks (that is infrastructure)
//! - Reading stdin or files (that is infrastructure)
//! - WebSocket framing (handled by tokio-tungstenite)

pub mod remote_pointer;
pub mod session;

pub use remote_pointer::{run, Dispatched, RemotePointer, StopReason};
pub use session::{
    DropReason, SendOutcome, SessionError, Transport, TransportError, TransportEvent,
    TransportSession,
};
