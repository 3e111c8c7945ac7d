//! Infrastructure layer for pablet-client.
//!
//! The infrastructure layer handles all I/O: reading the input feed, opening
//! the WebSocket to the remote host, and locating the config file.
//!
//! # Responsibilities
//!
//! - Implementing [`EventSource`](event_feed::EventSource) over stdin or a file
//! - Implementing [`Transport`](crate::application::Transport) with
//!   `tokio-tungstenite`
//! - Reading the TOML configuration
//!
//! # What does NOT belong here?
//!
//! - Gesture classification or frame encoding (that is `pablet-core`)
//! - Connection state rules (that is the application layer)

pub mod config_store;
pub mod event_feed;
pub mod ws_transport;

pub use config_store::{load_config, ConfigError};
pub use event_feed::{EventSource, JsonLinesSource, ListenerGuard, SourceError};
pub use ws_transport::WebSocketTransport;
