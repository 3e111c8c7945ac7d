//! Domain layer for pablet-client.
//!
//! Pure types with no dependencies on I/O, sockets, or the async runtime:
//!
//! - [`ClientConfig`] – every runtime setting, as stored in the TOML file
//! - [`FeedLine`] – one line of the JSON input feed (pointer event or command)

pub mod config;
pub mod feed;

pub use config::{ClientConfig, ConnectionSettings, LoggingSettings};
pub use feed::FeedLine;
