//! pablet-client library crate.
//!
//! The client turns a stream of touch and mouse events into gesture frames
//! and sends them to a remote host over a WebSocket, so a touchscreen can be
//! used as the host's trackpad.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Input feed (JSON lines)             Remote host
//!         │                                ▲
//!         ▼                                │ binary frames
//! [pablet-client]                          │
//!   ├── domain/          ClientConfig, FeedLine
//!   ├── application/     RemotePointer (dispatch), TransportSession (lifecycle)
//!   └── infrastructure/
//!         ├── event_feed/    EventSource + ListenerGuard, JSON-lines reader
//!         ├── ws_transport/  WebSocket link task (tokio-tungstenite)
//!         └── config_store/  TOML config file lookup
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain`, `pablet-core`, and the `Transport` /
//!   `EventSource` traits only; it never touches a socket directly.
//! - `infrastructure` implements those traits with `tokio` and `tungstenite`.
//!
//! Everything in `application` runs on one logical thread: the binary drives
//! it from a single `current_thread` dispatch loop, so the session and the
//! classifier need no locks.

/// Domain layer: configuration and input-feed message types (no I/O).
pub mod domain;

/// Application layer: gesture dispatch and the transport session state machine.
pub mod application;

/// Infrastructure layer: WebSocket transport, input feed, config file.
pub mod infrastructure;
