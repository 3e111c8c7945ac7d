//! WebSocket transport: one background link task per connection.
//!
//! [`WebSocketTransport`] implements the application's
//! [`Transport`](crate::application::Transport) seam with `tokio-tungstenite`.
//!
//! # Link task lifecycle
//!
//! ```text
//! open() ──► spawn link task
//!              │ connect_async(uri) with timeout
//!              ├── error / timeout ─────────────► Failed { reason }
//!              ▼
//!            Opened
//!              │ loop:
//!              │   outbound frame  ──► WsMessage::Binary
//!              │   inbound data    ──► ignored (the host never replies)
//!              │   peer Close / EOF ─────────────► Closed
//!              │   write error ──────────────────► Failed { reason }
//!              │   sender dropped (close()) ──► send Close frame ──► Closed
//! ```
//!
//! Every event carries the [`ConnectionId`] the link was opened with, so the
//! session can discard reports from links it has already abandoned.
//!
//! # Back-pressure
//!
//! Frames are handed to the link through a bounded channel of
//! `outbound_capacity` slots using `try_send`.  The dispatcher never waits:
//! when the writer is that far behind, [`Transport::send`] reports
//! [`TransportError::Backlogged`] and the frame is dropped.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pablet_core::{ConnectionId, Endpoint};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, info, trace, warn};

use crate::application::{Transport, TransportError, TransportEvent};
use crate::domain::ConnectionSettings;

/// An open (or opening) link owned by the transport.
struct Link {
    connection: ConnectionId,
    outbound: mpsc::Sender<Vec<u8>>,
    task: JoinHandle<()>,
}

/// `tokio-tungstenite` implementation of [`Transport`].
///
/// Must be used from within a Tokio runtime: [`Transport::open`] spawns the
/// link task.
pub struct WebSocketTransport {
    connect_timeout: Duration,
    outbound_capacity: usize,
    events: mpsc::UnboundedSender<TransportEvent>,
    link: Option<Link>,
}

impl WebSocketTransport {
    /// Creates a transport and the receiver its link events are reported on.
    pub fn new(settings: &ConnectionSettings) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                connect_timeout: settings.connect_timeout(),
                outbound_capacity: settings.outbound_capacity.max(1),
                events,
                link: None,
            },
            events_rx,
        )
    }

    /// Whether a link task is currently running.
    pub fn has_link(&self) -> bool {
        self.link.as_ref().is_some_and(|link| !link.task.is_finished())
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, connection: ConnectionId, endpoint: &Endpoint) {
        self.close();

        let (outbound, outbound_rx) = mpsc::channel(self.outbound_capacity);
        let task = tokio::spawn(run_link(
            connection,
            endpoint.uri(),
            self.connect_timeout,
            outbound_rx,
            self.events.clone(),
        ));

        self.link = Some(Link {
            connection,
            outbound,
            task,
        });
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::Closed)?;
        link.outbound
            .try_send(bytes.to_vec())
            .map_err(|e| match e {
                TrySendError::Full(_) => TransportError::Backlogged,
                TrySendError::Closed(_) => TransportError::Closed,
            })
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            // Dropping the sender tells the link task to flush and close.
            debug!("closing link {}", link.connection);
        }
    }
}

// ── Link task ─────────────────────────────────────────────────────────────────

/// Connects to `uri`, then forwards outbound frames until either side closes.
///
/// Exactly one terminal event (`Closed` or `Failed`) is reported per link.
async fn run_link(
    connection: ConnectionId,
    uri: String,
    connect_timeout: Duration,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let report = |event: TransportEvent| {
        // The receiver is gone only when the whole client is shutting down.
        let _ = events.send(event);
    };

    // ── Step 1: Open the socket ──────────────────────────────────────────────
    //
    // The session may abandon the link while the handshake is in flight; that
    // shows up here as the outbound sender being dropped.
    let attempt = tokio::select! {
        attempt = timeout(connect_timeout, connect_async(uri.as_str())) => attempt,
        () = drain_until_closed(&mut outbound) => {
            debug!("link {connection}: abandoned while connecting to {uri}");
            report(TransportEvent::Closed { connection });
            return;
        }
    };

    let ws_stream = match attempt {
        Ok(Ok((ws_stream, _response))) => ws_stream,
        Ok(Err(e)) => {
            report(TransportEvent::Failed {
                connection,
                reason: e.to_string(),
            });
            return;
        }
        Err(_) => {
            report(TransportEvent::Failed {
                connection,
                reason: format!("timed out after {} ms", connect_timeout.as_millis()),
            });
            return;
        }
    };

    info!("link {connection}: WebSocket open to {uri}");
    report(TransportEvent::Opened { connection });

    // ── Step 2: Forward frames ───────────────────────────────────────────────
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(bytes) => {
                    trace!("link {connection}: sending {} bytes", bytes.len());
                    if let Err(e) = ws_tx.send(WsMessage::Binary(bytes)).await {
                        report(TransportEvent::Failed {
                            connection,
                            reason: format!("write failed: {e}"),
                        });
                        return;
                    }
                }
                None => {
                    // close() was called: send our Close frame and stop.
                    if let Err(e) = ws_tx.close().await {
                        debug!("link {connection}: close handshake failed: {e}");
                    }
                    report(TransportEvent::Closed { connection });
                    return;
                }
            },

            incoming = ws_rx.next() => match incoming {
                Some(Ok(WsMessage::Close(frame))) => {
                    debug!("link {connection}: peer closed ({frame:?})");
                    let _ = ws_tx.close().await;
                    report(TransportEvent::Closed { connection });
                    return;
                }
                Some(Ok(other)) => {
                    trace!("link {connection}: ignoring inbound message ({} bytes)", other.len());
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    debug!("link {connection}: stream ended");
                    report(TransportEvent::Closed { connection });
                    return;
                }
                Some(Err(e)) => {
                    warn!("link {connection}: read error: {e}");
                    report(TransportEvent::Failed {
                        connection,
                        reason: e.to_string(),
                    });
                    return;
                }
            },
        }
    }
}

/// Resolves once every sender for `outbound` is gone, discarding anything
/// offered in the meantime.
async fn drain_until_closed(outbound: &mut mpsc::Receiver<Vec<u8>>) {
    while outbound.recv().await.is_some() {}
}

// ── Tests ─────────────────────────────────────────────────────────────────────
