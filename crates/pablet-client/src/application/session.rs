//! Transport session: the connection lifecycle and the send gate.
//!
//! [`TransportSession`] owns exactly one [`Transport`] and at most one active
//! connection.  It applies the [`ConnectionState`] machine from `pablet-core`
//! to user commands (`configure`, `disconnect`) and to link events reported
//! by the transport (`Opened`, `Closed`, `Failed`).
//!
//! # Connection identity
//!
//! Every successful [`TransportSession::configure`] creates a new
//! [`ConnectionId`].  Transport events carry the id of the link they describe,
//! and events for any id other than the active one are ignored.  A late
//! `Closed` from an old link can therefore never tear down a newer one, and a
//! dropped connection is never revived: reconnecting means configuring again.
//!
//! # Send policy
//!
//! There is no frame queue.  A frame offered while the session is not
//! `Connected` is dropped and reported as [`SendOutcome::Dropped`]; pointer
//! motion is only meaningful in real time, so replaying stale deltas after a
//! reconnect would move the remote cursor somewhere the user never pointed.
//!
//! # Teardown
//!
//! [`TransportSession::teardown`] closes the connection and detaches the input
//! listeners.  It runs at most once; `Drop` calls it as well, so every exit
//! path releases both.

use pablet_core::{
    ConnectionId, ConnectionSignal, ConnectionState, Endpoint, EndpointConfig, EndpointError,
    WireFrame,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::domain::FeedLine;
use crate::infrastructure::event_feed::{EventSource, ListenerGuard, SourceError};

// ── Transport seam ────────────────────────────────────────────────────────────

/// Failure reported synchronously by [`Transport::send`].
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The link's hand-off buffer is full; the writer is behind.
    #[error("outbound buffer is full")]
    Backlogged,

    /// There is no open link to write to.
    #[error("link is closed")]
    Closed,
}

/// Asynchronous notifications from the transport about a specific link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket for `connection` finished opening.
    Opened { connection: ConnectionId },
    /// The socket for `connection` closed, by either side.
    Closed { connection: ConnectionId },
    /// Opening or writing to `connection` failed.
    Failed {
        connection: ConnectionId,
        reason: String,
    },
}

impl TransportEvent {
    /// The link this event describes.
    pub fn connection(&self) -> ConnectionId {
        match self {
            TransportEvent::Opened { connection }
            | TransportEvent::Closed { connection }
            | TransportEvent::Failed { connection, .. } => *connection,
        }
    }

    fn signal(&self) -> ConnectionSignal {
        match self {
            TransportEvent::Opened { .. } => ConnectionSignal::Opened,
            TransportEvent::Closed { .. } => ConnectionSignal::Closed,
            TransportEvent::Failed { .. } => ConnectionSignal::Failed,
        }
    }
}

/// The socket-facing half of a session.
///
/// Implementations must not block: `open` starts the connection in the
/// background and reports the result later as a [`TransportEvent`], and
/// `send` hands the bytes off without waiting for the network.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Starts opening a link to `endpoint`, identified by `connection`.
    fn open(&mut self, connection: ConnectionId, endpoint: &Endpoint);

    /// Hands one encoded frame to the open link.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Closes the current link, if any.  Must be safe to call repeatedly.
    fn close(&mut self);
}

// ── Session types ─────────────────────────────────────────────────────────────

/// Why a frame was not handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The session is not in the `Connected` state.
    NotConnected,
    /// The link is open but its writer has fallen behind.
    Backlogged,
    /// The link went away between the state check and the write.
    LinkClosed,
}

/// Result of offering a frame to [`TransportSession::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Dropped(DropReason),
}

/// Errors returned by session commands.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A connection is already connecting or connected.
    #[error("a connection is already active (state: {state})")]
    AlreadyActive { state: ConnectionState },

    /// The user-entered address cannot be turned into an endpoint.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] EndpointError),

    /// The session has been torn down and accepts no further commands.
    #[error("session has been torn down")]
    TornDown,
}

/// The connection currently owned by the session.
#[derive(Debug)]
struct ActiveConnection {
    id: ConnectionId,
    endpoint: Endpoint,
    state: ConnectionState,
}

// ── TransportSession ──────────────────────────────────────────────────────────

/// Owns the transport, the active connection, and the input listeners.
pub struct TransportSession<T: Transport> {
    transport: T,
    endpoint_config: EndpointConfig,
    active: Option<ActiveConnection>,
    listeners: Option<ListenerGuard>,
    torn_down: bool,
}

impl<T: Transport> TransportSession<T> {
    /// Creates a disconnected session.  `endpoint_config` supplies the fixed
    /// scheme and port combined with every user-entered host.
    pub fn new(transport: T, endpoint_config: EndpointConfig) -> Self {
        Self {
            transport,
            endpoint_config,
            active: None,
            listeners: None,
            torn_down: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map_or(ConnectionState::Disconnected, |active| active.state)
    }

    /// Host of the active connection.  `None` whenever disconnected.
    pub fn address(&self) -> Option<String> {
        self.active.as_ref().map(|active| active.endpoint.host())
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.active.as_ref().map(|active| &active.endpoint)
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn listeners_attached(&self) -> bool {
        self.listeners.as_ref().is_some_and(ListenerGuard::is_attached)
    }

    /// Starts connecting to `address` on the configured scheme and port.
    ///
    /// Only valid while disconnected.  On success the session is
    /// `Connecting` and the returned id identifies the new link.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyActive`] if a connection is in progress or open.
    /// - [`SessionError::InvalidAddress`] if `address` is empty or malformed.
    /// - [`SessionError::TornDown`] after [`teardown`](Self::teardown).
    ///
    /// The state is unchanged on every error.
    pub fn configure(&mut self, address: &str) -> Result<ConnectionId, SessionError> {
        if self.torn_down {
            return Err(SessionError::TornDown);
        }
        if let Some(active) = &self.active {
            return Err(SessionError::AlreadyActive {
                state: active.state,
            });
        }

        let endpoint = self.endpoint_config.endpoint_for(address)?;
        let state = ConnectionState::Disconnected
            .on(ConnectionSignal::Configure)
            .unwrap_or(ConnectionState::Connecting);
        let id = ConnectionId::new();

        info!("status: {state} to {endpoint} (connection {id})");
        self.transport.open(id, &endpoint);
        self.active = Some(ActiveConnection {
            id,
            endpoint,
            state,
        });
        Ok(id)
    }

    /// Applies a transport event and returns the new state if it changed.
    ///
    /// Events for a connection other than the active one are ignored.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Option<ConnectionState> {
        let connection = event.connection();
        let Some(active) = self.active.as_mut() else {
            debug!("ignoring {event:?}: no active connection");
            return None;
        };
        if active.id != connection {
            debug!("ignoring {event:?}: active connection is {}", active.id);
            return None;
        }

        let Some(next) = active.state.on(event.signal()) else {
            debug!("ignoring {event:?} in state {}", active.state);
            return None;
        };

        if let TransportEvent::Failed { reason, .. } = &event {
            warn!("connection {connection} to {} failed: {reason}", active.endpoint);
        }

        if next == ConnectionState::Disconnected {
            let endpoint = active.endpoint.clone();
            self.active = None;
            self.transport.close();
            info!("status: {next} (was {endpoint})");
        } else {
            active.state = next;
            info!("status: {next} to {}", active.endpoint);
        }
        Some(next)
    }

    /// Offers one frame for delivery.
    ///
    /// The frame reaches the transport only while `Connected`; otherwise it is
    /// dropped.  Dropping is never an error.
    pub fn send(&mut self, frame: &WireFrame) -> SendOutcome {
        if !self.state().can_send() {
            trace!("dropping {} frame: not connected", frame.kind_name());
            return SendOutcome::Dropped(DropReason::NotConnected);
        }

        match self.transport.send(&frame.to_bytes()) {
            Ok(()) => {
                trace!("sent {frame:?}");
                SendOutcome::Sent
            }
            Err(TransportError::Backlogged) => {
                debug!("dropping {} frame: link is backlogged", frame.kind_name());
                SendOutcome::Dropped(DropReason::Backlogged)
            }
            Err(TransportError::Closed) => {
                debug!("dropping {} frame: link closed", frame.kind_name());
                SendOutcome::Dropped(DropReason::LinkClosed)
            }
        }
    }

    /// Closes the active connection at the user's request.
    ///
    /// Returns the new state, or `None` when there was nothing to disconnect.
    pub fn disconnect(&mut self) -> Option<ConnectionState> {
        let active = self.active.take()?;
        let next = active
            .state
            .on(ConnectionSignal::Disconnect)
            .unwrap_or(ConnectionState::Disconnected);

        self.transport.close();
        info!("status: {next} (closed {} by request)", active.endpoint);
        Some(next)
    }

    /// Starts `source` and holds its registration until teardown.
    ///
    /// Attaching again replaces (and detaches) the previous source.
    ///
    /// # Errors
    ///
    /// Propagates the [`SourceError`] if the source cannot start.
    pub fn attach_listeners(
        &mut self,
        source: Box<dyn EventSource>,
    ) -> Result<mpsc::Receiver<FeedLine>, SourceError> {
        if let Some(mut previous) = self.listeners.take() {
            previous.detach();
        }
        let (guard, rx) = ListenerGuard::attach(source)?;
        self.listeners = Some(guard);
        Ok(rx)
    }

    /// Closes the connection and detaches all listeners.
    ///
    /// Runs at most once.  Returns `true` if an active connection was closed.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        let closed = self.disconnect().is_some();
        if let Some(mut listeners) = self.listeners.take() {
            listeners.detach();
        }
        debug!("session torn down");
        closed
    }
}

impl<T: Transport> Drop for TransportSession<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_feed::mock::MockEventSource;
    use mockall::predicate::*;

    fn session_with(transport: MockTransport) -> TransportSession<MockTransport> {
        TransportSession::new(transport, EndpointConfig::default())
    }

    /// A transport that accepts any number of opens and closes.
    fn permissive_transport() -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_open().return_const(());
        transport.expect_close().return_const(());
        transport
    }

    // ── configure ─────────────────────────────────────────────────────────────

    #[test]
    fn test_configure_opens_default_endpoint_and_enters_connecting() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .withf(|_, endpoint| endpoint.uri() == "ws://192.168.100.4:3244")
            .times(1)
            .return_const(());
        transport.expect_close().return_const(());
        let mut session = session_with(transport);

        // Act
        let id = session.configure("192.168.100.4").expect("valid address");

        // Assert
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(session.connection_id(), Some(id));
        assert_eq!(session.address().as_deref(), Some("192.168.100.4"));
    }

    #[test]
    fn test_configure_rejects_empty_address_and_keeps_state() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(0);
        let mut session = session_with(transport);

        let result = session.configure("   ");

        assert_eq!(
            result,
            Err(SessionError::InvalidAddress(EndpointError::Empty))
        );
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.address().is_none());
    }

    #[test]
    fn test_configure_while_connecting_is_rejected() {
        let mut session = session_with(permissive_transport());
        session.configure("10.0.0.1").expect("first configure");

        let second = session.configure("10.0.0.2");

        assert_eq!(
            second,
            Err(SessionError::AlreadyActive {
                state: ConnectionState::Connecting
            })
        );
        assert_eq!(session.address().as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn test_each_configure_creates_a_new_connection_id() {
        let mut session = session_with(permissive_transport());
        let first = session.configure("10.0.0.1").expect("configure");
        session.disconnect();

        let second = session.configure("10.0.0.1").expect("reconfigure");

        assert_ne!(first, second);
    }

    // ── transport events ──────────────────────────────────────────────────────

    #[test]
    fn test_opened_event_moves_to_connected() {
        // Arrange
        let mut session = session_with(permissive_transport());
        let id = session.configure("10.0.0.1").expect("configure");

        // Act
        let changed = session.handle_transport_event(TransportEvent::Opened { connection: id });

        // Assert
        assert_eq!(changed, Some(ConnectionState::Connected));
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_closed_event_moves_to_disconnected_and_clears_address() {
        let mut session = session_with(permissive_transport());
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });

        let changed = session.handle_transport_event(TransportEvent::Closed { connection: id });

        assert_eq!(changed, Some(ConnectionState::Disconnected));
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(session.address().is_none());
        assert!(session.endpoint().is_none());
    }

    #[test]
    fn test_failed_event_while_connecting_resets_session() {
        let mut session = session_with(permissive_transport());
        let id = session.configure("10.0.0.1").expect("configure");

        let changed = session.handle_transport_event(TransportEvent::Failed {
            connection: id,
            reason: "connection refused".to_string(),
        });

        assert_eq!(changed, Some(ConnectionState::Disconnected));
        assert!(session.address().is_none());
    }

    #[test]
    fn test_events_for_stale_connection_are_ignored() {
        // Arrange: first connection dropped, second one connecting
        let mut session = session_with(permissive_transport());
        let old = session.configure("10.0.0.1").expect("configure");
        session.disconnect();
        let current = session.configure("10.0.0.2").expect("reconfigure");

        // Act
        let opened = session.handle_transport_event(TransportEvent::Opened { connection: old });
        let closed = session.handle_transport_event(TransportEvent::Closed { connection: old });

        // Assert
        assert_eq!(opened, None);
        assert_eq!(closed, None);
        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(session.connection_id(), Some(current));
    }

    #[test]
    fn test_events_while_disconnected_are_ignored() {
        let mut session = session_with(MockTransport::new());

        let changed = session.handle_transport_event(TransportEvent::Opened {
            connection: ConnectionId::new(),
        });

        assert_eq!(changed, None);
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_duplicate_opened_event_is_ignored() {
        let mut session = session_with(permissive_transport());
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });

        let again = session.handle_transport_event(TransportEvent::Opened { connection: id });

        assert_eq!(again, None);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    // ── send ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_send_while_disconnected_is_dropped_without_touching_transport() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);
        let mut session = session_with(transport);

        let outcome = session.send(&WireFrame::Click);

        assert_eq!(outcome, SendOutcome::Dropped(DropReason::NotConnected));
    }

    #[test]
    fn test_send_while_connecting_is_dropped() {
        let mut transport = permissive_transport();
        transport.expect_send().times(0);
        let mut session = session_with(transport);
        session.configure("10.0.0.1").expect("configure");

        let outcome = session.send(&WireFrame::Click);

        assert_eq!(outcome, SendOutcome::Dropped(DropReason::NotConnected));
    }

    #[test]
    fn test_send_while_connected_forwards_encoded_bytes() {
        // Arrange
        let mut transport = permissive_transport();
        transport
            .expect_send()
            .with(eq(vec![0x54u8, 0x01, 0x42, 0xFF]))
            .times(1)
            .returning(|_| Ok(()));
        let mut session = session_with(transport);
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });

        // Act
        let outcome = session.send(&WireFrame::Motion { dx: 340, dy: -190 });

        // Assert
        assert_eq!(outcome, SendOutcome::Sent);
    }

    #[test]
    fn test_send_reports_backlogged_link() {
        let mut transport = permissive_transport();
        transport
            .expect_send()
            .returning(|_| Err(TransportError::Backlogged));
        let mut session = session_with(transport);
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });

        let outcome = session.send(&WireFrame::DoubleClick);

        assert_eq!(outcome, SendOutcome::Dropped(DropReason::Backlogged));
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_send_after_close_event_is_dropped() {
        let mut transport = permissive_transport();
        transport.expect_send().times(0);
        let mut session = session_with(transport);
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });
        session.handle_transport_event(TransportEvent::Closed { connection: id });

        let outcome = session.send(&WireFrame::Click);

        assert_eq!(outcome, SendOutcome::Dropped(DropReason::NotConnected));
    }

    // ── disconnect / teardown ─────────────────────────────────────────────────

    #[test]
    fn test_disconnect_closes_transport_and_clears_address() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_open().return_const(());
        transport.expect_close().times(1).return_const(());
        let mut session = session_with(transport);
        let id = session.configure("10.0.0.1").expect("configure");
        session.handle_transport_event(TransportEvent::Opened { connection: id });

        // Act
        let changed = session.disconnect();

        // Assert
        assert_eq!(changed, Some(ConnectionState::Disconnected));
        assert!(session.address().is_none());
    }

    #[test]
    fn test_disconnect_when_idle_is_noop() {
        let mut transport = MockTransport::new();
        transport.expect_close().times(0);
        let mut session = session_with(transport);

        assert_eq!(session.disconnect(), None);
    }

    #[tokio::test]
    async fn test_teardown_runs_once_even_when_dropped_afterwards() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_open().return_const(());
        transport.expect_close().times(1).return_const(());
        let source = MockEventSource::new();
        let stops = source.stop_counter();
        let mut session = session_with(transport);
        let _rx = session
            .attach_listeners(Box::new(source))
            .expect("attach");
        session.configure("10.0.0.1").expect("configure");

        // Act
        let first = session.teardown();
        let second = session.teardown();
        drop(session);

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(stops.get(), 1);
    }

    #[tokio::test]
    async fn test_drop_detaches_listeners() {
        let source = MockEventSource::new();
        let stops = source.stop_counter();
        let mut session = session_with(MockTransport::new());
        let mut rx = session
            .attach_listeners(Box::new(source))
            .expect("attach");
        assert!(session.listeners_attached());

        drop(session);

        assert_eq!(stops.get(), 1);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_configure_after_teardown_is_rejected() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(0);
        let mut session = session_with(transport);
        session.teardown();

        assert_eq!(session.configure("10.0.0.1"), Err(SessionError::TornDown));
    }

    #[tokio::test]
    async fn test_attach_listeners_again_replaces_previous_source() {
        let first = MockEventSource::new();
        let first_stops = first.stop_counter();
        let second = MockEventSource::new();
        let second_stops = second.stop_counter();
        let mut session = session_with(MockTransport::new());

        let _rx1 = session.attach_listeners(Box::new(first)).expect("attach first");
        let _rx2 = session.attach_listeners(Box::new(second)).expect("attach second");

        assert_eq!(first_stops.get(), 1);
        assert_eq!(second_stops.get(), 0);
        assert!(session.listeners_attached());
    }
}
