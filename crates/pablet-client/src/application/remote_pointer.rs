//! Gesture dispatch: from feed lines to frames on the wire.
//!
//! [`RemotePointer`] owns one [`GestureClassifier`] and one
//! [`TransportSession`].  Pointer events are classified regardless of the
//! connection state, so a press that began while disconnected is still
//! tracked; the session then decides whether the resulting frames are sent
//! or dropped.
//!
//! [`run`] is the single dispatch loop.  It multiplexes the input feed,
//! transport events, and a shutdown future on one task, which is what lets
//! the classifier and the session live without locks.

use std::future::Future;

use pablet_core::{
    ConnectionId, ConnectionState, EndpointConfig, GestureClassifier, GestureEvent, PointerEvent,
    WireFrame,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::session::{SendOutcome, SessionError, Transport, TransportEvent, TransportSession};
use crate::domain::FeedLine;
use crate::infrastructure::event_feed::{EventSource, SourceError};

/// What happened to one classified gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dispatched {
    pub gesture: GestureEvent,
    pub frame: WireFrame,
    pub outcome: SendOutcome,
}

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The input feed closed (end of input, or listeners detached).
    FeedEnded,
    /// The shutdown future completed.
    Shutdown,
}

/// The remote pointer: classifier plus session.
pub struct RemotePointer<T: Transport> {
    classifier: GestureClassifier,
    session: TransportSession<T>,
}

impl<T: Transport> RemotePointer<T> {
    pub fn new(transport: T, endpoint_config: EndpointConfig) -> Self {
        Self {
            classifier: GestureClassifier::new(),
            session: TransportSession::new(transport, endpoint_config),
        }
    }

    pub fn session(&self) -> &TransportSession<T> {
        &self.session
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }

    /// Starts connecting to `host`.  See [`TransportSession::configure`].
    pub fn connect(&mut self, host: &str) -> Result<ConnectionId, SessionError> {
        self.session.configure(host)
    }

    pub fn disconnect(&mut self) -> Option<ConnectionState> {
        self.session.disconnect()
    }

    /// Classifies one pointer event and offers every resulting frame.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<Dispatched> {
        self.classifier
            .handle(event)
            .into_iter()
            .map(|gesture| {
                let frame = WireFrame::from_gesture(&gesture);
                let outcome = self.session.send(&frame);
                Dispatched {
                    gesture,
                    frame,
                    outcome,
                }
            })
            .collect()
    }

    /// Applies one feed line.  Returns the dispatched gestures for pointer
    /// lines and an empty list for commands.
    ///
    /// Command failures are logged, not returned: a bad address typed by the
    /// user must not stop the dispatch loop.
    pub fn handle_feed(&mut self, line: FeedLine) -> Vec<Dispatched> {
        match line {
            FeedLine::Pointer(event) => self.handle_pointer(&event),
            FeedLine::Connect { host } => {
                if let Err(e) = self.connect(&host) {
                    warn!("cannot connect to '{host}': {e}");
                }
                Vec::new()
            }
            FeedLine::Disconnect => {
                if self.disconnect().is_none() {
                    debug!("disconnect requested but no connection is active");
                }
                Vec::new()
            }
        }
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Option<ConnectionState> {
        self.session.handle_transport_event(event)
    }

    /// See [`TransportSession::attach_listeners`].
    pub fn attach_listeners(
        &mut self,
        source: Box<dyn EventSource>,
    ) -> Result<mpsc::Receiver<FeedLine>, SourceError> {
        self.session.attach_listeners(source)
    }

    /// See [`TransportSession::teardown`].
    pub fn teardown(&mut self) -> bool {
        self.session.teardown()
    }
}

// ── Dispatch loop ─────────────────────────────────────────────────────────────

/// Drives `pointer` until the feed ends or `shutdown` completes.
///
/// `events` is borrowed so the caller can keep watching the link after the
/// loop returns, for example while a close handshake finishes.
///
/// Transport events are polled before feed lines, so an `Opened` that has
/// already arrived is applied before the pointer events queued behind it.
pub async fn run<T, F>(
    pointer: &mut RemotePointer<T>,
    mut feed: mpsc::Receiver<FeedLine>,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    shutdown: F,
) -> StopReason
where
    T: Transport,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                info!("shutdown requested");
                return StopReason::Shutdown;
            }

            Some(event) = events.recv() => {
                pointer.handle_transport_event(event);
            }

            line = feed.recv() => match line {
                Some(line) => {
                    debug!("feed: {}", line.kind_name());
                    pointer.handle_feed(line);
                }
                None => {
                    info!("input feed ended");
                    return StopReason::FeedEnded;
                }
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::{DropReason, MockTransport};
    use crate::infrastructure::event_feed::mock::MockEventSource;
    use mockall::predicate::eq;
    use pablet_core::Point;

    fn connected_pointer(transport: MockTransport) -> RemotePointer<MockTransport> {
        let mut pointer = RemotePointer::new(transport, EndpointConfig::default());
        let id = pointer.connect("10.0.0.1").expect("configure");
        pointer.handle_transport_event(TransportEvent::Opened { connection: id });
        pointer
    }

    fn transport_expecting(frames: Vec<Vec<u8>>) -> MockTransport {
        let mut transport = MockTransport::new();
        transport.expect_open().return_const(());
        transport.expect_close().return_const(());
        let mut seq = mockall::Sequence::new();
        for bytes in frames {
            transport
                .expect_send()
                .with(eq(bytes))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }
        transport
    }

    #[test]
    fn test_press_move_sends_quantized_motion_frame() {
        // Arrange
        let transport = transport_expecting(vec![vec![0x54, 0x01, 0x42, 0xFF]]);
        let mut pointer = connected_pointer(transport);

        // Act
        let pressed = pointer.handle_pointer(&PointerEvent::mouse_down(100.0, 100.0, 0));
        let moved = pointer.handle_pointer(&PointerEvent::mouse_move(103.4, 98.1, 16));

        // Assert
        assert!(pressed.is_empty());
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].frame, WireFrame::Motion { dx: 340, dy: -190 });
        assert_eq!(moved[0].outcome, SendOutcome::Sent);
    }

    #[test]
    fn test_tap_in_place_sends_single_click_byte() {
        let transport = transport_expecting(vec![vec![0x01]]);
        let mut pointer = connected_pointer(transport);

        pointer.handle_pointer(&PointerEvent::mouse_down(50.0, 50.0, 0));
        pointer.handle_pointer(&PointerEvent::mouse_up(50.0, 50.0, 80));
        let clicked = pointer.handle_pointer(&PointerEvent::click(50.0, 50.0, 80));

        assert_eq!(clicked.len(), 1);
        assert_eq!(clicked[0].gesture, GestureEvent::Click);
    }

    #[test]
    fn test_two_finger_tap_sends_double_click_byte() {
        let transport = transport_expecting(vec![vec![0x02]]);
        let mut pointer = connected_pointer(transport);
        let fingers = vec![Point::new(10.0, 10.0), Point::new(40.0, 10.0)];

        pointer.handle_pointer(&PointerEvent::touch_start(fingers.clone(), 1_000));
        let released = pointer.handle_pointer(&PointerEvent::touch_end(fingers, 1_200));

        assert_eq!(released.len(), 1);
        assert_eq!(released[0].frame, WireFrame::DoubleClick);
    }

    #[test]
    fn test_gestures_while_disconnected_are_classified_but_dropped() {
        // Arrange
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);
        let mut pointer = RemotePointer::new(transport, EndpointConfig::default());

        // Act
        pointer.handle_pointer(&PointerEvent::mouse_down(0.0, 0.0, 0));
        let moved = pointer.handle_pointer(&PointerEvent::mouse_move(5.0, 0.0, 10));

        // Assert
        assert_eq!(moved.len(), 1);
        assert_eq!(
            moved[0].outcome,
            SendOutcome::Dropped(DropReason::NotConnected)
        );
        assert!(pointer.classifier().is_pressed());
    }

    #[test]
    fn test_handle_feed_connect_and_disconnect_commands() {
        // Arrange
        let mut transport = MockTransport::new();
        transport
            .expect_open()
            .withf(|_, endpoint| endpoint.host() == "desk.local")
            .times(1)
            .return_const(());
        transport.expect_close().times(1).return_const(());
        let mut pointer = RemotePointer::new(transport, EndpointConfig::default());

        // Act / Assert
        pointer.handle_feed(FeedLine::Connect {
            host: "desk.local".to_string(),
        });
        assert_eq!(pointer.session().state(), ConnectionState::Connecting);

        pointer.handle_feed(FeedLine::Disconnect);
        assert_eq!(pointer.session().state(), ConnectionState::Disconnected);
        assert!(pointer.session().address().is_none());
    }

    #[test]
    fn test_handle_feed_with_invalid_host_keeps_disconnected() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(0);
        let mut pointer = RemotePointer::new(transport, EndpointConfig::default());

        let dispatched = pointer.handle_feed(FeedLine::Connect {
            host: "bad host".to_string(),
        });

        assert!(dispatched.is_empty());
        assert_eq!(pointer.session().state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_applies_opened_event_before_queued_pointer_lines() {
        // Arrange
        let transport = transport_expecting(vec![vec![0x64, 0x00, 0x00, 0x00]]);
        let mut pointer = RemotePointer::new(transport, EndpointConfig::default());
        let id = pointer.connect("10.0.0.1").expect("configure");

        let (feed_tx, feed_rx) = mpsc::channel(8);
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        events_tx
            .send(TransportEvent::Opened { connection: id })
            .expect("event channel open");
        for line in [
            FeedLine::Pointer(PointerEvent::mouse_down(0.0, 0.0, 0)),
            FeedLine::Pointer(PointerEvent::mouse_move(1.0, 0.0, 8)),
            FeedLine::Disconnect,
        ] {
            feed_tx.try_send(line).expect("feed has room");
        }
        drop(feed_tx);

        // Act
        let stop = run(&mut pointer, feed_rx, &mut events_rx, std::future::pending()).await;

        // Assert
        assert_eq!(stop, StopReason::FeedEnded);
        assert_eq!(pointer.session().state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_ends_when_listeners_detach() {
        let mut pointer = RemotePointer::new(MockTransport::new(), EndpointConfig::default());
        let source = MockEventSource::new();
        let injector = source.injector();
        let feed = pointer.attach_listeners(Box::new(source)).expect("attach");
        let (_events_tx, mut events_rx) = mpsc::unbounded_channel();
        injector.inject(FeedLine::Disconnect);
        pointer.teardown();

        let stop = run(&mut pointer, feed, &mut events_rx, std::future::pending()).await;

        assert_eq!(stop, StopReason::FeedEnded);
        assert!(!injector.is_listening());
    }

    #[tokio::test]
    async fn test_run_returns_when_shutdown_completes() {
        let mut pointer = RemotePointer::new(MockTransport::new(), EndpointConfig::default());
        let (_feed_tx, feed_rx) = mpsc::channel(1);
        let (_events_tx, mut events_rx) = mpsc::unbounded_channel();

        let stop = run(&mut pointer, feed_rx, &mut events_rx, async {}).await;

        assert_eq!(stop, StopReason::Shutdown);
    }
}
