//! Mock event source for unit testing.
//!
//! Lets tests inject [`FeedLine`]s directly, without a reader task or any
//! real input, and observe how often the listeners were removed.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc;

use super::{EventSource, SourceError, FEED_CHANNEL_CAPACITY};
use crate::domain::FeedLine;

/// Shared view of how many times [`EventSource::stop`] was called on a mock.
#[derive(Debug, Clone, Default)]
pub struct StopCounter(Arc<AtomicUsize>);

impl StopCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A mock implementation of [`EventSource`] that allows tests to inject lines.
pub struct MockEventSource {
    sender: Arc<Mutex<Option<mpsc::Sender<FeedLine>>>>,
    stops: StopCounter,
}

impl MockEventSource {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(Mutex::new(None)),
            stops: StopCounter::default(),
        }
    }

    /// Returns a handle that keeps counting after the mock is boxed and moved.
    pub fn stop_counter(&self) -> StopCounter {
        self.stops.clone()
    }

    /// Returns a handle for injecting lines after the mock is boxed and moved.
    pub fn injector(&self) -> MockInjector {
        MockInjector {
            sender: Arc::clone(&self.sender),
        }
    }

    /// Injects a line, as if observed by the listeners.
    ///
    /// Panics if `start()` has not been called or if `stop()` has been called.
    pub fn inject(&self, line: FeedLine) {
        self.injector().inject(line);
    }
}

impl Default for MockEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for MockEventSource {
    fn start(&self) -> Result<mpsc::Receiver<FeedLine>, SourceError> {
        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        *self.sender.lock().expect("lock poisoned") = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Drop the sender to close the channel
        *self.sender.lock().expect("lock poisoned") = None;
        self.stops.0.fetch_add(1, Ordering::SeqCst);
    }

    fn label(&self) -> &str {
        "mock"
    }
}

/// Cloneable injection handle for a [`MockEventSource`].
#[derive(Clone)]
pub struct MockInjector {
    sender: Arc<Mutex<Option<mpsc::Sender<FeedLine>>>>,
}

impl MockInjector {
    /// Panics if the source is not started or has been stopped.
    pub fn inject(&self, line: FeedLine) {
        let guard = self.sender.lock().expect("lock poisoned");
        match guard.as_ref() {
            Some(sender) => sender
                .try_send(line)
                .expect("feed channel full or receiver dropped"),
            None => panic!("MockEventSource::inject called while not started"),
        }
    }

    /// `true` while the source is started and not yet stopped.
    pub fn is_listening(&self) -> bool {
        self.sender.lock().expect("lock poisoned").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pablet_core::PointerEvent;

    #[tokio::test]
    async fn test_mock_event_source_starts_and_receives_lines() {
        // Arrange
        let source = MockEventSource::new();
        let mut rx = source.start().expect("start should succeed");

        // Act
        source.inject(FeedLine::Pointer(PointerEvent::mouse_down(1.0, 2.0, 0)));
        source.inject(FeedLine::Disconnect);

        // Assert
        assert!(matches!(rx.recv().await, Some(FeedLine::Pointer(_))));
        assert_eq!(rx.recv().await, Some(FeedLine::Disconnect));
    }

    #[tokio::test]
    async fn test_mock_event_source_stop_closes_channel() {
        let source = MockEventSource::new();
        let mut rx = source.start().expect("start should succeed");
        let injector = source.injector();

        source.stop();

        assert!(rx.recv().await.is_none(), "channel should be closed after stop()");
        assert!(!injector.is_listening());
        assert_eq!(source.stop_counter().get(), 1);
    }

    #[test]
    #[should_panic(expected = "while not started")]
    fn test_mock_event_source_inject_before_start_panics() {
        MockEventSource::new().inject(FeedLine::Disconnect);
    }
}
