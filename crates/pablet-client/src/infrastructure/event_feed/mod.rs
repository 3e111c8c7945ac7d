//! Input feed infrastructure: where pointer events and user commands come from.
//!
//! An [`EventSource`] produces [`FeedLine`]s on a Tokio channel once started.
//! Starting a source is the equivalent of registering pointer, touch, and
//! click listeners on the input surface; stopping it removes them again.
//!
//! # Paired attach / detach
//!
//! Listener registration is owned by a [`ListenerGuard`].  The guard calls
//! [`EventSource::stop`] exactly once: either when [`ListenerGuard::detach`]
//! is called explicitly or when the guard is dropped, whichever happens first.
//! Because `Drop` also runs during unwinding, the listeners are released on
//! every exit path.
//!
//! # Testability
//!
//! [`mock::MockEventSource`] lets tests inject feed lines directly without any
//! reader task.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::FeedLine;

pub mod mock;

/// Lines that may be buffered between the reader task and the dispatcher.
pub const FEED_CHANNEL_CAPACITY: usize = 256;

/// Error type for event source operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The source has already been started once; a reader can only be consumed once.
    #[error("event source '{0}' has already been started")]
    AlreadyStarted(String),
}

/// Trait abstracting the origin of pointer events and connection commands.
///
/// The production implementation reads JSON lines; tests use
/// [`mock::MockEventSource`].
pub trait EventSource: Send {
    /// Registers the listeners and returns a receiver for everything they observe.
    fn start(&self) -> Result<mpsc::Receiver<FeedLine>, SourceError>;

    /// Removes the listeners.  The receiver returned by `start` then yields
    /// `None` once any buffered lines are drained.
    fn stop(&self);

    /// Human-readable name for log messages.
    fn label(&self) -> &str;
}

// ── ListenerGuard ─────────────────────────────────────────────────────────────

/// Owns a started [`EventSource`] and stops it exactly once.
pub struct ListenerGuard {
    source: Option<Box<dyn EventSource>>,
}

impl ListenerGuard {
    /// Starts `source` and returns the guard together with the feed receiver.
    ///
    /// # Errors
    ///
    /// Propagates the [`SourceError`] from [`EventSource::start`]; in that case
    /// nothing was attached and nothing will be stopped.
    pub fn attach(
        source: Box<dyn EventSource>,
    ) -> Result<(Self, mpsc::Receiver<FeedLine>), SourceError> {
        let rx = source.start()?;
        info!("input listeners attached: {}", source.label());
        Ok((
            Self {
                source: Some(source),
            },
            rx,
        ))
    }

    /// Stops the source if it is still attached.  Later calls do nothing.
    pub fn detach(&mut self) {
        if let Some(source) = self.source.take() {
            source.stop();
            info!("input listeners detached: {}", source.label());
        }
    }

    pub fn is_attached(&self) -> bool {
        self.source.is_some()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.detach();
    }
}

// ── JsonLinesSource ───────────────────────────────────────────────────────────

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Reads newline-delimited JSON [`FeedLine`]s from any async reader.
///
/// Lines that fail to parse are logged and skipped; a single bad line never
/// ends the feed.  End of input closes the feed channel.
pub struct JsonLinesSource {
    label: String,
    reader: Mutex<Option<BoxedReader>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl JsonLinesSource {
    /// Wraps `reader`; nothing is read until [`EventSource::start`].
    pub fn new<R>(label: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            label: label.into(),
            reader: Mutex::new(Some(Box::new(reader))),
            task: Mutex::new(None),
        }
    }

    /// A source reading the process's standard input.
    pub fn stdin() -> Self {
        Self::new("stdin", tokio::io::stdin())
    }

    /// A source reading a file, typically a named pipe fed by a live producer.
    ///
    /// The feed ends at end of file.  A regular file is read to the end almost
    /// at once, before any connection it asks for has opened, so its pointer
    /// lines are dropped as not connected; it is not a session replay.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub async fn open_file(path: &std::path::Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(path.display().to_string(), file))
    }
}

impl EventSource for JsonLinesSource {
    fn start(&self) -> Result<mpsc::Receiver<FeedLine>, SourceError> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SourceError::AlreadyStarted(self.label.clone()))?;

        let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let label = self.label.clone();
        let handle = tokio::spawn(async move {
            pump_lines(reader, tx, &label).await;
        });

        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(rx)
    }

    fn stop(&self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            // Aborting drops the sender, which closes the feed channel.
            handle.abort();
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Reads lines from `reader` until EOF, an I/O error, or the receiver goes away.
///
/// Lines are read as raw bytes and decoded one at a time, so a line that is
/// not valid UTF-8 is skipped like any other malformed line.
async fn pump_lines<R>(reader: R, tx: mpsc::Sender<FeedLine>, label: &str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut line_no = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                debug!("{label}: end of input");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("{label}: read failed: {e}");
                break;
            }
        }
        line_no += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!("{label}:{line_no}: ignoring feed line that is not UTF-8: {e}");
                continue;
            }
        };

        match FeedLine::parse(line) {
            Ok(Some(feed_line)) => {
                if tx.send(feed_line).await.is_err() {
                    debug!("{label}: feed receiver dropped; stopping reader");
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("{label}:{line_no}: ignoring malformed feed line: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
