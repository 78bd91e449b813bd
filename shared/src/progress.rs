//! Progress reporting contract

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives `(message, percent)` updates from worker tasks.
///
/// Implementations run on whichever task reports, so they must never touch
/// a UI directly. Any `Fn(&str, u8)` closure is a sink.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, u8) + Send + Sync,
{
    fn report(&self, message: &str, percent: u8) {
        self(message, percent)
    }
}

/// One progress update as delivered through a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub message: String,
    pub percent: u8,
}

/// Forwards progress updates into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, message: &str, percent: u8) {
        // Receiver gone means nobody is listening any more
        let _ = self.sender.send(ProgressEvent {
            message: message.to_string(),
            percent,
        });
    }
}

/// Monotonic view over an optional sink for the duration of one call.
///
/// Percentages are clamped to the highest value reported so far, so a
/// late adapter update never moves the bar backwards.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    high_water: Arc<AtomicU8>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_sink", &self.sink.is_some())
            .field("high_water", &self.high_water.load(Ordering::SeqCst))
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink: Some(sink),
            high_water: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Reporter that discards every update
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn from_option(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            high_water: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Same sink, high-water mark reset for a new call
    pub fn fresh(&self) -> Self {
        Self::from_option(self.sink.clone())
    }

    pub fn report(&self, message: &str, percent: u8) {
        let percent = percent.min(100);
        let previous = self.high_water.fetch_max(percent, Ordering::SeqCst);
        if let Some(sink) = &self.sink {
            sink.report(message, previous.max(percent));
        }
    }

    /// Highest percentage reported so far
    pub fn current(&self) -> u8 {
        self.high_water.load(Ordering::SeqCst)
    }
}
