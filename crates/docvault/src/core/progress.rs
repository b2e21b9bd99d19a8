//! Progress reporting for ingestion runs.
//!
//! Each run owns one [`ProgressReporter`]. It delivers [`ProgressEvent`]s to a
//! callback or a channel and guarantees the reported percentage never goes
//! backwards, whatever order the stages report in.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Pipeline stage named in a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStage {
    Classification,
    PlainText,
    StructuredParse,
    Rasterization,
    Recognition,
    Persistence,
    Complete,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Classification => "Classifying document",
            Self::PlainText => "Reading text",
            Self::StructuredParse => "Extracting embedded text",
            Self::Rasterization => "Rendering pages",
            Self::Recognition => "Recognizing text",
            Self::Persistence => "Saving document",
            Self::Complete => "Complete",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    /// 0..=100, non-decreasing within one run.
    pub percent: u8,
    pub error: Option<String>,
}

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Silent,
    Callback(Callback),
    Channel(mpsc::UnboundedSender<ProgressEvent>),
}

/// Delivers progress events for one ingestion run.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Sink,
    last_percent: Arc<Mutex<u8>>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last_percent", &*self.last_percent.lock())
            .finish()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl ProgressReporter {
    /// A reporter that drops every event.
    pub fn silent() -> Self {
        Self::with_sink(Sink::Silent)
    }

    /// Invoke `callback` synchronously for every event.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self::with_sink(Sink::Callback(Arc::new(callback)))
    }

    /// Send every event to an unbounded channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sink(Sink::Channel(tx)), rx)
    }

    fn with_sink(sink: Sink) -> Self {
        Self {
            sink,
            last_percent: Arc::new(Mutex::new(0)),
        }
    }

    /// Report `percent` for `stage`. Values below the last reported percent are raised to it.
    pub fn report(&self, stage: ProgressStage, percent: u8) {
        let percent = self.advance(percent);
        self.emit(ProgressEvent {
            stage,
            percent,
            error: None,
        });
    }

    /// Report an error for `stage` without moving the percentage.
    pub fn report_error(&self, stage: ProgressStage, error: impl Into<String>) {
        let percent = *self.last_percent.lock();
        self.emit(ProgressEvent {
            stage,
            percent,
            error: Some(error.into()),
        });
    }

    pub fn last_percent(&self) -> u8 {
        *self.last_percent.lock()
    }

    /// A sub-range `[start, end]` of the overall percentage for one stage.
    pub fn scope(&self, stage: ProgressStage, start: u8, end: u8) -> ProgressScope {
        let start = start.min(100);
        ProgressScope {
            reporter: self.clone(),
            stage,
            start,
            end: end.clamp(start, 100),
        }
    }

    fn advance(&self, percent: u8) -> u8 {
        let mut last = self.last_percent.lock();
        let next = percent.min(100).max(*last);
        *last = next;
        next
    }

    fn emit(&self, event: ProgressEvent) {
        match &self.sink {
            Sink::Silent => {}
            Sink::Callback(callback) => callback(&event),
            Sink::Channel(tx) => {
                if tx.send(event).is_err() {
                    tracing::debug!("Progress receiver dropped; event discarded");
                }
            }
        }
    }
}

/// Maps a stage's own `done / total` onto its slice of the overall percentage.
#[derive(Debug, Clone)]
pub struct ProgressScope {
    reporter: ProgressReporter,
    stage: ProgressStage,
    start: u8,
    end: u8,
}

impl ProgressScope {
    pub fn stage(&self) -> ProgressStage {
        self.stage
    }

    pub fn begin(&self) {
        self.reporter.report(self.stage, self.start);
    }

    pub fn finish(&self) {
        self.reporter.report(self.stage, self.end);
    }

    /// Report that `done` of `total` units are finished.
    pub fn units(&self, done: usize, total: usize) {
        let span = u32::from(self.end - self.start);
        let offset = if total == 0 {
            span
        } else {
            (span * done.min(total) as u32) / total as u32
        };
        self.reporter.report(self.stage, self.start + offset as u8);
    }
}
