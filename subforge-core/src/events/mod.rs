//! Structured pipeline events.
//!
//! Every observable step of a batch is recorded as an append-only
//! [`EventRecord`] (task index, timestamp, kind). Handlers decide what to do
//! with them: forward them over a channel to a presentation thread, keep them
//! in memory, or print them as JSON lines.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::batch::TaskState;
use crate::classify::Strategy;
use crate::error::FailureKind;
use crate::external::StreamSource;

pub mod json_handler;

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    // Batch lifecycle
    BatchStarted {
        container: PathBuf,
        total: usize,
    },
    BatchProgress {
        completed: usize,
        total: usize,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // Task lifecycle
    TaskStarted {
        track_id: u64,
        track_number: u64,
        strategy: Strategy,
        final_path: PathBuf,
    },
    StateChanged {
        from: TaskState,
        to: TaskState,
    },
    TaskFinished {
        state: TaskState,
        failure: Option<FailureKind>,
        message: Option<String>,
    },

    // Conversion
    ConversionProgress {
        current: u64,
        total: u64,
    },
    ConversionStatus {
        message: String,
    },
    Tick {
        elapsed: Duration,
        remaining: Option<Duration>,
        fraction: Option<f64>,
    },
    ToolLine {
        source: StreamSource,
        line: String,
    },

    Warning {
        message: String,
    },
}

/// One timestamped event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Index of the task within its batch, `None` for batch-wide events.
    pub task: Option<usize>,
    pub at: DateTime<Local>,
    pub kind: EventKind,
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, record: &EventRecord);
}

/// Fans events out to every registered handler.
#[derive(Clone)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.add_handler(handler);
        self
    }

    /// Stamps and dispatches an event.
    pub fn emit(&self, task: Option<usize>, kind: EventKind) {
        if self.handlers.is_empty() {
            return;
        }
        let record = EventRecord {
            task,
            at: Local::now(),
            kind,
        };
        for handler in &self.handlers {
            handler.handle(&record);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Forwards records to a single consumer thread.
///
/// A disconnected receiver is not an error; the batch keeps running.
pub struct ChannelHandler {
    sender: Sender<EventRecord>,
}

impl ChannelHandler {
    pub fn new(sender: Sender<EventRecord>) -> Self {
        Self { sender }
    }
}

impl EventHandler for ChannelHandler {
    fn handle(&self, record: &EventRecord) {
        let _ = self.sender.send(record.clone());
    }
}

/// Keeps every record in memory, in emission order.
#[derive(Default)]
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Records for one task, in order.
    pub fn for_task(&self, task: usize) -> Vec<EventRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.task == Some(task))
            .collect()
    }
}

impl EventHandler for EventLog {
    fn handle(&self, record: &EventRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn dispatcher_stamps_and_fans_out() {
        let log = Arc::new(EventLog::new());
        let (tx, rx) = mpsc::channel();
        let dispatcher = EventDispatcher::new()
            .with_handler(log.clone())
            .with_handler(Arc::new(ChannelHandler::new(tx)));

        dispatcher.emit(
            Some(1),
            EventKind::Warning {
                message: "unmapped language".into(),
            },
        );
        dispatcher.emit(None, EventKind::BatchProgress { completed: 1, total: 2 });

        assert_eq!(log.records().len(), 2);
        assert_eq!(log.for_task(1).len(), 1);
        let first = rx.recv().unwrap();
        assert_eq!(first.task, Some(1));
        assert!(matches!(rx.recv().unwrap().kind, EventKind::BatchProgress { .. }));
    }

    #[test]
    fn dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let dispatcher = EventDispatcher::new().with_handler(Arc::new(ChannelHandler::new(tx)));
        dispatcher.emit(None, EventKind::BatchProgress { completed: 0, total: 0 });
    }
}
