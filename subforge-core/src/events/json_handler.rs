//! JSON event handler for machine-readable progress output
//!
//! Writes one JSON object per line for each batch event, for consumption by
//! scripts wrapping the CLI. Raw tool output lines are not forwarded; they
//! already live in the per-conversion log files.

use super::{EventHandler, EventKind, EventRecord};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;

/// Event handler that writes events as JSON lines
pub struct JsonEventHandler {
    output: Mutex<Box<dyn Write + Send>>,
}

impl JsonEventHandler {
    /// Create a handler that writes to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Create a handler with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Mutex::new(writer),
        }
    }

    fn write_json(&self, value: serde_json::Value) {
        if let Ok(mut output) = self.output.lock() {
            if let Ok(json_str) = serde_json::to_string(&value) {
                let _ = writeln!(output, "{json_str}");
                let _ = output.flush();
            }
        }
    }

    fn to_json(record: &EventRecord) -> Option<serde_json::Value> {
        let timestamp = record.at.to_rfc3339();
        let task = record.task;
        let value = match &record.kind {
            EventKind::BatchStarted { container, total } => json!({
                "type": "batch_started",
                "container": container.display().to_string(),
                "total": total,
                "timestamp": timestamp
            }),
            EventKind::BatchProgress { completed, total } => json!({
                "type": "batch_progress",
                "completed": completed,
                "total": total,
                "timestamp": timestamp
            }),
            EventKind::BatchFinished {
                succeeded,
                failed,
                total,
            } => json!({
                "type": "batch_finished",
                "succeeded": succeeded,
                "failed": failed,
                "total": total,
                "timestamp": timestamp
            }),
            EventKind::TaskStarted {
                track_id,
                track_number,
                strategy,
                final_path,
            } => json!({
                "type": "task_started",
                "task": task,
                "track_id": track_id,
                "track_number": track_number,
                "strategy": strategy.to_string(),
                "final_path": final_path.display().to_string(),
                "timestamp": timestamp
            }),
            EventKind::StateChanged { from, to } => json!({
                "type": "state_changed",
                "task": task,
                "from": from.to_string(),
                "to": to.to_string(),
                "timestamp": timestamp
            }),
            EventKind::TaskFinished {
                state,
                failure,
                message,
            } => json!({
                "type": "task_finished",
                "task": task,
                "state": state.to_string(),
                "failure": failure.map(|f| f.to_string()),
                "message": message,
                "timestamp": timestamp
            }),
            EventKind::ConversionProgress { current, total } => json!({
                "type": "conversion_progress",
                "task": task,
                "current": current,
                "total": total,
                "timestamp": timestamp
            }),
            EventKind::ConversionStatus { message } => json!({
                "type": "conversion_status",
                "task": task,
                "message": message,
                "timestamp": timestamp
            }),
            EventKind::Tick {
                elapsed,
                remaining,
                fraction,
            } => json!({
                "type": "tick",
                "task": task,
                "elapsed_seconds": elapsed.as_secs(),
                "eta_seconds": remaining.map(|d| d.as_secs()),
                "percent": fraction.map(|f| (f * 100.0).round()),
                "timestamp": timestamp
            }),
            EventKind::Warning { message } => json!({
                "type": "warning",
                "task": task,
                "message": message,
                "timestamp": timestamp
            }),
            EventKind::ToolLine { .. } => return None,
        };
        Some(value)
    }
}

impl Default for JsonEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for JsonEventHandler {
    fn handle(&self, record: &EventRecord) {
        if let Some(value) = Self::to_json(record) {
            self.write_json(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_event_and_skips_tool_lines() {
        let buf = SharedBuf::default();
        let handler = JsonEventHandler::with_writer(Box::new(buf.clone()));

        handler.handle(&EventRecord {
            task: None,
            at: Local::now(),
            kind: EventKind::BatchProgress {
                completed: 1,
                total: 3,
            },
        });
        handler.handle(&EventRecord {
            task: Some(0),
            at: Local::now(),
            kind: EventKind::ToolLine {
                source: crate::external::StreamSource::Stderr,
                line: "noise".into(),
            },
        });

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["type"], "batch_progress");
        assert_eq!(value["completed"], 1);
    }
}
