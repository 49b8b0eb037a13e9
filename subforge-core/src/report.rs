// ============================================================================
// subforge-core/src/report.rs
// ============================================================================
//
// BATCH REPORTING: Capped Diagnostics and the End-of-Batch Summary
//
// Tool output kept in memory is capped. When the cap is hit the text is
// cut and labelled as truncated, pointing at the log file that has it all.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::batch::{BatchRun, TaskFailure, TaskState};
use crate::classify::Strategy;

/// Append-only text buffer that stops growing at `cap` characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CappedText {
    text: String,
    chars: usize,
    cap: usize,
    truncated: bool,
}

impl CappedText {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            ..Self::default()
        }
    }

    /// Appends `line` plus a newline, cutting at the cap.
    pub fn push_line(&mut self, line: &str) {
        if self.truncated {
            return;
        }
        for c in line.chars().chain(std::iter::once('\n')) {
            if self.chars >= self.cap {
                self.truncated = true;
                return;
            }
            self.text.push(c);
            self.chars += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Label appended to truncated output.
pub fn truncation_label(log_path: Option<&Path>) -> String {
    match log_path {
        Some(path) => format!(
            "... [Output truncated, full output in {}] ...",
            path.display()
        ),
        None => "... [Output truncated] ...".to_string(),
    }
}

/// Cuts `text` to `cap` characters. Returns the kept text and whether
/// anything was dropped.
pub fn truncate_output(text: &str, cap: usize) -> (String, bool) {
    match text.char_indices().nth(cap) {
        Some((byte, _)) => (text[..byte].to_string(), true),
        None => (text.to_string(), false),
    }
}

/// One task's line in the summary.
#[derive(Debug, Clone)]
pub struct SummaryEntry {
    pub track_id: u64,
    pub track_number: u64,
    pub language: String,
    pub strategy: Strategy,
    pub state: TaskState,
    pub final_path: PathBuf,
    pub failure: Option<TaskFailure>,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub container: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<SummaryEntry>,
}

impl BatchSummary {
    pub fn from_run(run: &BatchRun) -> Self {
        let entries: Vec<SummaryEntry> = run
            .tasks()
            .iter()
            .map(|task| SummaryEntry {
                track_id: task.track.id,
                track_number: task.track.number,
                language: task.track.language.clone(),
                strategy: task.strategy,
                state: task.state(),
                final_path: task.final_path.clone(),
                failure: task.failure().cloned(),
            })
            .collect();
        Self {
            container: run.container().to_path_buf(),
            total: entries.len(),
            succeeded: entries.iter().filter(|e| e.state == TaskState::Done).count(),
            failed: entries.iter().filter(|e| e.state == TaskState::Failed).count(),
            entries,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} of {} tracks succeeded",
            self.container.display(),
            self.succeeded,
            self.total
        )?;
        for entry in &self.entries {
            match (&entry.state, &entry.failure) {
                (TaskState::Failed, Some(failure)) => {
                    writeln!(
                        f,
                        "  track {} (id {}, {}): FAILED [{}] {}",
                        entry.track_number,
                        entry.track_id,
                        entry.language,
                        failure.kind,
                        failure.message
                    )?;
                    if !failure.output.trim().is_empty() {
                        for line in failure.output.trim_end().lines() {
                            writeln!(f, "    | {line}")?;
                        }
                    }
                    if failure.truncated {
                        writeln!(f, "    {}", truncation_label(failure.log_path.as_deref()))?;
                    } else if let Some(log) = &failure.log_path {
                        writeln!(f, "    log: {}", log.display())?;
                    }
                }
                (state, _) => writeln!(
                    f,
                    "  track {} (id {}, {}): {} -> {} ({})",
                    entry.track_number,
                    entry.track_id,
                    entry.language,
                    state,
                    entry.final_path.display(),
                    entry.strategy
                )?,
            }
        }
        Ok(())
    }
}
