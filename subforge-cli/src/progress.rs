// ============================================================================
// subforge-cli/src/progress.rs
// ============================================================================
//
// PROGRESS RENDERING: Terminal View of Batch Events
//
// The batch runs on a worker thread and sends its events over an mpsc
// channel. The main thread owns a `ProgressView` and is the only writer to
// the terminal:
//
//   worker: BatchRunner -> ChannelHandler --(EventRecord)--> main: ProgressView
//
// Two indicatif bars are shown: the batch counter (completed/total tracks)
// and, while a converter runs, its frame counter with elapsed time and ETA.
// Log lines are printed through `MultiProgress::suspend` so they do not
// tear the bars.

// ---- Standard library imports ----
use std::io::IsTerminal;
use std::sync::mpsc::Receiver;
use std::time::Duration;

// ---- External crate imports ----
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;

// ---- Internal crate imports ----
use subforge_core::TaskState;
use subforge_core::events::{EventKind, EventRecord};
use subforge_core::utils::{format_duration, format_eta};

use crate::terminal;

const TICK_INTERVAL: Duration = Duration::from_millis(120);

fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ⧖ Tracks: [{bar:30}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("    {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn frame_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("    ⧖ {percent:>3}% [{bar:25}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.")
}

/// Terminal renderer for batch events.
pub struct ProgressView {
    multi: MultiProgress,
    batch_bar: Option<ProgressBar>,
    task_bar: Option<ProgressBar>,
    task_label: String,
    status: Option<String>,
    verbose: bool,
}

impl ProgressView {
    /// Bars are drawn on stderr when it is a terminal and hidden otherwise.
    pub fn new(verbose: bool) -> Self {
        let target = if std::io::stderr().is_terminal() {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        Self::with_draw_target(target, verbose)
    }

    pub fn with_draw_target(target: ProgressDrawTarget, verbose: bool) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            batch_bar: None,
            task_bar: None,
            task_label: String::new(),
            status: None,
            verbose,
        }
    }

    /// Consumes records until every sender is gone.
    pub fn drain(&mut self, events: Receiver<EventRecord>) {
        for record in events {
            self.handle(&record);
        }
        self.finish();
    }

    fn say(&self, f: impl FnOnce()) {
        self.multi.suspend(f);
    }

    pub fn handle(&mut self, record: &EventRecord) {
        match &record.kind {
            EventKind::BatchStarted { container, total } => {
                let name = container
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| container.display().to_string());
                self.say(|| {
                    terminal::print_section("Extracting subtitles");
                    terminal::print_status("Container", &name);
                    terminal::print_status("Tracks", &total.to_string());
                });
                let bar = self.multi.add(ProgressBar::new(*total as u64));
                bar.set_style(batch_style());
                self.batch_bar = Some(bar);
            }
            EventKind::TaskStarted {
                track_id,
                track_number,
                strategy,
                final_path,
            } => {
                self.task_label = format!("Track {track_number} (id {track_id})");
                self.status = None;
                let message = format!("{}: {strategy} -> {}", self.task_label, final_path.display());
                self.say(|| {
                    info_blank();
                    terminal::print_processing(&message);
                });
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style());
                bar.set_message(format!("{}: extracting", self.task_label));
                bar.enable_steady_tick(TICK_INTERVAL);
                self.task_bar = Some(bar);
            }
            EventKind::StateChanged { from, to } => {
                debug!("Task {:?}: {from} -> {to}", record.task);
                if *to == TaskState::Converting {
                    if let Some(bar) = &self.task_bar {
                        bar.set_message(format!("{}: converting", self.task_label));
                    }
                }
            }
            EventKind::ConversionProgress { current, total } => {
                if let Some(bar) = &self.task_bar {
                    if bar.length() != Some(*total) {
                        bar.disable_steady_tick();
                        bar.set_style(frame_style());
                        bar.set_length(*total);
                        bar.set_message(String::new());
                    }
                    bar.set_position(*current);
                }
            }
            EventKind::ConversionStatus { message } => {
                self.status = Some(message.clone());
            }
            EventKind::Tick {
                elapsed,
                remaining,
                fraction,
            } => {
                if let Some(bar) = &self.task_bar {
                    let mut message = format!(
                        "{} elapsed, ETA {}",
                        format_duration(elapsed.as_secs_f64()),
                        format_eta(*remaining)
                    );
                    if fraction.is_none() {
                        message = format!("{}: converting, {message}", self.task_label);
                    }
                    if let Some(status) = &self.status {
                        message.push_str(&format!(" ({status})"));
                    }
                    bar.set_message(message);
                }
            }
            EventKind::ToolLine { source, line } => {
                if self.verbose {
                    let text = format!("[{source}] {line}");
                    self.say(|| terminal::print_sub_item(&text));
                }
            }
            EventKind::Warning { message } => {
                let message = message.clone();
                self.say(|| terminal::print_warning(&message));
            }
            EventKind::TaskFinished {
                state,
                failure,
                message,
            } => {
                if let Some(bar) = self.task_bar.take() {
                    bar.finish_and_clear();
                }
                let label = self.task_label.clone();
                match (state, failure) {
                    (TaskState::Done, _) => self.say(|| terminal::print_success(&format!("{label} done"))),
                    (_, Some(kind)) => {
                        let text = format!(
                            "{label} failed [{kind}] {}",
                            message.as_deref().unwrap_or_default()
                        );
                        self.say(|| terminal::print_failure(&text));
                    }
                    (state, None) => self.say(|| terminal::print_failure(&format!("{label} ended {state}"))),
                }
            }
            EventKind::BatchProgress { completed, .. } => {
                if let Some(bar) = &self.batch_bar {
                    bar.set_position(*completed as u64);
                }
            }
            EventKind::BatchFinished { .. } => self.finish(),
        }
    }

    /// Clears any bars still on screen.
    pub fn finish(&mut self) {
        if let Some(bar) = self.task_bar.take() {
            bar.finish_and_clear();
        }
        if let Some(bar) = self.batch_bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn info_blank() {
    log::info!("");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use subforge_core::Strategy;

    fn record(task: Option<usize>, kind: EventKind) -> EventRecord {
        EventRecord {
            task,
            at: Local::now(),
            kind,
        }
    }

    #[test]
    fn bars_follow_the_batch() {
        let mut view = ProgressView::with_draw_target(ProgressDrawTarget::hidden(), false);
        view.handle(&record(
            None,
            EventKind::BatchStarted {
                container: PathBuf::from("/media/movie.mkv"),
                total: 2,
            },
        ));
        view.handle(&record(
            Some(0),
            EventKind::TaskStarted {
                track_id: 3,
                track_number: 4,
                strategy: Strategy::OcrImageToText,
                final_path: PathBuf::from("/media/movie.eng.004.srt"),
            },
        ));
        view.handle(&record(
            Some(0),
            EventKind::ConversionProgress {
                current: 10,
                total: 40,
            },
        ));
        assert_eq!(view.task_bar.as_ref().and_then(|b| b.length()), Some(40));
        assert_eq!(view.task_bar.as_ref().map(|b| b.position()), Some(10));

        view.handle(&record(
            None,
            EventKind::BatchProgress {
                completed: 1,
                total: 2,
            },
        ));
        assert_eq!(view.batch_bar.as_ref().map(|b| b.position()), Some(1));

        view.handle(&record(
            None,
            EventKind::BatchFinished {
                succeeded: 1,
                failed: 0,
                total: 2,
            },
        ));
        assert!(view.batch_bar.is_none());
        assert!(view.task_bar.is_none());
    }

    #[test]
    fn drain_stops_when_senders_are_gone() {
        let (tx, rx) = mpsc::channel();
        tx.send(record(
            None,
            EventKind::BatchStarted {
                container: PathBuf::from("movie.mkv"),
                total: 1,
            },
        ))
        .unwrap();
        drop(tx);

        let mut view = ProgressView::with_draw_target(ProgressDrawTarget::hidden(), false);
        view.drain(rx);
        assert!(view.batch_bar.is_none());
    }
}
