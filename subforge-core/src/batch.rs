// ============================================================================
// subforge-core/src/batch.rs
// ============================================================================
//
// BATCH ORCHESTRATOR: Planning and Running Extraction Tasks
//
// A batch is planned once: every selected subtitle track is classified and
// given its final (and intermediate) path before anything runs. The runner
// then walks the tasks strictly in selection order, one at a time:
//
//   Pending -> Extracting -> (Converting) -> Done | Failed
//
// Task-level errors are caught here and recorded on the task; they never
// stop the batch. The aggregate `completed` counter moves after every
// terminal transition. Cancellation is checked before each task.

// ---- Standard library imports ----
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// ---- External crate imports ----
use log::{debug, error, info, warn};

// ---- Internal crate imports ----
use crate::classify::{Classification, CodecFamily, Strategy, classify};
use crate::config::CoreConfig;
use crate::conversion::language::resolve_ocr_language;
use crate::conversion::{ConversionEvent, ConversionSettings, ConverterSet, convert};
use crate::error::{CoreError, CoreResult, FailureKind};
use crate::events::{EventDispatcher, EventKind};
use crate::external::TrackExtractor;
use crate::extraction;
use crate::media::{ContainerInfo, ContainerTrack};
use crate::naming::OutputNamer;
use crate::progress::ProgressUpdate;
use crate::report::{BatchSummary, truncate_output};
use crate::srt::SrtStats;

// ============================================================================
// TASK STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Extracting,
    Converting,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed)
    }

    /// Transitions only move forward; nothing follows a terminal state.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        use TaskState::*;
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Pending, Failed)
                | (Extracting, Converting)
                | (Extracting, Done)
                | (Extracting, Failed)
                | (Converting, Done)
                | (Converting, Failed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskState::Pending => "pending",
            TaskState::Extracting => "extracting",
            TaskState::Converting => "converting",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        })
    }
}

/// Why a task failed, with enough context to act on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Raw tool output, capped.
    pub output: String,
    /// True if `output` was cut at the cap.
    pub truncated: bool,
    /// Full log for conversions.
    pub log_path: Option<PathBuf>,
}

impl TaskFailure {
    fn from_error(err: &CoreError, cap: usize) -> Self {
        let (output, truncated) = match err.tool_output() {
            Some(output) => truncate_output(output, cap),
            None => (String::new(), false),
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            output,
            truncated,
            log_path: None,
        }
    }
}

// ============================================================================
// PLANNING
// ============================================================================

/// A user's choice for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSelection {
    pub track_id: u64,
    /// Opt in to OCR / markup conversion where the codec allows it.
    pub convert: bool,
    /// OCR language to use instead of the track's own tag.
    pub language_override: Option<String>,
}

impl TrackSelection {
    pub fn new(track_id: u64) -> Self {
        Self {
            track_id,
            convert: false,
            language_override: None,
        }
    }

    pub fn with_conversion(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language_override = language;
        self
    }
}

/// Selects every subtitle track in container order.
pub fn default_selections(info: &ContainerInfo, convert: bool) -> Vec<TrackSelection> {
    info.subtitle_tracks()
        .map(|track| TrackSelection::new(track.id).with_conversion(convert))
        .collect()
}

/// The work item for one selected subtitle track.
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    pub track: ContainerTrack,
    pub classification: Classification,
    pub strategy: Strategy,
    /// Where the extraction tool writes. Equals `final_path` for pass-through.
    pub intermediate_path: PathBuf,
    /// Computed at planning time and never changed.
    pub final_path: PathBuf,
    /// Canonical OCR language handed to converters.
    pub ocr_language: String,
    state: TaskState,
    failure: Option<TaskFailure>,
    stats: Option<SrtStats>,
}

impl ExtractionTask {
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Set only when the task is `Failed`.
    pub fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    /// Line/cue counts of a converted output.
    pub fn stats(&self) -> Option<SrtStats> {
        self.stats
    }

    /// Moves to `next`, returning the previous state.
    pub fn transition(&mut self, next: TaskState) -> CoreResult<TaskState> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        let previous = self.state;
        self.state = next;
        Ok(previous)
    }

    fn fail(&mut self, failure: TaskFailure) -> CoreResult<TaskState> {
        let previous = self.transition(TaskState::Failed)?;
        self.failure = Some(failure);
        Ok(previous)
    }
}

/// The ordered tasks of one extraction run plus the aggregate counter.
#[derive(Debug, Clone)]
pub struct BatchRun {
    container: PathBuf,
    tasks: Vec<ExtractionTask>,
    completed: usize,
}

impl BatchRun {
    pub fn container(&self) -> &Path {
        &self.container
    }

    pub fn tasks(&self) -> &[ExtractionTask] {
        &self.tasks
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Classifies and names every selected track.
///
/// Selections naming unknown or non-subtitle tracks are skipped with a
/// warning. Fails with `NoSubtitleTracks` if the container has none at all.
pub fn plan_batch(
    container: &Path,
    info: &ContainerInfo,
    selections: &[TrackSelection],
    config: &CoreConfig,
) -> CoreResult<BatchRun> {
    if info.subtitle_tracks().next().is_none() {
        return Err(CoreError::NoSubtitleTracks(container.to_path_buf()));
    }

    let mut namer = OutputNamer::new(config.naming_scheme, container);
    let mut tasks = Vec::with_capacity(selections.len());

    for selection in selections {
        let track = match info.track_by_id(selection.track_id) {
            Some(track) if track.is_subtitle() => track,
            Some(track) => {
                warn!(
                    "Track {} is a {} track, not subtitles; skipping",
                    track.id, track.track_type
                );
                continue;
            }
            None => {
                warn!("No track with id {} in {}", selection.track_id, container.display());
                continue;
            }
        };
        if tasks
            .iter()
            .any(|t: &ExtractionTask| t.track.id == track.id)
        {
            warn!("Track {} selected twice; keeping the first selection", track.id);
            continue;
        }

        let classification = classify(track, selection.convert);
        if selection.convert && !classification.is_convertible() {
            debug!(
                "Track {} ({}) has no conversion path; extracting as-is",
                track.id, track.codec_id
            );
        }
        let names = namer.reserve(track, &classification);
        let ocr_language = resolve_ocr_language(
            &track.language,
            selection.language_override.as_deref(),
            &config.default_ocr_language,
        );

        tasks.push(ExtractionTask {
            track: track.clone(),
            strategy: classification.strategy,
            intermediate_path: config.output_dir.join(&names.intermediate_name),
            final_path: config.output_dir.join(&names.final_name),
            classification,
            ocr_language,
            state: TaskState::Pending,
            failure: None,
            stats: None,
        });
    }

    Ok(BatchRun {
        container: container.to_path_buf(),
        tasks,
        completed: 0,
    })
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared flag checked before each task starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Terminal result of one task, yielded by [`BatchIter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub index: usize,
    pub track_id: u64,
    pub final_path: PathBuf,
    pub state: TaskState,
    pub failure: Option<TaskFailure>,
}

/// Drives tasks through extraction and conversion.
pub struct BatchRunner<'a> {
    extractor: &'a dyn TrackExtractor,
    converters: &'a ConverterSet,
    config: &'a CoreConfig,
    events: EventDispatcher,
    cancel: CancelToken,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        extractor: &'a dyn TrackExtractor,
        converters: &'a ConverterSet,
        config: &'a CoreConfig,
    ) -> Self {
        Self {
            extractor,
            converters,
            config,
            events: EventDispatcher::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns an iterator that runs one task per `next()` call.
    pub fn run<'r>(&'r self, batch: &'r mut BatchRun) -> BatchIter<'r, 'a> {
        BatchIter {
            runner: self,
            batch,
            next: 0,
            started: false,
            finished: false,
        }
    }

    /// Runs every remaining task and summarizes the batch.
    pub fn run_to_completion(&self, batch: &mut BatchRun) -> BatchSummary {
        for outcome in self.run(batch) {
            debug!("Task {} finished: {}", outcome.index, outcome.state);
        }
        BatchSummary::from_run(batch)
    }

    fn emit(&self, task: Option<usize>, kind: EventKind) {
        self.events.emit(task, kind);
    }

    fn advance(&self, index: usize, task: &mut ExtractionTask, next: TaskState) -> CoreResult<()> {
        let from = task.transition(next)?;
        self.emit(Some(index), EventKind::StateChanged { from, to: next });
        Ok(())
    }

    fn process_task(&self, index: usize, task: &mut ExtractionTask, container: &Path) {
        info!(
            "Track {} (id {}, {}): {} -> {}",
            task.track.number,
            task.track.id,
            task.track.language,
            task.strategy,
            task.final_path.display()
        );
        self.emit(
            Some(index),
            EventKind::TaskStarted {
                track_id: task.track.id,
                track_number: task.track.number,
                strategy: task.strategy,
                final_path: task.final_path.clone(),
            },
        );

        let result = self.drive_task(index, task, container);

        let (state, failure) = match result {
            Ok(()) => match self.advance(index, task, TaskState::Done) {
                Ok(()) => (TaskState::Done, None),
                Err(e) => {
                    error!("Task {index}: {e}");
                    (task.state(), Some(TaskFailure::from_error(&e, self.config.output_cap)))
                }
            },
            Err(failure) => {
                warn!(
                    "Track {} (id {}) failed: [{}] {}",
                    task.track.number, task.track.id, failure.kind, failure.message
                );
                match task.fail(failure.clone()) {
                    Ok(from) => self.emit(
                        Some(index),
                        EventKind::StateChanged {
                            from,
                            to: TaskState::Failed,
                        },
                    ),
                    Err(e) => error!("Task {index}: {e}"),
                }
                (task.state(), Some(failure))
            }
        };

        self.emit(
            Some(index),
            EventKind::TaskFinished {
                state,
                failure: failure.as_ref().map(|f| f.kind),
                message: failure.map(|f| f.message),
            },
        );
    }

    fn drive_task(
        &self,
        index: usize,
        task: &mut ExtractionTask,
        container: &Path,
    ) -> Result<(), TaskFailure> {
        let cap = self.config.output_cap;
        let to_failure = |e: CoreError| TaskFailure::from_error(&e, cap);

        self.advance(index, task, TaskState::Extracting)
            .map_err(to_failure)?;

        let pass_through = task.strategy == Strategy::PassThrough;
        let extracted = extraction::extract(
            self.extractor,
            container,
            task.track.id,
            &task.intermediate_path,
            pass_through && self.config.set_permissions,
        )
        .map_err(to_failure)?;
        if extracted.warnings {
            self.emit(
                Some(index),
                EventKind::Warning {
                    message: format!(
                        "Extraction of track {} finished with warnings: {}",
                        task.track.id,
                        extracted.combined().trim()
                    ),
                },
            );
        }

        if pass_through {
            return Ok(());
        }

        let converter = self
            .converters
            .for_family(task.classification.family)
            .ok_or_else(|| {
                to_failure(CoreError::OperationFailed(format!(
                    "no converter for track {}",
                    task.track.id
                )))
            })?;

        self.advance(index, task, TaskState::Converting)
            .map_err(to_failure)?;

        let settings = ConversionSettings::from_config(self.config);
        let mut forward = |event: ConversionEvent| {
            let kind = match event {
                ConversionEvent::Line { source, text } => EventKind::ToolLine { source, line: text },
                ConversionEvent::Progress(ProgressUpdate::Frame { current, total }) => {
                    EventKind::ConversionProgress { current, total }
                }
                ConversionEvent::Progress(ProgressUpdate::Status(message)) => {
                    EventKind::ConversionStatus { message }
                }
                ConversionEvent::Tick(snapshot) => EventKind::Tick {
                    elapsed: snapshot.elapsed,
                    remaining: snapshot.remaining,
                    fraction: snapshot.fraction,
                },
                ConversionEvent::Warning(message) => EventKind::Warning { message },
            };
            self.emit(Some(index), kind);
        };

        let outcome = convert(
            converter,
            &task.intermediate_path,
            &task.final_path,
            &task.ocr_language,
            &settings,
            &mut forward,
        );
        task.stats = outcome.stats;

        if let Err(e) = outcome.result {
            return Err(TaskFailure {
                kind: e.kind(),
                message: e.to_string(),
                output: outcome.diagnostics.as_str().to_string(),
                truncated: outcome.diagnostics.is_truncated(),
                log_path: outcome.log_path,
            });
        }

        if let Some(stats) = outcome.stats {
            info!(
                "Converted track {}: {} cues, {} lines",
                task.track.id, stats.cues, stats.lines
            );
        }
        if !self.config.keep_intermediates {
            self.remove_intermediates(task);
        }
        Ok(())
    }

    fn remove_intermediates(&self, task: &ExtractionTask) {
        if task.intermediate_path == task.final_path {
            return;
        }
        let mut paths = vec![task.intermediate_path.clone()];
        if task.classification.family == CodecFamily::VobSub {
            paths.push(task.intermediate_path.with_extension("sub"));
        }
        for path in paths {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Could not remove {}: {}", path.display(), e);
            }
        }
    }
}

/// Iterator over task outcomes, in task order.
pub struct BatchIter<'r, 'a> {
    runner: &'r BatchRunner<'a>,
    batch: &'r mut BatchRun,
    next: usize,
    started: bool,
    finished: bool,
}

impl BatchIter<'_, '_> {
    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let tasks = &self.batch.tasks;
        let succeeded = tasks.iter().filter(|t| t.state == TaskState::Done).count();
        let failed = tasks.iter().filter(|t| t.state == TaskState::Failed).count();
        self.runner.emit(
            None,
            EventKind::BatchFinished {
                succeeded,
                failed,
                total: tasks.len(),
            },
        );
    }
}

impl Iterator for BatchIter<'_, '_> {
    type Item = TaskOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            self.runner.emit(
                None,
                EventKind::BatchStarted {
                    container: self.batch.container.clone(),
                    total: self.batch.total(),
                },
            );
        }
        if self.next >= self.batch.tasks.len() {
            self.finish();
            return None;
        }
        if self.runner.cancel.is_cancelled() {
            let message = format!(
                "Batch cancelled; {} task(s) not started",
                self.batch.tasks.len() - self.next
            );
            warn!("{message}");
            self.runner.emit(None, EventKind::Warning { message });
            self.finish();
            return None;
        }

        let index = self.next;
        self.next += 1;

        let container = self.batch.container.clone();
        let task = &mut self.batch.tasks[index];
        self.runner.process_task(index, task, &container);

        self.batch.completed += 1;
        self.runner.emit(
            None,
            EventKind::BatchProgress {
                completed: self.batch.completed,
                total: self.batch.total(),
            },
        );

        let task = &self.batch.tasks[index];
        Some(TaskOutcome {
            index,
            track_id: task.track.id,
            final_path: task.final_path.clone(),
            state: task.state,
            failure: task.failure.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackType;

    fn subtitle(id: u64, number: u64, codec: &str) -> ContainerTrack {
        ContainerTrack {
            id,
            number,
            track_type: TrackType::Subtitles,
            codec_id: codec.into(),
            codec_name: String::new(),
            language: "eng".into(),
            name: String::new(),
            forced: false,
            default: false,
        }
    }

    fn info(tracks: Vec<ContainerTrack>) -> ContainerInfo {
        ContainerInfo {
            container_type: "Matroska".into(),
            tracks,
        }
    }

    #[test]
    fn transitions_are_monotonic() {
        use TaskState::*;
        assert!(Pending.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(Done));
        assert!(Converting.can_transition_to(Failed));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Done));
        assert!(!Converting.can_transition_to(Extracting));
        assert!(!Pending.can_transition_to(Done));
    }

    #[test]
    fn plan_computes_paths_up_front() {
        let config = CoreConfig::new(PathBuf::from("/out"));
        let info = info(vec![subtitle(1, 2, "S_TEXT/UTF8"), subtitle(2, 3, "S_HDMV/PGS")]);
        let selections = default_selections(&info, true);
        let run = plan_batch(Path::new("/media/movie.mkv"), &info, &selections, &config).unwrap();

        assert_eq!(run.total(), 2);
        let pgs = &run.tasks()[1];
        assert_eq!(pgs.strategy, Strategy::OcrImageToText);
        assert_eq!(pgs.final_path, PathBuf::from("/out/movie.eng.003.srt"));
        assert_eq!(pgs.intermediate_path, PathBuf::from("/out/movie.eng.003.sup"));
        assert_eq!(pgs.ocr_language, "eng");
        assert!(run.tasks().iter().all(|t| t.state() == TaskState::Pending));
    }

    #[test]
    fn plan_skips_non_subtitle_and_unknown_selections() {
        let mut video = subtitle(0, 1, "V_MPEG4/ISO/AVC");
        video.track_type = TrackType::Video;
        let info = info(vec![video, subtitle(1, 2, "S_TEXT/UTF8")]);
        let selections = vec![TrackSelection::new(0), TrackSelection::new(9), TrackSelection::new(1)];
        let run = plan_batch(Path::new("movie.mkv"), &info, &selections, &CoreConfig::default())
            .unwrap();
        assert_eq!(run.total(), 1);
        assert_eq!(run.tasks()[0].track.id, 1);
    }

    #[test]
    fn plan_without_subtitles_fails() {
        let mut video = subtitle(0, 1, "V_MPEG4/ISO/AVC");
        video.track_type = TrackType::Video;
        let err = plan_batch(Path::new("movie.mkv"), &info(vec![video]), &[], &CoreConfig::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSubtitleTracks(_)));
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
