// ============================================================================
// subforge-core/src/conversion/mod.rs
// ============================================================================
//
// CONVERSION DRIVERS: Running Converters and Promoting Their Output
//
// Every converter follows the same shape:
// 1. a per-attempt log artifact is created beside the final output
// 2. the converter writes into a private scratch directory
// 3. stdout/stderr are streamed line by line to the log, the progress
//    parser and a capped in-memory diagnostic buffer
// 4. once the process has exited, whatever it produced is copied into a
//    temporary file next to the final path and renamed over it
//
// Promotion happens even after a non-zero exit or a timeout, since a
// partial transcript may still be usable. The rename means a reader never
// observes a half-written file at the final path.
//
// Concrete converters only describe their invocation (`Converter::prepare`).

pub mod language;
pub mod markup;
pub mod ocr;

// ---- Standard library imports ----
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

// ---- External crate imports ----
use log::{debug, info, warn};
use tempfile::NamedTempFile;

// ---- Internal crate imports ----
use crate::classify::CodecFamily;
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{
    StreamHandler, StreamLine, StreamOptions, StreamSource, resolve_program, run_streaming,
};
use crate::progress::{ProgressParser, ProgressSnapshot, ProgressUpdate};
use crate::report::CappedText;
use crate::srt::SrtStats;
use crate::temp_files;

pub use markup::FfmpegMarkupConverter;
pub use ocr::{PgsOcrConverter, VobSubConverter};

// ============================================================================
// CONVERTER CONTRACT
// ============================================================================

/// Where the converter leaves its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCapture {
    /// The converter prints the SRT on stdout.
    Stdout,
    /// The converter writes this file.
    File(PathBuf),
}

/// A fully resolved converter invocation.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub capture: OutputCapture,
    /// Non-fatal notes, such as an unmapped language code.
    pub warnings: Vec<String>,
}

/// Describes how to invoke one external converter.
pub trait Converter {
    /// Display name used in errors and logs.
    fn name(&self) -> &str;

    /// Builds the invocation for `input`, with `scratch` as private working
    /// space and `language` as a canonical 3-letter code.
    fn prepare(&self, input: &Path, scratch: &Path, language: &str) -> CoreResult<ConversionPlan>;
}

/// The converters used by a batch, one per convertible family.
pub struct ConverterSet {
    pub pgs: Box<dyn Converter>,
    pub vobsub: Box<dyn Converter>,
    pub markup: Box<dyn Converter>,
}

impl ConverterSet {
    /// Builds the standard converters from configured tool paths.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            pgs: Box::new(PgsOcrConverter::from_tools(&config.tools)),
            vobsub: Box::new(VobSubConverter::from_tools(&config.tools)),
            markup: Box::new(FfmpegMarkupConverter::from_tools(&config.tools)),
        }
    }

    /// The converter responsible for a codec family, if it is convertible.
    pub fn for_family(&self, family: CodecFamily) -> Option<&dyn Converter> {
        match family {
            CodecFamily::Pgs => Some(self.pgs.as_ref()),
            CodecFamily::VobSub => Some(self.vobsub.as_ref()),
            CodecFamily::SubStationAlpha => Some(self.markup.as_ref()),
            CodecFamily::Utf8Text | CodecFamily::Unknown => None,
        }
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Runtime settings for one conversion.
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub tick_interval: Duration,
    pub timeout: Option<Duration>,
    pub output_cap: usize,
    pub temp_dir: Option<PathBuf>,
}

impl ConversionSettings {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            tick_interval: config.progress_interval,
            timeout: config.converter_timeout,
            output_cap: config.output_cap,
            temp_dir: config.temp_dir.clone(),
        }
    }
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}

/// Something that happened while a converter ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    Line { source: StreamSource, text: String },
    Progress(ProgressUpdate),
    Tick(ProgressSnapshot),
    Warning(String),
}

/// Everything known about one conversion attempt.
#[derive(Debug)]
pub struct ConversionOutcome {
    /// The per-attempt log artifact, if it could be created.
    pub log_path: Option<PathBuf>,
    /// Capped converter diagnostics.
    pub diagnostics: CappedText,
    /// True if something was copied to the final path.
    pub promoted: bool,
    /// Summary of the final file, when promotion happened.
    pub stats: Option<SrtStats>,
    pub elapsed: Duration,
    pub result: CoreResult<()>,
}

/// Log artifact path for an output: `movie.track3_eng.srt` ->
/// `movie.track3_eng.conversion.log`.
pub fn conversion_log_path(output: &Path) -> PathBuf {
    output.with_extension("conversion.log")
}

/// Shared state of the line callback, so write errors can be reported after
/// the process ends.
struct Sinks {
    log: Option<BufWriter<File>>,
    capture: Option<BufWriter<File>>,
    write_error: Option<io::Error>,
}

impl Sinks {
    fn log_line(&mut self, text: &str) {
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = writeln!(log, "{text}") {
                self.write_error.get_or_insert(e);
            }
        }
    }
}

/// Runs `converter` on `input`, producing `output`.
///
/// Never panics or returns early without an outcome; every failure is in
/// `ConversionOutcome::result`.
pub fn convert(
    converter: &dyn Converter,
    input: &Path,
    output: &Path,
    language: &str,
    settings: &ConversionSettings,
    on_event: &mut dyn FnMut(ConversionEvent),
) -> ConversionOutcome {
    let started = Instant::now();
    let mut diagnostics = CappedText::new(settings.output_cap);
    let log_path = conversion_log_path(output);

    let mut sinks = Sinks {
        log: None,
        capture: None,
        write_error: None,
    };

    let prepared = prepare_log(output, &log_path).map(|log| {
        sinks.log = Some(log);
    });
    if let Err(e) = prepared {
        return ConversionOutcome {
            log_path: None,
            diagnostics,
            promoted: false,
            stats: None,
            elapsed: started.elapsed(),
            result: Err(e),
        };
    }

    sinks.log_line(&format!(
        "[{}] converter: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        converter.name()
    ));
    sinks.log_line(&format!("input: {}", input.display()));
    sinks.log_line(&format!("output: {}", output.display()));
    sinks.log_line(&format!("language: {language}"));

    let result = run_converter(
        converter,
        input,
        output,
        language,
        settings,
        &mut sinks,
        &mut diagnostics,
        on_event,
    );

    let (promoted, result) = match result {
        Ok(run) => (run.promoted, run.result),
        Err(e) => (false, Err(e)),
    };

    match &result {
        Ok(()) => sinks.log_line("result: success"),
        Err(e) => sinks.log_line(&format!("result: {e}")),
    }
    if let Some(mut log) = sinks.log.take() {
        if let Err(e) = log.flush() {
            warn!("Could not finish conversion log {}: {}", log_path.display(), e);
        }
    }

    let stats = if promoted {
        fs::read(output)
            .ok()
            .map(|bytes| SrtStats::from_text(&String::from_utf8_lossy(&bytes)))
    } else {
        None
    };

    ConversionOutcome {
        log_path: Some(log_path),
        diagnostics,
        promoted,
        stats,
        elapsed: started.elapsed(),
        result,
    }
}

fn prepare_log(output: &Path, log_path: &Path) -> CoreResult<BufWriter<File>> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(log_path)?))
}

/// Routes converter output to the log, the capture file, the diagnostics
/// buffer and the progress parser.
struct ConversionStream<'a> {
    sinks: &'a mut Sinks,
    diagnostics: &'a mut CappedText,
    parser: ProgressParser,
    started: Instant,
    stdout_is_payload: bool,
    on_event: &'a mut dyn FnMut(ConversionEvent),
}

impl StreamHandler for ConversionStream<'_> {
    fn on_line(&mut self, line: &StreamLine) {
        if self.stdout_is_payload && line.source == StreamSource::Stdout {
            if let Some(capture) = self.sinks.capture.as_mut() {
                if let Err(e) = capture.write_all(&line.raw) {
                    self.sinks.write_error.get_or_insert(e);
                }
            }
            return;
        }

        let text = line.text().into_owned();
        self.sinks.log_line(&text);
        self.diagnostics.push_line(&text);
        if let Some(update) = self.parser.observe_line(&text, Instant::now()) {
            (self.on_event)(ConversionEvent::Progress(update));
        }
        (self.on_event)(ConversionEvent::Line {
            source: line.source,
            text,
        });
    }

    fn on_tick(&mut self, _elapsed: Duration) {
        let snapshot = self.parser.snapshot(self.started, Instant::now());
        (self.on_event)(ConversionEvent::Tick(snapshot));
    }
}

struct RunResult {
    promoted: bool,
    result: CoreResult<()>,
}

#[allow(clippy::too_many_arguments)]
fn run_converter(
    converter: &dyn Converter,
    input: &Path,
    output: &Path,
    language: &str,
    settings: &ConversionSettings,
    sinks: &mut Sinks,
    diagnostics: &mut CappedText,
    on_event: &mut dyn FnMut(ConversionEvent),
) -> CoreResult<RunResult> {
    let base = settings.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
    let scratch = temp_files::create_scratch_dir(&base, "subforge_convert")?;

    let plan = converter.prepare(input, scratch.path(), language)?;
    for warning in &plan.warnings {
        warn!("{warning}");
        sinks.log_line(&format!("warning: {warning}"));
        on_event(ConversionEvent::Warning(warning.clone()));
    }

    let program = resolve_program(&plan.program).ok_or_else(|| {
        CoreError::ConverterNotFound(format!(
            "{} ({})",
            converter.name(),
            plan.program.display()
        ))
    })?;

    let mut _capture_guard = None;
    let capture_path = match &plan.capture {
        OutputCapture::Stdout => {
            let (file, temp_path) =
                temp_files::create_temp_file(scratch.path(), "pgs_to_srt", "srt")?.into_parts();
            sinks.capture = Some(BufWriter::new(file));
            let path = temp_path.to_path_buf();
            _capture_guard = Some(temp_path);
            path
        }
        OutputCapture::File(path) => path.clone(),
    };
    let stdout_is_payload = plan.capture == OutputCapture::Stdout;

    let mut cmd = Command::new(&program);
    cmd.args(&plan.args);
    if let Some(dir) = &plan.current_dir {
        cmd.current_dir(dir);
    }
    sinks.log_line(&format!("command: {cmd:?}"));
    sinks.log_line("");
    info!("Running {} on {}", converter.name(), input.display());

    let mut stream = ConversionStream {
        sinks: &mut *sinks,
        diagnostics,
        parser: ProgressParser::new(),
        started: Instant::now(),
        stdout_is_payload,
        on_event,
    };
    let options = StreamOptions {
        tick_interval: settings.tick_interval,
        timeout: settings.timeout,
    };
    let run = run_streaming(&mut cmd, options, &mut stream);

    let outcome = match run {
        Ok(outcome) => outcome,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CoreError::ConverterNotFound(converter.name().to_string()));
        }
        Err(e) => {
            return Err(CoreError::ConverterStart {
                converter: converter.name().to_string(),
                source: e,
            });
        }
    };

    if let Some(mut capture) = sinks.capture.take() {
        if let Err(e) = capture.flush() {
            sinks.write_error.get_or_insert(e);
        }
    }
    if let Some(e) = sinks.write_error.take() {
        warn!("Write error while converting {}: {}", input.display(), e);
    }

    sinks.log_line("");
    sinks.log_line(&format!(
        "exit: {}{}",
        outcome.status,
        if outcome.timed_out { " (timed out)" } else { "" }
    ));
    sinks.log_line(&format!("elapsed: {:.1}s", outcome.elapsed.as_secs_f64()));

    let promoted = match promote(&capture_path, output) {
        Ok(promoted) => promoted,
        Err(e) => {
            warn!("Could not promote {}: {}", capture_path.display(), e);
            sinks.log_line(&format!("promotion failed: {e}"));
            false
        }
    };
    if promoted {
        debug!("Promoted {} to {}", capture_path.display(), output.display());
    } else {
        sinks.log_line("no output was produced");
    }

    let result = if outcome.timed_out {
        Err(CoreError::ConverterTimeout {
            converter: converter.name().to_string(),
            seconds: settings.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        })
    } else if !outcome.status.success() {
        Err(CoreError::ConverterExit {
            converter: converter.name().to_string(),
            status: outcome.status.to_string(),
        })
    } else if !promoted {
        Err(CoreError::OutputNotProduced(output.to_path_buf()))
    } else {
        crate::extraction::verify_artifact(output).map(|_| ())
    };

    Ok(RunResult { promoted, result })
}

/// Copies `source` into a temporary sibling of `dest` and renames it over
/// `dest`. Returns `Ok(false)` if `source` does not exist.
fn promote(source: &Path, dest: &Path) -> CoreResult<bool> {
    if !source.is_file() {
        return Ok(false);
    }
    let parent = match dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent.to_path_buf(),
        None => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut staged = NamedTempFile::new_in(&parent)?;
    let mut reader = File::open(source)?;
    io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file_mut().flush()?;
    staged
        .persist(dest)
        .map_err(|e| CoreError::Io(e.error))?;

    crate::extraction::apply_artifact_permissions(dest);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_replaces_extension() {
        assert_eq!(
            conversion_log_path(Path::new("/out/movie.track3_eng.srt")),
            PathBuf::from("/out/movie.track3_eng.conversion.log")
        );
    }

    #[test]
    fn promotion_overwrites_completely() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("new.srt");
        let dest = dir.path().join("sub").join("final.srt");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, "stale content that is much longer than the new one").unwrap();
        fs::write(&source, "fresh").unwrap();

        assert!(promote(&source, &dest).unwrap());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "fresh");
    }

    #[test]
    fn promotion_without_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!promote(&dir.path().join("missing.srt"), &dir.path().join("out.srt")).unwrap());
        assert!(!dir.path().join("out.srt").exists());
    }
}
