// Converter runs against `sh` scripts standing in for the real OCR and markup tools.
#![cfg(unix)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use subforge_core::conversion::{
    ConversionEvent, ConversionPlan, ConversionSettings, Converter, OutputCapture,
    conversion_log_path,
};
use subforge_core::external::mocks::MockTrackExtractor;
use subforge_core::progress::ProgressUpdate;
use subforge_core::*;
use tempfile::tempdir;

// --- Test Helper Functions ---

/// Runs a shell script. With `writes_file` the script must create
/// `out.srt` in its working directory; otherwise stdout is the result.
struct ShellConverter {
    script: String,
    writes_file: bool,
    program: PathBuf,
}

impl ShellConverter {
    fn stdout(script: &str) -> Self {
        Self {
            script: script.to_string(),
            writes_file: false,
            program: PathBuf::from("sh"),
        }
    }

    fn file(script: &str) -> Self {
        Self {
            writes_file: true,
            ..Self::stdout(script)
        }
    }
}

impl Converter for ShellConverter {
    fn name(&self) -> &str {
        "shell-converter"
    }

    fn prepare(&self, input: &Path, scratch: &Path, _language: &str) -> CoreResult<ConversionPlan> {
        let capture = if self.writes_file {
            OutputCapture::File(scratch.join("out.srt"))
        } else {
            OutputCapture::Stdout
        };
        Ok(ConversionPlan {
            program: self.program.clone(),
            args: vec![
                OsString::from("-c"),
                OsString::from(&self.script),
                OsString::from("sh"),
                input.as_os_str().to_os_string(),
            ],
            current_dir: Some(scratch.to_path_buf()),
            capture,
            warnings: Vec::new(),
        })
    }
}

fn settings(dir: &Path) -> ConversionSettings {
    ConversionSettings {
        tick_interval: Duration::from_millis(50),
        timeout: Some(Duration::from_secs(30)),
        output_cap: 10_000,
        temp_dir: Some(dir.to_path_buf()),
    }
}

fn input_file(dir: &Path) -> PathBuf {
    let input = dir.join("movie.track4_eng.sup");
    fs::write(&input, b"PG\x00\x00").unwrap();
    input
}

#[test]
fn partial_output_is_promoted_after_nonzero_exit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");
    let converter = ShellConverter::stdout(
        "printf '1\\n00:00:01,000 --> 00:00:02,000\\npartial\\n'; echo 'OCR crashed' >&2; exit 3",
    );

    let outcome = conversion::convert(
        &converter,
        &input,
        &output,
        "eng",
        &settings(dir.path()),
        &mut |_| {},
    );

    assert!(outcome.promoted);
    assert!(fs::read_to_string(&output)?.contains("partial"));
    match &outcome.result {
        Err(CoreError::ConverterExit { converter, .. }) => assert_eq!(converter, "shell-converter"),
        other => panic!("expected ConverterExit, got {other:?}"),
    }
    assert!(outcome.diagnostics.as_str().contains("OCR crashed"));
    assert_eq!(outcome.stats.map(|s| s.cues), Some(1));

    let log = fs::read_to_string(conversion_log_path(&output))?;
    assert!(log.contains("OCR crashed"));
    assert!(log.contains("shell-converter"));
    Ok(())
}

#[test]
fn stale_output_is_replaced_completely() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");
    fs::write(&output, "stale subtitles from an earlier run, much longer than the new ones")?;

    let converter = ShellConverter::file("printf 'fresh\\n' > out.srt");
    let outcome = conversion::convert(
        &converter,
        &input,
        &output,
        "eng",
        &settings(dir.path()),
        &mut |_| {},
    );

    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    assert_eq!(fs::read_to_string(&output)?, "fresh\n");
    Ok(())
}

#[test]
fn successful_exit_without_output_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");

    let converter = ShellConverter::file("echo 'nothing to do' >&2");
    let outcome = conversion::convert(
        &converter,
        &input,
        &output,
        "eng",
        &settings(dir.path()),
        &mut |_| {},
    );

    assert!(!outcome.promoted);
    assert!(matches!(outcome.result, Err(CoreError::OutputNotProduced(_))));
    assert!(!output.exists());
    Ok(())
}

#[test]
fn hung_converter_times_out() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");
    let settings = ConversionSettings {
        timeout: Some(Duration::from_millis(300)),
        ..settings(dir.path())
    };

    let converter = ShellConverter::stdout("exec sleep 5");
    let outcome = conversion::convert(&converter, &input, &output, "eng", &settings, &mut |_| {});

    assert!(matches!(
        outcome.result,
        Err(CoreError::ConverterTimeout { .. })
    ));
    assert!(outcome.elapsed < Duration::from_secs(5));
    Ok(())
}

#[test]
fn missing_converter_binary_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");
    let converter = ShellConverter {
        program: dir.path().join("no-such-converter"),
        ..ShellConverter::stdout("true")
    };

    let outcome = conversion::convert(
        &converter,
        &input,
        &output,
        "eng",
        &settings(dir.path()),
        &mut |_| {},
    );

    assert_eq!(
        outcome.result.as_ref().map_err(|e| e.kind()).err(),
        Some(FailureKind::ConverterNotFound)
    );
    assert!(!output.exists());
    Ok(())
}

#[test]
fn progress_markers_become_events() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = input_file(dir.path());
    let output = dir.path().join("movie.track4_eng.srt");
    let converter = ShellConverter::stdout(
        "echo 'Frame 1/4' >&2; echo 'frame 4/4' >&2; echo 'Status: writing srt' >&2; printf 'x\\n'",
    );

    let mut events = Vec::new();
    let outcome = conversion::convert(
        &converter,
        &input,
        &output,
        "eng",
        &settings(dir.path()),
        &mut |event| events.push(event),
    );
    assert!(outcome.result.is_ok(), "{:?}", outcome.result);

    let updates: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ConversionEvent::Progress(update) => Some(update.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        updates,
        vec![
            ProgressUpdate::Frame {
                current: 1,
                total: 4
            },
            ProgressUpdate::Frame {
                current: 4,
                total: 4
            },
            ProgressUpdate::Status("writing srt".to_string()),
        ]
    );
    // Stdout is the payload, so it never shows up as a line event.
    assert!(!events.iter().any(|e| matches!(
        e,
        ConversionEvent::Line { text, .. } if text == "x"
    )));
    Ok(())
}

#[test]
fn markup_track_is_converted_within_a_batch() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config = CoreConfigBuilder::new()
        .output_dir(dir.path().join("subs"))
        .temp_dir(dir.path().to_path_buf())
        .naming_scheme(NamingScheme::Batch)
        .keep_intermediates(false)
        .build()?;
    let container = dir.path().join("show.mkv");
    let info = ContainerInfo {
        container_type: "Matroska".to_string(),
        tracks: vec![ContainerTrack {
            id: 2,
            number: 3,
            track_type: TrackType::Subtitles,
            codec_id: "S_TEXT/ASS".to_string(),
            codec_name: "SubStationAlpha".to_string(),
            language: "jpn".to_string(),
            name: String::new(),
            forced: false,
            default: true,
        }],
    };

    let converters = ConverterSet {
        pgs: Box::new(ShellConverter::stdout("exit 1")),
        vobsub: Box::new(ShellConverter::stdout("exit 1")),
        markup: Box::new(ShellConverter::stdout(
            "printf '1\\n00:00:01,000 --> 00:00:02,000\\nkonnichiwa\\n\\n2\\n00:00:03,000 --> 00:00:04,000\\nsayonara\\n'",
        )),
    };
    let extractor = MockTrackExtractor::new();

    let mut batch = plan_batch(&container, &info, &default_selections(&info, true), &config)?;
    let summary = BatchRunner::new(&extractor, &converters, &config).run_to_completion(&mut batch);

    let task = &batch.tasks()[0];
    assert_eq!(summary.succeeded, 1, "{summary}");
    assert_eq!(task.state(), TaskState::Done);
    assert_eq!(task.final_path, dir.path().join("subs/show.track3_jpn.srt"));
    assert!(fs::read_to_string(&task.final_path)?.contains("sayonara"));
    assert_eq!(task.stats().map(|s| s.cues), Some(2));
    assert!(!task.intermediate_path.exists());
    Ok(())
}
