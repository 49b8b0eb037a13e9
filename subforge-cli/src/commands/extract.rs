//! Implementation of the 'extract' subcommand.
//!
//! Inspects the container on the main thread, plans the batch, then hands it
//! to a worker thread. The main thread renders the events the worker sends
//! until the batch is over, then prints the summary.

use crate::cli::{ExtractArgs, ToolArgs};
use crate::error::{CliErrorContext, CliResult};
use crate::progress::ProgressView;
use crate::terminal;

use subforge_core::events::json_handler::JsonEventHandler;
use subforge_core::events::{ChannelHandler, EventDispatcher};
use subforge_core::{
    BatchRunner, BatchSummary, CoreConfig, CoreConfigBuilder, CoreError, ConverterSet,
    MkvextractExecutor, MkvmergeExecutor, TrackSelection, default_selections, inspect, plan_batch,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

/// Output directory: the flag, or the directory holding the container.
fn resolve_output_dir(args: &ExtractArgs) -> PathBuf {
    args.output_dir.clone().unwrap_or_else(|| {
        args.input_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Creates and configures CoreConfig from CLI arguments.
pub fn create_core_config(args: &ExtractArgs, tools: &ToolArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new()
        .output_dir(resolve_output_dir(args))
        .naming_scheme(args.naming)
        .tools(tools.to_tool_paths())
        .keep_intermediates(!args.remove_intermediates);
    if let Some(dir) = &args.temp_dir {
        builder = builder.temp_dir(dir.clone());
    }
    if let Some(secs) = args.timeout {
        builder = builder.converter_timeout(Duration::from_secs(secs));
    }
    builder.build()
}

/// Track selections from `--tracks`, `--convert` and `--ocr-lang`.
fn build_selections(args: &ExtractArgs, info: &subforge_core::ContainerInfo) -> Vec<TrackSelection> {
    let selections = match &args.tracks {
        Some(ids) => ids
            .iter()
            .map(|&id| TrackSelection::new(id).with_conversion(args.convert))
            .collect(),
        None => default_selections(info, args.convert),
    };
    selections
        .into_iter()
        .map(|s| s.with_language(args.ocr_lang.clone()))
        .collect()
}

/// Runs the extraction batch and returns its summary.
///
/// Container-level problems (missing file, metadata tool failure, wrong
/// container type, no subtitle tracks) are returned as errors. Track failures
/// are part of the summary.
pub fn run_extract(args: &ExtractArgs, tools: &ToolArgs, verbose: bool) -> CliResult<BatchSummary> {
    let started = Instant::now();
    let config = create_core_config(args, tools)?;

    let probe = MkvmergeExecutor::from_tools(&config.tools);
    let info = inspect(&probe, &args.input_path)?;
    debug!(
        "Container {} has {} tracks",
        args.input_path.display(),
        info.tracks.len()
    );

    let selections = build_selections(args, &info);
    let batch = plan_batch(&args.input_path, &info, &selections, &config)?;
    if batch.is_empty() {
        return Err(CoreError::OperationFailed(
            "None of the selected tracks are subtitle tracks".to_string(),
        ));
    }

    fs::create_dir_all(&config.output_dir).cli_with_context(|| {
        format!("Failed to create output directory {}", config.output_dir.display())
    })?;

    let (tx, rx) = mpsc::channel();
    let events = if args.json {
        drop(tx);
        EventDispatcher::new().with_handler(Arc::new(JsonEventHandler::new()))
    } else {
        EventDispatcher::new().with_handler(Arc::new(ChannelHandler::new(tx)))
    };

    let worker_config = config.clone();
    let worker = thread::spawn(move || {
        let mut batch = batch;
        let extractor = MkvextractExecutor::from_tools(&worker_config.tools);
        let converters = ConverterSet::from_config(&worker_config);
        BatchRunner::new(&extractor, &converters, &worker_config)
            .with_events(events)
            .run_to_completion(&mut batch)
    });

    // Returns once the worker has dropped its dispatcher (and the sender).
    ProgressView::new(verbose).drain(rx);

    let summary = worker
        .join()
        .map_err(|_| CoreError::OperationFailed("Extraction worker panicked".to_string()))?;

    report_summary(&summary, started, args.json);
    Ok(summary)
}

fn report_summary(summary: &BatchSummary, started: Instant, json: bool) {
    terminal::print_section("Summary");
    terminal::print_status(
        "Succeeded",
        &format!("{} of {}", summary.succeeded, summary.total),
    );
    if summary.failed > 0 {
        terminal::print_status("Failed", &summary.failed.to_string());
    }
    terminal::print_status(
        "Total time",
        &subforge_core::format_duration(started.elapsed().as_secs_f64()),
    );
    info!("");
    // stdout carries the JSON event stream in --json mode.
    if json {
        eprintln!("{summary}");
    } else {
        println!("{summary}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use subforge_core::naming::NamingScheme;
    use subforge_core::{ContainerInfo, ContainerTrack, TrackType};

    fn parse(args: &[&str]) -> (ExtractArgs, ToolArgs) {
        let cli = Cli::parse_from(args);
        match cli.command {
            Commands::Extract(extract) => (extract, cli.tools),
            other => panic!("Expected Extract command, got {other:?}"),
        }
    }

    fn info() -> ContainerInfo {
        let track = |id: u64, track_type: TrackType| ContainerTrack {
            id,
            number: id + 1,
            track_type,
            codec_id: "S_TEXT/UTF8".into(),
            codec_name: String::new(),
            language: "eng".into(),
            name: String::new(),
            forced: false,
            default: false,
        };
        ContainerInfo {
            container_type: "Matroska".into(),
            tracks: vec![
                track(0, TrackType::Video),
                track(1, TrackType::Subtitles),
                track(2, TrackType::Subtitles),
            ],
        }
    }

    #[test]
    fn output_dir_defaults_to_container_directory() {
        let (args, tools) = parse(&["subforge", "extract", "-i", "/media/movies/film.mkv"]);
        let config = create_core_config(&args, &tools).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/media/movies"));
        assert_eq!(config.naming_scheme, NamingScheme::Cli);
        assert!(config.keep_intermediates);
        assert!(config.converter_timeout.is_none());
    }

    #[test]
    fn flags_reach_the_core_config() {
        let (args, tools) = parse(&[
            "subforge",
            "extract",
            "-i",
            "film.mkv",
            "-o",
            "subs",
            "--naming",
            "batch",
            "--timeout",
            "90",
            "--remove-intermediates",
        ]);
        let config = create_core_config(&args, &tools).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("subs"));
        assert_eq!(config.naming_scheme, NamingScheme::Batch);
        assert_eq!(config.converter_timeout, Some(Duration::from_secs(90)));
        assert!(!config.keep_intermediates);
    }

    #[test]
    fn selections_follow_flags() {
        let (args, _) = parse(&["subforge", "extract", "-i", "film.mkv", "--convert"]);
        let selections = build_selections(&args, &info());
        assert_eq!(
            selections.iter().map(|s| s.track_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(selections.iter().all(|s| s.convert));

        let (args, _) = parse(&[
            "subforge", "extract", "-i", "film.mkv", "--tracks", "2", "--ocr-lang", "de",
        ]);
        let selections = build_selections(&args, &info());
        assert_eq!(selections.len(), 1);
        assert_eq!(selections[0].track_id, 2);
        assert!(!selections[0].convert);
        assert_eq!(selections[0].language_override.as_deref(), Some("de"));
    }
}
