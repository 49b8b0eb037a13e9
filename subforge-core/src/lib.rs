//! Core library for extracting and converting subtitle tracks from Matroska files.
//!
//! The pipeline inspects a container with `mkvmerge -J`, classifies each
//! subtitle track, extracts it with `mkvextract` and optionally converts it to
//! SRT (OCR for PGS/VobSub bitmaps, ffmpeg for ASS/SSA markup). Tracks are
//! processed one at a time; a failing track is recorded and the batch moves on.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use subforge_core::{CoreConfig, extract_subtitles};
//! use subforge_core::events::EventDispatcher;
//! use std::path::{Path, PathBuf};
//!
//! let mut config = CoreConfig::new(PathBuf::from("/path/to/subs"));
//! config.tools.pgs_script = Some(PathBuf::from("/opt/pgs-to-srt/pgs-to-srt.js"));
//! config.validate().unwrap();
//!
//! let summary = extract_subtitles(
//!     &config,
//!     Path::new("/path/to/movie.mkv"),
//!     None,
//!     true,
//!     EventDispatcher::new(),
//! )
//! .unwrap();
//! println!("{summary}");
//! ```

pub mod batch;
pub mod classify;
pub mod config;
pub mod conversion;
pub mod error;
pub mod events;
pub mod external;
pub mod extraction;
pub mod media;
pub mod naming;
pub mod progress;
pub mod report;
pub mod srt;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use batch::{
    BatchRun, BatchRunner, CancelToken, ExtractionTask, TaskFailure, TaskOutcome, TaskState,
    TrackSelection, default_selections, plan_batch,
};
pub use classify::{Classification, CodecFamily, Strategy, classify, classify_codec};
pub use config::{CoreConfig, CoreConfigBuilder, ToolPaths};
pub use conversion::{ConverterSet, convert};
pub use error::{CoreError, CoreResult, FailureKind};
pub use external::{MetadataProbe, MkvextractExecutor, MkvmergeExecutor, MuxRequest, TrackExtractor};
pub use media::{ContainerInfo, ContainerTrack, TrackType, inspect};
pub use naming::{NamingScheme, OutputNamer, derive_name};
pub use report::BatchSummary;
pub use utils::{format_bytes, format_duration};

use std::path::Path;

use events::EventDispatcher;

/// Inspects, plans and runs a full extraction batch with the real tools.
///
/// `selections` of `None` selects every subtitle track with the given
/// `convert` opt-in. Container-level failures are returned as errors;
/// task-level failures are reported in the returned summary.
pub fn extract_subtitles(
    config: &CoreConfig,
    container: &Path,
    selections: Option<Vec<TrackSelection>>,
    convert: bool,
    events: EventDispatcher,
) -> CoreResult<BatchSummary> {
    config.validate()?;

    let probe = MkvmergeExecutor::from_tools(&config.tools);
    let info = inspect(&probe, container)?;
    let selections = selections.unwrap_or_else(|| default_selections(&info, convert));
    let mut batch = plan_batch(container, &info, &selections, config)?;

    let extractor = MkvextractExecutor::from_tools(&config.tools);
    let converters = ConverterSet::from_config(config);
    let runner = BatchRunner::new(&extractor, &converters, config).with_events(events);
    Ok(runner.run_to_completion(&mut batch))
}
