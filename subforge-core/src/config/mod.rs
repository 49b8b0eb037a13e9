//! Configuration structures and constants for the subforge-core library.
//!
//! This module provides the configuration for the extraction pipeline:
//! where artifacts go, how they are named, where the external tools live,
//! and the limits applied while converters run.

mod builder;

use std::path::PathBuf;
use std::time::Duration;

pub use builder::CoreConfigBuilder;

use crate::error::{CoreError, CoreResult};
use crate::naming::NamingScheme;

// Default constants

/// Language handed to the OCR converters when a track is tagged "und" or untagged.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Maximum number of characters of converter/extractor output kept in memory
/// for the batch summary. Anything beyond is labelled as truncated.
pub const DEFAULT_OUTPUT_CAP: usize = 10_000;

/// How often elapsed/remaining time is refreshed while a converter runs.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Name of the directory, next to the PGS OCR script, holding trained language data.
pub const DEFAULT_TESSDATA_DIR_NAME: &str = "tessdata_fast";

/// Locations of the external tools the pipeline drives.
///
/// Bare names are resolved through `PATH` when the process is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// Metadata tool (`mkvmerge -J`), also used for subtitle insertion.
    pub mkvmerge: PathBuf,
    /// Track extraction tool.
    pub mkvextract: PathBuf,
    /// Media converter used for markup (ASS/SSA) to SRT.
    pub ffmpeg: PathBuf,
    /// Script runtime for the PGS OCR script.
    pub deno: PathBuf,
    /// The PGS-to-SRT OCR script. OCR of PGS tracks is unavailable when unset.
    pub pgs_script: Option<PathBuf>,
    /// Directory containing `<lang>.traineddata` files. Defaults to
    /// `tessdata_fast` beside the PGS script.
    pub tessdata_dir: Option<PathBuf>,
    /// VobSub OCR binary.
    pub vobsub2srt: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            mkvmerge: PathBuf::from("mkvmerge"),
            mkvextract: PathBuf::from("mkvextract"),
            ffmpeg: PathBuf::from("ffmpeg"),
            deno: PathBuf::from("deno"),
            pgs_script: None,
            tessdata_dir: None,
            vobsub2srt: PathBuf::from("vobsub2srt"),
        }
    }
}

impl ToolPaths {
    /// Resolves the trained-data directory used by the PGS OCR script.
    pub fn resolved_tessdata_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.tessdata_dir {
            return Some(dir.clone());
        }
        self.pgs_script
            .as_ref()
            .and_then(|script| script.parent())
            .map(|dir| dir.join(DEFAULT_TESSDATA_DIR_NAME))
    }
}

/// Main configuration structure for the subforge-core library.
///
/// Created by the consumer (e.g. subforge-cli) and passed to the planner and
/// the batch orchestrator.
///
/// # Examples
///
/// ```rust,no_run
/// use subforge_core::config::CoreConfigBuilder;
/// use subforge_core::naming::NamingScheme;
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/path/to/subs"))
///     .naming_scheme(NamingScheme::Cli)
///     .pgs_script(PathBuf::from("/opt/pgs-to-srt/pgs-to-srt.js"))
///     .converter_timeout(Duration::from_secs(1800))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory where extracted and converted subtitles are written
    pub output_dir: PathBuf,

    /// Optional directory for conversion scratch space (defaults to the system temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Output file naming scheme
    pub naming_scheme: NamingScheme,

    /// External tool locations
    pub tools: ToolPaths,

    /// OCR language used when a track carries no usable language tag
    pub default_ocr_language: String,

    /// Cap on tool output kept in memory for summaries
    pub output_cap: usize,

    /// Refresh interval for elapsed/remaining time during conversion
    pub progress_interval: Duration,

    /// Optional deadline for each converter process. `None` waits forever.
    pub converter_timeout: Option<Duration>,

    /// Keep the extracted native file after a successful conversion
    pub keep_intermediates: bool,

    /// Set rw-r--r-- on pass-through artifacts after extraction
    pub set_permissions: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            temp_dir: None,
            naming_scheme: NamingScheme::default(),
            tools: ToolPaths::default(),
            default_ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            output_cap: DEFAULT_OUTPUT_CAP,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            converter_timeout: None,
            keep_intermediates: true,
            set_permissions: true,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration writing into `output_dir` with defaults elsewhere.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Self::default()
        }
    }

    /// Checks the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("output directory must not be empty".into()));
        }
        if self.output_dir.is_file() {
            return Err(CoreError::Config(format!(
                "output directory '{}' is a file",
                self.output_dir.display()
            )));
        }
        if self.progress_interval.is_zero() {
            return Err(CoreError::Config("progress interval must be non-zero".into()));
        }
        if self.output_cap == 0 {
            return Err(CoreError::Config("output cap must be non-zero".into()));
        }
        if self.converter_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CoreError::Config("converter timeout must be non-zero".into()));
        }
        let lang = self.default_ocr_language.trim();
        if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::Config(format!(
                "default OCR language '{}' is not a language code",
                self.default_ocr_language
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CoreConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = CoreConfig {
            converter_timeout: Some(Duration::ZERO),
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn tessdata_defaults_next_to_script() {
        let tools = ToolPaths {
            pgs_script: Some(PathBuf::from("/opt/pgs/pgs-to-srt.js")),
            ..ToolPaths::default()
        };
        assert_eq!(
            tools.resolved_tessdata_dir(),
            Some(PathBuf::from("/opt/pgs/tessdata_fast"))
        );
        assert_eq!(ToolPaths::default().resolved_tessdata_dir(), None);
    }
}
