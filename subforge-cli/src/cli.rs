// ============================================================================
// subforge-cli/src/cli.rs
// ============================================================================
//
// COMMAND LINE INTERFACE: Argument Definitions
//
// Defines the command-line argument structures using clap. Tool locations are
// global flags that can also come from SUBFORGE_* environment variables.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use subforge_core::ToolPaths;
use subforge_core::naming::NamingScheme;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Subforge: Matroska subtitle extraction tool",
    long_about = "Extracts subtitle tracks from Matroska containers with mkvtoolnix and \
                  optionally converts them to SRT (OCR for PGS/VobSub, ffmpeg for ASS/SSA)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging, raw converter output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for the run log file (no run log when omitted)
    #[arg(long, global = true, value_name = "LOG_DIR", env = "SUBFORGE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extracts (and optionally converts) the subtitle tracks of a container
    Extract(ExtractArgs),
    /// Lists the tracks of a container and how each subtitle would be handled
    Info(InfoArgs),
    /// Extracts the chapter list of a container as XML
    Chapters(ChaptersArgs),
    /// Inserts an SRT file into a copy of a container
    Insert(InsertArgs),
    /// Shifts every cue of an SRT file by a fixed offset
    Shift(ShiftArgs),
    /// Re-encodes a Latin-1 SRT file as UTF-8
    #[command(name = "fix-encoding")]
    FixEncoding(FixEncodingArgs),
}

impl Commands {
    /// Verb used in the run log filename.
    pub fn verb(&self) -> &'static str {
        match self {
            Commands::Extract(_) => "extract",
            Commands::Info(_) => "info",
            Commands::Chapters(_) => "chapters",
            Commands::Insert(_) => "insert",
            Commands::Shift(_) => "shift",
            Commands::FixEncoding(_) => "fix-encoding",
        }
    }
}

/// Locations of the external tools.
#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    /// mkvmerge binary (container inspection and subtitle insertion)
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_MKVMERGE", default_value = "mkvmerge")]
    pub mkvmerge: PathBuf,

    /// mkvextract binary (track and chapter extraction)
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_MKVEXTRACT", default_value = "mkvextract")]
    pub mkvextract: PathBuf,

    /// ffmpeg binary (ASS/SSA to SRT)
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_FFMPEG", default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// deno runtime for the PGS OCR script
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_DENO", default_value = "deno")]
    pub deno: PathBuf,

    /// PGS-to-SRT OCR script
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_PGS_SCRIPT")]
    pub pgs_script: Option<PathBuf>,

    /// Directory holding <lang>.traineddata files (defaults to tessdata_fast beside the PGS script)
    #[arg(long, global = true, value_name = "DIR", env = "SUBFORGE_TESSDATA")]
    pub tessdata: Option<PathBuf>,

    /// vobsub2srt binary (VobSub OCR)
    #[arg(long, global = true, value_name = "PATH", env = "SUBFORGE_VOBSUB2SRT", default_value = "vobsub2srt")]
    pub vobsub2srt: PathBuf,
}

impl ToolArgs {
    pub fn to_tool_paths(&self) -> ToolPaths {
        ToolPaths {
            mkvmerge: self.mkvmerge.clone(),
            mkvextract: self.mkvextract.clone(),
            ffmpeg: self.ffmpeg.clone(),
            deno: self.deno.clone(),
            pgs_script: self.pgs_script.clone(),
            tessdata_dir: self.tessdata.clone(),
            vobsub2srt: self.vobsub2srt.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Matroska container to extract from
    #[arg(short = 'i', long = "input", required = true, value_name = "MKV")]
    pub input_path: PathBuf,

    /// Directory where subtitles are written (defaults to the container's directory)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output naming scheme: cli (<base>.<lang>.<NNN>) or batch (<base>.track<N>_<lang>)
    #[arg(long, value_name = "SCHEME", default_value = "cli", value_parser = parse_naming_scheme)]
    pub naming: NamingScheme,

    /// Convert image and markup subtitles to SRT
    #[arg(long)]
    pub convert: bool,

    /// Comma-separated track ids to process (default: every subtitle track)
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub tracks: Option<Vec<u64>>,

    /// OCR language override (2- or 3-letter code, "auto" uses the track language)
    #[arg(long = "ocr-lang", value_name = "CODE")]
    pub ocr_lang: Option<String>,

    /// Kill a converter after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Exit with status 2 if any track failed
    #[arg(long)]
    pub strict: bool,

    /// Directory for conversion scratch space (defaults to the system temp dir)
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Delete the extracted .sup/.ass/.idx after a successful conversion
    #[arg(long)]
    pub remove_intermediates: bool,

    /// Print batch events as JSON lines on stdout instead of progress bars
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Matroska container to inspect
    #[arg(value_name = "MKV")]
    pub input_path: PathBuf,

    /// Show the conversion strategy each subtitle track would get
    #[arg(long)]
    pub convert: bool,
}

#[derive(Args, Debug)]
pub struct ChaptersArgs {
    /// Matroska container to read chapters from
    #[arg(value_name = "MKV")]
    pub input_path: PathBuf,

    /// Destination XML file (defaults to <base>_chapters.xml beside the container)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Source container
    #[arg(long = "mkv", required = true, value_name = "MKV")]
    pub container: PathBuf,

    /// Subtitle file to insert
    #[arg(long = "srt", required = true, value_name = "SRT")]
    pub subtitle: PathBuf,

    /// Container to write
    #[arg(short = 'o', long = "output", required = true, value_name = "OUT")]
    pub output: PathBuf,

    /// Language tag for the new track
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Name for the new track
    #[arg(long, value_name = "NAME")]
    pub track_name: Option<String>,

    /// Mark the new track as default
    #[arg(long)]
    pub default: bool,

    /// Mark the new track as forced
    #[arg(long)]
    pub forced: bool,

    /// Drop the container's existing subtitle tracks
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug)]
pub struct ShiftArgs {
    /// SRT file to shift in place (a .bak copy is kept)
    #[arg(value_name = "SRT")]
    pub input_path: PathBuf,

    /// Offset in seconds, negative to move cues earlier
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub offset: f64,
}

#[derive(Args, Debug)]
pub struct FixEncodingArgs {
    /// SRT file to repair in place (a .bak copy is kept)
    #[arg(value_name = "SRT")]
    pub input_path: PathBuf,
}

fn parse_naming_scheme(value: &str) -> Result<NamingScheme, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract_basic_args() {
        let cli = Cli::parse_from(["subforge", "extract", "-i", "movie.mkv"]);
        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.input_path, PathBuf::from("movie.mkv"));
                assert!(args.output_dir.is_none());
                assert_eq!(args.naming, NamingScheme::Cli);
                assert!(!args.convert);
                assert!(args.tracks.is_none());
                assert!(!args.strict);
            }
            other => panic!("Expected Extract command, got {other:?}"),
        }
        assert!(!cli.verbose);
        assert_eq!(cli.tools.mkvmerge, PathBuf::from("mkvmerge"));
    }

    #[test]
    fn test_parse_extract_with_options() {
        let cli = Cli::parse_from([
            "subforge",
            "extract",
            "--input",
            "movie.mkv",
            "-o",
            "subs",
            "--naming",
            "batch",
            "--convert",
            "--tracks",
            "2,3",
            "--ocr-lang",
            "fr",
            "--timeout",
            "600",
            "--strict",
            "--verbose",
            "--pgs-script",
            "/opt/pgs/pgs-to-srt.js",
        ]);
        match cli.command {
            Commands::Extract(args) => {
                assert_eq!(args.output_dir, Some(PathBuf::from("subs")));
                assert_eq!(args.naming, NamingScheme::Batch);
                assert!(args.convert);
                assert_eq!(args.tracks, Some(vec![2, 3]));
                assert_eq!(args.ocr_lang.as_deref(), Some("fr"));
                assert_eq!(args.timeout, Some(600));
                assert!(args.strict);
            }
            other => panic!("Expected Extract command, got {other:?}"),
        }
        assert!(cli.verbose);
        assert_eq!(
            cli.tools.to_tool_paths().pgs_script,
            Some(PathBuf::from("/opt/pgs/pgs-to-srt.js"))
        );
    }

    #[test]
    fn test_unknown_naming_scheme_is_rejected() {
        let result = Cli::try_parse_from(["subforge", "extract", "-i", "a.mkv", "--naming", "fancy"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_shift_negative_offset() {
        let cli = Cli::parse_from(["subforge", "shift", "movie.srt", "--offset", "-1.25"]);
        match cli.command {
            Commands::Shift(args) => {
                assert_eq!(args.input_path, PathBuf::from("movie.srt"));
                assert!((args.offset + 1.25).abs() < f64::EPSILON);
            }
            other => panic!("Expected Shift command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_insert_flags() {
        let cli = Cli::parse_from([
            "subforge", "insert", "--mkv", "in.mkv", "--srt", "eng.srt", "-o", "out.mkv",
            "--language", "eng", "--default", "--replace",
        ]);
        match cli.command {
            Commands::Insert(args) => {
                assert_eq!(args.container, PathBuf::from("in.mkv"));
                assert_eq!(args.language.as_deref(), Some("eng"));
                assert!(args.default);
                assert!(!args.forced);
                assert!(args.replace);
            }
            other => panic!("Expected Insert command, got {other:?}"),
        }
    }
}
