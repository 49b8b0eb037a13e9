// ============================================================================
// subforge-core/src/srt.rs
// ============================================================================
//
// SRT UTILITIES: Timing Shift, Encoding Repair, Statistics
//
// Text-level helpers for SRT files produced by the pipeline. The file
// variants always write `<file>.bak` before touching the original.

// ---- External crate imports ----
use log::info;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// ---- Standard library imports ----
use std::fs;
use std::path::{Path, PathBuf};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};

static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})")
        .expect("timing pattern compiles")
});

fn to_millis(caps: &Captures<'_>, first: usize) -> i64 {
    let field = |i: usize| -> i64 {
        caps.get(first + i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    ((field(0) * 60 + field(1)) * 60 + field(2)) * 1000 + field(3)
}

fn format_millis(ms: i64) -> String {
    let ms = ms.max(0);
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000
    )
}

/// Adds `offset_ms` to every cue timing, clamping at zero.
pub fn shift_srt_timing(text: &str, offset_ms: i64) -> String {
    TIMING_LINE
        .replace_all(text, |caps: &Captures<'_>| {
            let start = to_millis(caps, 1) + offset_ms;
            let end = to_millis(caps, 5) + offset_ms;
            format!("{} --> {}", format_millis(start), format_millis(end))
        })
        .into_owned()
}

/// Re-encodes ISO-8859-1 bytes as UTF-8. Valid UTF-8 is returned unchanged.
pub fn repair_latin1(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Path of the backup written before a file is modified in place.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

fn backup(path: &Path) -> CoreResult<PathBuf> {
    if !path.is_file() {
        return Err(CoreError::InputNotFound(path.to_path_buf()));
    }
    let bak = backup_path(path);
    fs::copy(path, &bak)?;
    Ok(bak)
}

/// Shifts every cue in an SRT file by `offset_ms`, keeping a `.bak` copy.
pub fn shift_srt_file(path: &Path, offset_ms: i64) -> CoreResult<SrtStats> {
    let bak = backup(path)?;
    let text = repair_latin1(&fs::read(path)?);
    let shifted = shift_srt_timing(&text, offset_ms);
    fs::write(path, &shifted)?;
    info!(
        "Shifted {} by {} ms (backup at {})",
        path.display(),
        offset_ms,
        bak.display()
    );
    Ok(SrtStats::from_text(&shifted))
}

/// Rewrites a Latin-1 SRT file as UTF-8, keeping a `.bak` copy.
///
/// Returns `false` without touching anything if the file is already UTF-8.
pub fn repair_srt_encoding_file(path: &Path) -> CoreResult<bool> {
    if !path.is_file() {
        return Err(CoreError::InputNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    if std::str::from_utf8(&bytes).is_ok() {
        info!("{} is already valid UTF-8", path.display());
        return Ok(false);
    }
    let bak = backup(path)?;
    fs::write(path, repair_latin1(&bytes))?;
    info!(
        "Converted {} from ISO-8859-1 to UTF-8 (backup at {})",
        path.display(),
        bak.display()
    );
    Ok(true)
}

/// Line and cue counts of an SRT document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SrtStats {
    pub lines: usize,
    pub cues: usize,
}

impl SrtStats {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().count(),
            cues: TIMING_LINE.find_iter(text).count(),
        }
    }
}
