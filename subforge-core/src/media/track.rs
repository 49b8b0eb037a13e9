// ============================================================================
// subforge-core/src/media/track.rs
// ============================================================================
//
// TRACK MODEL: Typed Representation of Container Tracks
//
// A `ContainerTrack` is created fresh on every inspection and never mutated
// afterwards. Batch tasks hold clones of the tracks they were planned from.

use std::fmt;

/// Language tag used when a track carries none.
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
    Other,
}

impl TrackType {
    /// Maps the metadata tool's `type` string.
    pub fn from_tool_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => TrackType::Video,
            "audio" => TrackType::Audio,
            "subtitles" | "subtitle" => TrackType::Subtitles,
            _ => TrackType::Other,
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrackType::Video => "video",
            TrackType::Audio => "audio",
            TrackType::Subtitles => "subtitles",
            TrackType::Other => "other",
        })
    }
}

/// One media track inside an inspected container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerTrack {
    /// Handle passed to the extraction tool.
    pub id: u64,
    /// 1-based presentation order.
    pub number: u64,
    pub track_type: TrackType,
    /// Codec identifier, e.g. `S_TEXT/UTF8` or `S_HDMV/PGS`. May be empty.
    pub codec_id: String,
    /// Human-readable codec name reported alongside the identifier.
    pub codec_name: String,
    /// ISO-639 language code, `und` when missing.
    pub language: String,
    /// Free-text track name, possibly empty.
    pub name: String,
    pub forced: bool,
    pub default: bool,
}

impl ContainerTrack {
    /// True for subtitle tracks.
    pub fn is_subtitle(&self) -> bool {
        self.track_type == TrackType::Subtitles
    }

    /// Short one-line description used in listings and logs.
    pub fn describe(&self) -> String {
        let mut flags = Vec::new();
        if self.default {
            flags.push("default");
        }
        if self.forced {
            flags.push("forced");
        }
        let mut text = format!(
            "#{} (id {}) {} [{}] {}",
            self.number,
            self.id,
            self.track_type,
            self.language,
            if self.codec_id.is_empty() {
                self.codec_name.as_str()
            } else {
                self.codec_id.as_str()
            }
        );
        if !self.name.is_empty() {
            text.push_str(&format!(" \"{}\"", self.name));
        }
        if !flags.is_empty() {
            text.push_str(&format!(" ({})", flags.join(", ")));
        }
        text
    }
}

/// Result of a successful inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container type exactly as reported by the metadata tool.
    pub container_type: String,
    pub tracks: Vec<ContainerTrack>,
}

impl ContainerInfo {
    /// Iterates over subtitle tracks in container order.
    pub fn subtitle_tracks(&self) -> impl Iterator<Item = &ContainerTrack> {
        self.tracks.iter().filter(|t| t.is_subtitle())
    }

    /// Looks a track up by its extraction id.
    pub fn track_by_id(&self, id: u64) -> Option<&ContainerTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }
}
