// ============================================================================
// subforge-core/src/media/probe.rs
// ============================================================================
//
// CONTAINER INSPECTOR: Typed Decode of `mkvmerge -J` Output
//
// The identification JSON is decoded into private serde structs that mirror
// only the fields the pipeline needs. Unknown fields are ignored; missing
// required fields fail the decode with `MalformedMetadata` instead of
// surfacing as missing-key panics later on.

use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use super::track::{ContainerInfo, ContainerTrack, TrackType, UNDETERMINED_LANGUAGE};
use crate::error::{CoreError, CoreResult};
use crate::external::MetadataProbe;

/// Container type accepted by the pipeline (compared trimmed, case-insensitively).
pub const MATROSKA_CONTAINER_TYPE: &str = "matroska";

/// File extensions conventionally used for Matroska files.
const MATROSKA_EXTENSIONS: &[&str] = &["mkv", "mka", "mks", "mk3d"];

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdentifyJson {
    container: IdentifyContainer,
    tracks: Vec<IdentifyTrack>,
}

#[derive(Debug, Deserialize)]
struct IdentifyContainer {
    #[serde(rename = "type")]
    container_type: Option<String>,
    #[serde(default = "default_true")]
    recognized: bool,
}

#[derive(Debug, Deserialize)]
struct IdentifyTrack {
    id: u64,
    #[serde(rename = "type")]
    track_type: String,
    #[serde(default)]
    codec: String,
    #[serde(default)]
    properties: IdentifyTrackProps,
}

#[derive(Debug, Default, Deserialize)]
struct IdentifyTrackProps {
    number: Option<u64>,
    codec_id: Option<String>,
    language: Option<String>,
    track_name: Option<String>,
    #[serde(default)]
    forced_track: bool,
    #[serde(default)]
    default_track: bool,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// DECODING
// ============================================================================

/// Decodes identification output into a [`ContainerInfo`].
///
/// Does not check the container type; see [`inspect`].
pub fn parse_identification(bytes: &[u8]) -> CoreResult<ContainerInfo> {
    let raw: IdentifyJson =
        serde_json::from_slice(bytes).map_err(|e| CoreError::MalformedMetadata {
            tool: "mkvmerge".to_string(),
            message: e.to_string(),
        })?;

    let container_type = match raw.container.container_type {
        Some(t) => t,
        None if !raw.container.recognized => String::from("unrecognized"),
        None => String::new(),
    };

    let tracks = raw
        .tracks
        .into_iter()
        .enumerate()
        .map(|(position, track)| {
            let props = track.properties;
            let language = props
                .language
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| UNDETERMINED_LANGUAGE.to_string());
            ContainerTrack {
                id: track.id,
                number: props.number.unwrap_or(position as u64 + 1),
                track_type: TrackType::from_tool_str(&track.track_type),
                codec_id: props.codec_id.unwrap_or_default(),
                codec_name: track.codec,
                language,
                name: props.track_name.unwrap_or_default(),
                forced: props.forced_track,
                default: props.default_track,
            }
        })
        .collect();

    Ok(ContainerInfo {
        container_type,
        tracks,
    })
}

/// True when `container_type` names Matroska.
pub fn is_matroska(container_type: &str) -> bool {
    container_type.trim().eq_ignore_ascii_case(MATROSKA_CONTAINER_TYPE)
}

/// Inspects `path` with the given metadata probe.
///
/// # Errors
///
/// * `InputNotFound` if the path does not exist
/// * `ToolInvocation` if the metadata tool is missing or exits non-zero
/// * `MalformedMetadata` if its output does not decode
/// * `UnsupportedContainer` if the container is not Matroska
pub fn inspect(probe: &dyn MetadataProbe, path: &Path) -> CoreResult<ContainerInfo> {
    validate_container_path(path)?;

    let bytes = probe.identify(path)?;
    let info = parse_identification(&bytes)?;

    if !is_matroska(&info.container_type) {
        return Err(CoreError::UnsupportedContainer(info.container_type));
    }

    debug!(
        "Inspected {}: {} tracks ({} subtitle)",
        path.display(),
        info.tracks.len(),
        info.subtitle_tracks().count()
    );
    Ok(info)
}

/// Checks that `path` names an existing file.
///
/// A non-Matroska extension only produces a warning; the container type
/// reported by the metadata tool is authoritative.
pub fn validate_container_path(path: &Path) -> CoreResult<()> {
    if !path.exists() {
        return Err(CoreError::InputNotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(CoreError::PathError(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    let known_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MATROSKA_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);
    if !known_extension {
        warn!(
            "{} does not have a Matroska extension; relying on the reported container type",
            path.display()
        );
    }
    Ok(())
}
