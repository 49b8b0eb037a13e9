// ============================================================================
// subforge-core/src/extraction.rs
// ============================================================================
//
// EXTRACTION DRIVER: One Track Out of the Container
//
// A zero exit status is not proof of success. Any file left at the
// destination by an earlier run is removed first; after the extractor
// returns, the destination is stat'ed: absent means `MissingArtifact`, zero
// bytes means `EmptyArtifact`. Both carry the extractor's own output. Only
// then is the task allowed to continue.

// ---- Standard library imports ----
use std::fs;
use std::io;
use std::path::Path;

// ---- External crate imports ----
use log::{debug, warn};

// ---- Internal crate imports ----
use crate::error::{CoreError, CoreResult};
use crate::external::{ToolOutput, TrackExtractor};

/// Permission bits applied to pass-through artifacts (rw-r--r--).
pub const ARTIFACT_MODE: u32 = 0o644;

/// Checks that an artifact exists and is not empty, returning its size.
pub fn verify_artifact(path: &Path) -> CoreResult<u64> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => Err(CoreError::missing_artifact(path)),
        Ok(meta) if meta.len() == 0 => Err(CoreError::empty_artifact(path)),
        Ok(meta) => Ok(meta.len()),
        Err(_) => Err(CoreError::missing_artifact(path)),
    }
}

/// Removes a previous artifact at `dest`, plus the `.sub` half of a VobSub
/// `.idx` pair.
pub fn remove_stale_artifact(dest: &Path) -> CoreResult<()> {
    let mut paths = vec![dest.to_path_buf()];
    if dest
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("idx"))
    {
        paths.push(dest.with_extension("sub"));
    }
    for path in paths {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed stale artifact {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(CoreError::Io(e)),
        }
    }
    Ok(())
}

/// Sets rw-r--r-- on `path`. Failure is logged, not returned.
pub fn apply_artifact_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(ARTIFACT_MODE)) {
            warn!("Could not set permissions on {}: {}", path.display(), e);
        }
    }
    #[cfg(not(unix))]
    {
        debug!("Skipping permission change on {}", path.display());
    }
}

/// Extracts `track_id` from `container` into `dest` and verifies the result.
///
/// When `pass_through` is set the artifact is the final output and gets its
/// permissions normalized.
pub fn extract(
    extractor: &dyn TrackExtractor,
    container: &Path,
    track_id: u64,
    dest: &Path,
    pass_through: bool,
) -> CoreResult<ToolOutput> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    remove_stale_artifact(dest)?;

    let output = extractor.extract_track(container, track_id, dest)?;
    let size = verify_artifact(dest).map_err(|e| e.with_tool_output(output.combined()))?;
    debug!(
        "Extracted track {} to {} ({} bytes)",
        track_id,
        dest.display(),
        size
    );

    if pass_through {
        apply_artifact_permissions(dest);
    }
    Ok(output)
}
