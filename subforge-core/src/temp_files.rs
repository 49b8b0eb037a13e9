//! Temporary file management utilities.
//!
//! Scratch space for conversions comes from the tempfile crate, so cleanup
//! happens on drop even when a conversion fails half way.

use crate::error::CoreResult;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};

/// Creates a private scratch directory under `base`. Auto-cleaned when dropped.
pub fn create_scratch_dir(base: &Path, prefix: &str) -> CoreResult<TempDir> {
    std::fs::create_dir_all(base)?;
    Ok(TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .tempdir_in(base)?)
}

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;

    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_dir_is_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let scratch = create_scratch_dir(&base.path().join("nested"), "subforge_convert").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.is_dir());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("subforge_convert_")
        );
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn temp_file_has_prefix_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = create_temp_file(dir.path(), "pgs_to_srt", "srt").unwrap();
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pgs_to_srt_"));
        assert!(name.ends_with(".srt"));
    }
}
