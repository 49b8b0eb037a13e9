// ============================================================================
// subforge-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with mkvtoolnix and Converter Processes
//
// This module wraps every external process the pipeline starts. The
// container tools sit behind small traits (`MetadataProbe`,
// `TrackExtractor`) so the orchestrator can be driven by test doubles;
// the `Mkv*Executor` types are the real implementations.
//
// KEY COMPONENTS:
// - process: streaming runner with line callbacks, ticks and a deadline
// - mkvmerge: identification (`-J`) and subtitle insertion
// - mkvextract: track and chapter extraction

// ---- Standard library imports ----
use std::env;
use std::path::{Path, PathBuf};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Identification and muxing through mkvmerge
pub mod mkvmerge;

/// Track and chapter extraction through mkvextract
pub mod mkvextract;

/// Streaming subprocess runner
pub mod process;

/// Test doubles for the container tools
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use mkvextract::{MkvextractExecutor, ToolOutput, TrackExtractor, default_chapters_path};
pub use mkvmerge::{MetadataProbe, MkvmergeExecutor, MuxRequest};
pub use process::{
    ProcessOutcome, StreamHandler, StreamLine, StreamOptions, StreamSource, run_streaming,
};

// ============================================================================
// PROGRAM LOOKUP
// ============================================================================

/// Resolves a program to an existing file.
///
/// Paths containing a separator are checked as given; bare names are looked
/// up in each `PATH` entry. Returns `None` when nothing is found.
pub fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Short display name for a program path, used in error messages.
pub(crate) fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        assert_eq!(resolve_program(&tool), None);
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();
        assert_eq!(resolve_program(&tool), Some(tool));
    }

    #[test]
    fn unknown_bare_names_are_not_found() {
        assert_eq!(
            resolve_program(Path::new("subforge-definitely-missing-tool")),
            None
        );
    }

    #[test]
    fn program_name_strips_directories() {
        assert_eq!(program_name(Path::new("/usr/bin/mkvmerge")), "mkvmerge");
    }
}
