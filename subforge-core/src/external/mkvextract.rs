// ============================================================================
// subforge-core/src/external/mkvextract.rs
// ============================================================================
//
// MKVEXTRACT: Track and Chapter Extraction
//
// Exit status 0 is success and 1 is "finished with warnings"; both return
// Ok and leave the artifact check to the caller. Anything else is an
// `ExtractionFailed` carrying the tool's own output.

// ---- Standard library imports ----
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// ---- External crate imports ----
use log::{debug, warn};

// ---- Internal crate imports ----
use super::program_name;
use crate::config::ToolPaths;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

/// Captured result of a finished tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit status rendered for display.
    pub status: String,
    pub stdout: String,
    pub stderr: String,
    /// True when the tool reported warnings (exit status 1).
    pub warnings: bool,
}

impl ToolOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            warnings: output.status.code() == Some(1),
        }
    }

    /// stdout followed by stderr, for diagnostics.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Writes one track of a container to a file.
pub trait TrackExtractor {
    fn extract_track(&self, container: &Path, track_id: u64, dest: &Path)
    -> CoreResult<ToolOutput>;
}

/// Runs mkvextract.
#[derive(Debug, Clone)]
pub struct MkvextractExecutor {
    program: PathBuf,
}

impl MkvextractExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(tools.mkvextract.clone())
    }

    fn tool_name(&self) -> String {
        program_name(&self.program)
    }

    fn run(&self, cmd: &mut Command) -> CoreResult<Output> {
        debug!("Running command: {cmd:?}");
        cmd.output()
            .map_err(|e| command_start_error(self.tool_name(), e))
    }

    /// Extracts the chapter list of `container` to `dest` (XML).
    pub fn extract_chapters(&self, container: &Path, dest: &Path) -> CoreResult<ToolOutput> {
        if !container.is_file() {
            return Err(CoreError::InputNotFound(container.to_path_buf()));
        }
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let output = self.run(
            Command::new(&self.program)
                .arg(container)
                .arg("chapters")
                .arg(dest),
        )?;
        let captured = ToolOutput::from_output(&output);
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            return Err(command_failed_error(
                self.tool_name(),
                output.status,
                captured.combined(),
            ));
        }

        match std::fs::metadata(dest) {
            Ok(meta) if meta.len() > 0 => Ok(captured),
            Ok(_) => Err(CoreError::empty_artifact(dest).with_tool_output(captured.combined())),
            Err(_) => {
                Err(CoreError::missing_artifact(dest).with_tool_output(captured.combined()))
            }
        }
    }
}

impl TrackExtractor for MkvextractExecutor {
    fn extract_track(
        &self,
        container: &Path,
        track_id: u64,
        dest: &Path,
    ) -> CoreResult<ToolOutput> {
        let track_spec = format!("{}:{}", track_id, dest.display());
        let output = self.run(
            Command::new(&self.program)
                .arg("tracks")
                .arg(container)
                .arg(&track_spec),
        )?;
        let captured = ToolOutput::from_output(&output);

        match output.status.code() {
            Some(0) => Ok(captured),
            Some(1) => {
                warn!(
                    "{} finished track {} with warnings: {}",
                    self.tool_name(),
                    track_id,
                    captured.combined().trim()
                );
                Ok(captured)
            }
            _ => Err(CoreError::ExtractionFailed {
                track_id,
                status: captured.status.clone(),
                output: captured.combined(),
            }),
        }
    }
}

/// Default chapter file location: `<dir>/<base>_chapters.xml`.
pub fn default_chapters_path(container: &Path) -> PathBuf {
    let base = container
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chapters".to_string());
    container.with_file_name(format!("{base}_chapters.xml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapters_default_next_to_container() {
        assert_eq!(
            default_chapters_path(Path::new("/media/Movie.mkv")),
            PathBuf::from("/media/Movie_chapters.xml")
        );
    }

    #[test]
    fn combined_output_keeps_both_streams() {
        let out = ToolOutput {
            status: "exit status: 2".into(),
            stdout: "Progress: 100%\n".into(),
            stderr: "Error: boom\n".into(),
            warnings: false,
        };
        assert_eq!(out.combined(), "Progress: 100%\nError: boom\n");
    }

    #[test]
    fn missing_binary_is_tool_invocation_error() {
        let extractor = MkvextractExecutor::new("subforge-missing-mkvextract");
        let err = extractor
            .extract_track(Path::new("movie.mkv"), 2, Path::new("out.srt"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ToolInvocation { .. }));
    }
}
