// ============================================================================
// subforge-core/src/external/mkvmerge.rs
// ============================================================================
//
// MKVMERGE: Container Identification and Subtitle Insertion
//
// `identify` returns the raw `mkvmerge -J` bytes; decoding happens in
// `media::probe` so it can be tested without the tool installed.
// `mux` only assembles arguments and runs the tool. mkvmerge exits with 1
// when it finished with warnings, which is treated as success.

// ---- Standard library imports ----
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

// ---- External crate imports ----
use log::{debug, info, warn};

// ---- Internal crate imports ----
use super::program_name;
use crate::config::ToolPaths;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

/// Source of container identification output.
pub trait MetadataProbe {
    /// Returns the tool's machine-readable description of `container`.
    fn identify(&self, container: &Path) -> CoreResult<Vec<u8>>;
}

/// Runs mkvmerge.
#[derive(Debug, Clone)]
pub struct MkvmergeExecutor {
    program: PathBuf,
}

impl MkvmergeExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(tools.mkvmerge.clone())
    }

    fn tool_name(&self) -> String {
        program_name(&self.program)
    }

    /// Inserts an SRT file into a copy of a container.
    ///
    /// # Errors
    ///
    /// * `InputNotFound` if the container or subtitle file is missing
    /// * `ToolInvocation` if mkvmerge cannot be started or fails
    /// * `MissingArtifact` / `EmptyArtifact` if no usable output was written
    pub fn mux_subtitle(&self, request: &MuxRequest) -> CoreResult<()> {
        for input in [&request.container, &request.subtitle] {
            if !input.is_file() {
                return Err(CoreError::InputNotFound(input.clone()));
            }
        }
        if request.output == request.container {
            return Err(CoreError::PathError(format!(
                "refusing to overwrite the source container {}",
                request.output.display()
            )));
        }
        if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(request.to_args());
        debug!("Running command: {cmd:?}");

        let output = cmd
            .output()
            .map_err(|e| command_start_error(self.tool_name(), e))?;
        match output.status.code() {
            Some(0) => {}
            Some(1) => warn!(
                "{} finished with warnings: {}",
                self.tool_name(),
                String::from_utf8_lossy(&output.stdout).trim()
            ),
            _ => {
                return Err(command_failed_error(
                    self.tool_name(),
                    output.status,
                    diagnostic_text(&output.stdout, &output.stderr),
                ));
            }
        }

        match std::fs::metadata(&request.output) {
            Ok(meta) if meta.len() == 0 => Err(CoreError::empty_artifact(&request.output)),
            Ok(_) => {
                info!(
                    "Inserted {} into {}",
                    request.subtitle.display(),
                    request.output.display()
                );
                Ok(())
            }
            Err(_) => Err(CoreError::missing_artifact(&request.output)),
        }
    }
}

impl MetadataProbe for MkvmergeExecutor {
    fn identify(&self, container: &Path) -> CoreResult<Vec<u8>> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-J").arg(container);
        debug!("Running command: {cmd:?}");

        let output = cmd
            .output()
            .map_err(|e| command_start_error(self.tool_name(), e))?;

        // Status 1 means warnings; the JSON is still complete.
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            return Err(command_failed_error(
                self.tool_name(),
                output.status,
                diagnostic_text(&output.stdout, &output.stderr),
            ));
        }
        Ok(output.stdout)
    }
}

/// mkvtoolnix prints most errors on stdout; prefer stderr when it has text.
fn diagnostic_text(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout).into_owned()
    } else {
        stderr.into_owned()
    }
}

/// Parameters for inserting one subtitle file into a container copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxRequest {
    pub container: PathBuf,
    pub subtitle: PathBuf,
    pub output: PathBuf,
    pub language: Option<String>,
    pub track_name: Option<String>,
    pub default_track: bool,
    pub forced_track: bool,
    /// Drop the container's existing subtitle tracks.
    pub replace_existing: bool,
}

impl MuxRequest {
    pub fn new(container: PathBuf, subtitle: PathBuf, output: PathBuf) -> Self {
        Self {
            container,
            subtitle,
            output,
            language: None,
            track_name: None,
            default_track: false,
            forced_track: false,
            replace_existing: false,
        }
    }

    /// Command-line arguments for mkvmerge, in order.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into(), self.output.clone().into()];
        if self.replace_existing {
            args.push("--no-subtitles".into());
        }
        args.push(self.container.clone().into());
        if let Some(language) = self.language.as_deref().filter(|l| !l.trim().is_empty()) {
            args.push("--language".into());
            args.push(format!("0:{}", language.trim()).into());
        }
        if let Some(name) = self.track_name.as_deref().filter(|n| !n.trim().is_empty()) {
            args.push("--track-name".into());
            args.push(format!("0:{}", name.trim()).into());
        }
        if self.default_track {
            args.push("--default-track".into());
            args.push("0:yes".into());
        }
        if self.forced_track {
            args.push("--forced-track".into());
            args.push("0:yes".into());
        }
        args.push(self.subtitle.clone().into());
        args
    }
}
