// ============================================================================
// subforge-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for the Extraction Pipeline
//
// One error enum covers both failure scopes of the pipeline:
// - container-level errors (the metadata tool failed, its output was not the
//   expected shape, or the file is not Matroska) abort a run before any task
//   starts;
// - task-level errors (empty/missing artifacts, converter failures) are caught
//   at the task boundary by the batch orchestrator and recorded on the task.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors produced by the subforge core library.
#[derive(Error, Debug)]
pub enum CoreError {
    // ---- Container-level ----
    #[error("Failed to run {tool}: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("Malformed metadata from {tool}: {message}")]
    MalformedMetadata { tool: String, message: String },

    #[error("Unsupported container type '{0}' (expected Matroska)")]
    UnsupportedContainer(String),

    #[error("No subtitle tracks found in {0}")]
    NoSubtitleTracks(PathBuf),

    // ---- Task-level: extraction ----
    #[error("Extraction of track {track_id} failed with {status}")]
    ExtractionFailed {
        track_id: u64,
        status: String,
        output: String,
    },

    #[error("Extracted artifact is empty (0 bytes): {}", path.display())]
    EmptyArtifact { path: PathBuf, output: String },

    #[error("Extracted artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf, output: String },

    // ---- Task-level: conversion ----
    #[error("Converter not found: {0}")]
    ConverterNotFound(String),

    #[error("Failed to start converter '{converter}': {source}")]
    ConverterStart {
        converter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter '{converter}' exited with {status}")]
    ConverterExit { converter: String, status: String },

    #[error("Converter '{converter}' timed out after {seconds}s")]
    ConverterTimeout { converter: String, seconds: u64 },

    #[error("Converter produced no output file: {0}")]
    OutputNotProduced(PathBuf),

    // ---- Ambient ----
    #[error("Invalid task state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for subforge core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Coarse classification of a failure, shown next to each failed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ToolInvocation,
    MalformedMetadata,
    UnsupportedContainer,
    ExtractionFailed,
    EmptyArtifact,
    MissingArtifact,
    ConverterNotFound,
    ConverterStart,
    ConverterExit,
    ConverterTimeout,
    OutputNotProduced,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::ToolInvocation => "tool invocation error",
            FailureKind::MalformedMetadata => "malformed metadata",
            FailureKind::UnsupportedContainer => "unsupported container",
            FailureKind::ExtractionFailed => "extraction failed",
            FailureKind::EmptyArtifact => "empty artifact",
            FailureKind::MissingArtifact => "missing artifact",
            FailureKind::ConverterNotFound => "converter not found",
            FailureKind::ConverterStart => "converter failed to start",
            FailureKind::ConverterExit => "converter exited with error",
            FailureKind::ConverterTimeout => "converter timed out",
            FailureKind::OutputNotProduced => "output not produced",
            FailureKind::Internal => "internal error",
        };
        f.write_str(label)
    }
}

impl CoreError {
    /// The failure kind reported in batch summaries.
    pub fn kind(&self) -> FailureKind {
        match self {
            CoreError::ToolInvocation { .. } => FailureKind::ToolInvocation,
            CoreError::MalformedMetadata { .. } | CoreError::Json(_) => {
                FailureKind::MalformedMetadata
            }
            CoreError::UnsupportedContainer(_) | CoreError::NoSubtitleTracks(_) => {
                FailureKind::UnsupportedContainer
            }
            CoreError::ExtractionFailed { .. } => FailureKind::ExtractionFailed,
            CoreError::EmptyArtifact { .. } => FailureKind::EmptyArtifact,
            CoreError::MissingArtifact { .. } => FailureKind::MissingArtifact,
            CoreError::ConverterNotFound(_) => FailureKind::ConverterNotFound,
            CoreError::ConverterStart { .. } => FailureKind::ConverterStart,
            CoreError::ConverterExit { .. } => FailureKind::ConverterExit,
            CoreError::ConverterTimeout { .. } => FailureKind::ConverterTimeout,
            CoreError::OutputNotProduced(_) => FailureKind::OutputNotProduced,
            CoreError::InvalidTransition { .. }
            | CoreError::InputNotFound(_)
            | CoreError::PathError(_)
            | CoreError::Config(_)
            | CoreError::OperationFailed(_)
            | CoreError::Io(_) => FailureKind::Internal,
        }
    }

    pub fn empty_artifact(path: impl Into<PathBuf>) -> Self {
        CoreError::EmptyArtifact {
            path: path.into(),
            output: String::new(),
        }
    }

    pub fn missing_artifact(path: impl Into<PathBuf>) -> Self {
        CoreError::MissingArtifact {
            path: path.into(),
            output: String::new(),
        }
    }

    /// Attaches the producing tool's stdout/stderr to an artifact error.
    /// Other variants are returned unchanged.
    pub fn with_tool_output(self, text: impl Into<String>) -> Self {
        match self {
            CoreError::EmptyArtifact { path, .. } => CoreError::EmptyArtifact {
                path,
                output: text.into(),
            },
            CoreError::MissingArtifact { path, .. } => CoreError::MissingArtifact {
                path,
                output: text.into(),
            },
            other => other,
        }
    }

    /// Raw output of the external tool behind this error, if any was kept.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            CoreError::ExtractionFailed { output, .. }
            | CoreError::EmptyArtifact { output, .. }
            | CoreError::MissingArtifact { output, .. } => Some(output),
            _ => None,
        }
    }

    /// True for errors that must abort the whole run before any task starts.
    pub fn is_container_level(&self) -> bool {
        matches!(
            self,
            CoreError::ToolInvocation { .. }
                | CoreError::MalformedMetadata { .. }
                | CoreError::UnsupportedContainer(_)
                | CoreError::NoSubtitleTracks(_)
                | CoreError::InputNotFound(_)
                | CoreError::Json(_)
        )
    }
}

/// Builds a `ToolInvocation` error for a tool that could not be launched.
pub fn command_start_error(tool: impl Into<String>, err: std::io::Error) -> CoreError {
    let tool = tool.into();
    let message = if err.kind() == std::io::ErrorKind::NotFound {
        format!("'{tool}' not found on PATH")
    } else {
        format!("failed to start: {err}")
    };
    CoreError::ToolInvocation { tool, message }
}

/// Builds a `ToolInvocation` error for a tool that exited unsuccessfully.
pub fn command_failed_error(
    tool: impl Into<String>,
    status: ExitStatus,
    stderr: impl AsRef<str>,
) -> CoreError {
    CoreError::ToolInvocation {
        tool: tool.into(),
        message: format!("exited with {status}: {}", stderr.as_ref().trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_level_errors_are_flagged() {
        assert!(CoreError::UnsupportedContainer("webm".into()).is_container_level());
        assert!(
            CoreError::MalformedMetadata {
                tool: "mkvmerge".into(),
                message: "missing field".into()
            }
            .is_container_level()
        );
        assert!(!CoreError::empty_artifact("a.sup").is_container_level());
        assert!(!CoreError::ConverterNotFound("deno".into()).is_container_level());
    }

    #[test]
    fn tool_output_sticks_to_artifact_errors() {
        let err = CoreError::empty_artifact("a.sup").with_tool_output("codec private data missing");
        assert_eq!(err.tool_output(), Some("codec private data missing"));
        assert_eq!(err.kind(), FailureKind::EmptyArtifact);

        let err = CoreError::Config("x".into()).with_tool_output("ignored");
        assert_eq!(err.tool_output(), None);
    }

    #[test]
    fn missing_binary_reads_as_not_found() {
        let err = command_start_error(
            "mkvmerge",
            std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
        );
        assert_eq!(err.kind(), FailureKind::ToolInvocation);
        assert!(err.to_string().contains("not found on PATH"));
    }
}
