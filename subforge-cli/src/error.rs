// ============================================================================
// subforge-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// The CLI reuses the core error type. Context is added by wrapping the
// original message into `CoreError::OperationFailed`, except for
// container-level errors, which keep their variant so the exit code can
// still be derived from them.

// ---- Internal crate imports ----
use subforge_core::{CoreError, CoreResult};

// ---- Standard library imports ----
use std::fmt;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Extension trait for adding context to errors in the CLI.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

fn wrap(context: impl fmt::Display, error: CoreError) -> CoreError {
    if error.is_container_level() {
        return error;
    }
    CoreError::OperationFailed(format!("{context}: {error}"))
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| wrap(context, e.into()))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(f(), e.into()))
    }
}

impl<T> CliErrorContext<T> for Option<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.ok_or_else(|| CoreError::OperationFailed(context.to_string()))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| CoreError::OperationFailed(f().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn context_is_prefixed() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.cli_context("Failed to create output directory").unwrap_err();
        assert!(err.to_string().contains("Failed to create output directory"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn container_errors_keep_their_variant() {
        let result: CliResult<()> = Err(CoreError::InputNotFound(PathBuf::from("a.mkv")));
        let err = result.cli_with_context(|| "Inspecting").unwrap_err();
        assert!(matches!(err, CoreError::InputNotFound(_)));
    }

    #[test]
    fn missing_option_becomes_error() {
        let value: Option<u8> = None;
        assert!(value.cli_context("no value").is_err());
    }
}
