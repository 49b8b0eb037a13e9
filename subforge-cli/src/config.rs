// subforge-cli/src/config.rs
//
// Defaults and exit codes used by the CLI.

/// Run finished; per-track failures (if any) are in the summary.
pub const EXIT_SUCCESS: i32 = 0;

/// The container could not be inspected, was rejected, or the command failed.
pub const EXIT_FAILURE: i32 = 1;

/// `extract --strict` and at least one track failed.
pub const EXIT_TASK_FAILURES: i32 = 2;

/// Prefix of run log filenames: `subforge_<verb>_<timestamp>.log`.
pub const RUN_LOG_PREFIX: &str = "subforge";
