// subforge-cli/src/lib.rs
//
// Library portion of the Subforge CLI application.
// Contains argument definitions, command logic and terminal presentation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, ExtractArgs, ToolArgs};
pub use commands::extract::run_extract;
pub use error::{CliErrorContext, CliResult};
