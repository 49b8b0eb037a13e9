//! Implementation of the 'chapters' subcommand.

use crate::cli::{ChaptersArgs, ToolArgs};
use crate::error::CliResult;
use crate::terminal;

use subforge_core::external::default_chapters_path;
use subforge_core::media::validate_container_path;
use subforge_core::{MkvextractExecutor, format_bytes};

/// Writes the container's chapters as XML.
pub fn run_chapters(args: &ChaptersArgs, tools: &ToolArgs) -> CliResult<()> {
    validate_container_path(&args.input_path)?;
    let dest = args
        .output
        .clone()
        .unwrap_or_else(|| default_chapters_path(&args.input_path));

    let extractor = MkvextractExecutor::new(tools.mkvextract.clone());
    let output = extractor.extract_chapters(&args.input_path, &dest)?;
    if output.warnings {
        terminal::print_warning(output.combined().trim());
    }

    let size = std::fs::metadata(&dest).map(|m| m.len()).unwrap_or_default();
    terminal::print_success(&format!("Chapters written to {} ({})", dest.display(), format_bytes(size)));
    Ok(())
}
