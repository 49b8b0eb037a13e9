// ============================================================================
// subforge-cli/src/main.rs
// ============================================================================
//
// SUBFORGE CLI: Entry Point
//
// Parses arguments, sets up logging, dispatches to the command and maps the
// outcome onto the process exit code:
//   0  completed (track failures are reported in the summary)
//   1  container-level error or failed command
//   2  `extract --strict` with at least one failed track

use clap::Parser;
use log::debug;
use std::process;

use subforge_cli::config::{EXIT_FAILURE, EXIT_SUCCESS, EXIT_TASK_FAILURES};
use subforge_cli::commands::{chapters, extract, info, insert, srt};
use subforge_cli::{Cli, CliResult, Commands, logging, terminal};

fn dispatch(cli: &Cli) -> CliResult<i32> {
    match &cli.command {
        Commands::Extract(args) => {
            let summary = extract::run_extract(args, &cli.tools, cli.verbose)?;
            if args.strict && summary.has_failures() {
                Ok(EXIT_TASK_FAILURES)
            } else {
                Ok(EXIT_SUCCESS)
            }
        }
        Commands::Info(args) => info::run_info(args, &cli.tools).map(|()| EXIT_SUCCESS),
        Commands::Chapters(args) => chapters::run_chapters(args, &cli.tools).map(|()| EXIT_SUCCESS),
        Commands::Insert(args) => insert::run_insert(args, &cli.tools).map(|()| EXIT_SUCCESS),
        Commands::Shift(args) => srt::run_shift(args).map(|()| EXIT_SUCCESS),
        Commands::FixEncoding(args) => srt::run_fix_encoding(args).map(|()| EXIT_SUCCESS),
    }
}

fn main() {
    let cli = Cli::parse();

    let run_log = match logging::init_logging(cli.verbose, cli.log_dir.as_deref(), cli.command.verb()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(EXIT_FAILURE);
        }
    };
    if let Some(path) = &run_log {
        debug!("Run log: {}", path.display());
    }

    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            terminal::print_error(&format!("Error: {e}"));
            EXIT_FAILURE
        }
    };
    debug!("Exiting with status {code}");
    log::logger().flush();
    process::exit(code);
}
