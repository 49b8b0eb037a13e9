//! Implementation of the 'insert' subcommand.
//!
//! Thin wrapper over mkvmerge: the source container is never modified, a new
//! container is written to `--output`.

use crate::cli::{InsertArgs, ToolArgs};
use crate::error::CliResult;
use crate::terminal;

use subforge_core::{MkvmergeExecutor, MuxRequest};

pub fn build_request(args: &InsertArgs) -> MuxRequest {
    MuxRequest {
        language: args.language.clone(),
        track_name: args.track_name.clone(),
        default_track: args.default,
        forced_track: args.forced,
        replace_existing: args.replace,
        ..MuxRequest::new(args.container.clone(), args.subtitle.clone(), args.output.clone())
    }
}

pub fn run_insert(args: &InsertArgs, tools: &ToolArgs) -> CliResult<()> {
    let request = build_request(args);
    terminal::print_processing(&format!(
        "Inserting {} into {}",
        request.subtitle.display(),
        request.container.display()
    ));
    MkvmergeExecutor::new(tools.mkvmerge.clone()).mux_subtitle(&request)?;
    terminal::print_success(&format!("Wrote {}", request.output.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn flags_map_onto_request() {
        let cli = Cli::parse_from([
            "subforge", "insert", "--mkv", "in.mkv", "--srt", "fr.srt", "-o", "out.mkv",
            "--language", "fre", "--track-name", "Français", "--forced",
        ]);
        let Commands::Insert(args) = cli.command else {
            panic!("Expected Insert command");
        };
        let request = build_request(&args);
        assert_eq!(request.language.as_deref(), Some("fre"));
        assert_eq!(request.track_name.as_deref(), Some("Français"));
        assert!(request.forced_track);
        assert!(!request.default_track);
        assert!(!request.replace_existing);

        let args: Vec<String> = request
            .to_args()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args.last().map(String::as_str), Some("fr.srt"));
        assert!(args.contains(&"0:fre".to_string()));
    }
}
