// ============================================================================
// subforge-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: Console and Run Log Dispatch
//
// Logging goes through the `log` facade everywhere and is wired up here with
// fern:
// - stderr gets plain messages for info and coloured level tags for
//   warnings and errors. Library chatter below warn is only shown with
//   --verbose.
// - the optional run log file gets every record with a timestamp, level and
//   target, with ANSI styling stripped.
//
// RUST_LOG, when set to a level name, overrides the level picked from
// --verbose.

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use log::{Level, LevelFilter};

use crate::config::RUN_LOG_PREFIX;
use crate::error::{CliErrorContext, CliResult};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Path of the run log for `verb` inside `log_dir`.
pub fn run_log_path(log_dir: &Path, verb: &str) -> PathBuf {
    log_dir.join(format!("{RUN_LOG_PREFIX}_{verb}_{}.log", get_timestamp()))
}

/// Level from RUST_LOG if it names one, otherwise info/debug.
pub fn resolve_level(verbose: bool) -> LevelFilter {
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| value.trim().parse::<LevelFilter>().ok())
        .unwrap_or(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
}

fn level_tag(level: Level) -> String {
    let tag = format!("[{}]", level.as_str());
    match level {
        Level::Error => style(tag).red().bold().to_string(),
        Level::Warn => style(tag).yellow().to_string(),
        Level::Info => style(tag).green().to_string(),
        Level::Debug => style(tag).blue().to_string(),
        Level::Trace => style(tag).magenta().to_string(),
    }
}

/// Installs the global logger. Returns the run log path when one was created.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>, verb: &str) -> CliResult<Option<PathBuf>> {
    let level = resolve_level(verbose);

    let console_dispatch = fern::Dispatch::new()
        .filter(move |meta| {
            verbose || meta.level() <= Level::Warn || !meta.target().starts_with("subforge_core")
        })
        .format(|out, message, record| {
            if record.level() == Level::Info {
                out.finish(format_args!("{message}"))
            } else {
                out.finish(format_args!("{} {message}", level_tag(record.level())))
            }
        })
        .chain(std::io::stderr());

    let mut root = fern::Dispatch::new().level(level).chain(console_dispatch);

    let run_log = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .cli_with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let path = run_log_path(dir, verb);
            let file = fern::log_file(&path)
                .cli_with_context(|| format!("Failed to create run log {}", path.display()))?;
            root = root.chain(
                fern::Dispatch::new()
                    .format(|out, message, record| {
                        let text = message.to_string();
                        out.finish(format_args!(
                            "{} {:<5} [{}] {}",
                            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                            record.level(),
                            record.target(),
                            console::strip_ansi_codes(&text)
                        ))
                    })
                    .chain(file),
            );
            Some(path)
        }
        None => None,
    };

    root.apply()
        .map_err(|e| subforge_core::CoreError::Config(format!("failed to initialise logging: {e}")))?;
    log::debug!("Logger initialized with level: {level}");
    Ok(run_log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_log_name_has_verb_and_timestamp() {
        let path = run_log_path(Path::new("/tmp/logs"), "extract");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("subforge_extract_"));
        assert!(name.ends_with(".log"));
        // subforge_extract_YYYYMMDD_HHMMSS.log
        assert_eq!(name.len(), "subforge_extract_".len() + 15 + ".log".len());
    }

    #[test]
    fn timestamp_format() {
        let ts = get_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(ts.as_bytes()[8], b'_');
    }
}
