//! Implementation of the 'shift' and 'fix-encoding' subcommands.
//!
//! Both rewrite an SRT file in place after saving a `.bak` copy.

use crate::cli::{FixEncodingArgs, ShiftArgs};
use crate::error::CliResult;
use crate::terminal;

use subforge_core::CoreError;
use subforge_core::srt::{backup_path, repair_srt_encoding_file, shift_srt_file};

/// Seconds to whole milliseconds.
pub fn offset_millis(seconds: f64) -> CliResult<i64> {
    if !seconds.is_finite() {
        return Err(CoreError::Config(format!("offset {seconds} is not a number")));
    }
    Ok((seconds * 1000.0).round() as i64)
}

pub fn run_shift(args: &ShiftArgs) -> CliResult<()> {
    let offset = offset_millis(args.offset)?;
    let stats = shift_srt_file(&args.input_path, offset)?;
    terminal::print_success(&format!(
        "Shifted {} cues in {} by {offset} ms (backup: {})",
        stats.cues,
        args.input_path.display(),
        backup_path(&args.input_path).display()
    ));
    Ok(())
}

pub fn run_fix_encoding(args: &FixEncodingArgs) -> CliResult<()> {
    if repair_srt_encoding_file(&args.input_path)? {
        terminal::print_success(&format!(
            "Re-encoded {} as UTF-8 (backup: {})",
            args.input_path.display(),
            backup_path(&args.input_path).display()
        ));
    } else {
        terminal::print_success(&format!("{} is already UTF-8", args.input_path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_to_milliseconds() {
        assert_eq!(offset_millis(1.5).unwrap(), 1500);
        assert_eq!(offset_millis(-0.0004).unwrap(), 0);
        assert_eq!(offset_millis(-2.25).unwrap(), -2250);
        assert!(offset_millis(f64::NAN).is_err());
    }
}
