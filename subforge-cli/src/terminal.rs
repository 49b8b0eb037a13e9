//! Terminal output components and styling for subforge.
//!
//! Output follows a small visual hierarchy with consistent indentation:
//! sections, processing steps, status lines, and success/failure marks.
//! Everything is emitted through the `log` facade at info level so it also
//! reaches the run log.

use console::style;
use log::{error, info, warn};

/// Represents the visual hierarchy levels in the CLI output
#[derive(Debug, Clone, Copy)]
pub enum OutputLevel {
    /// Level 1: Main sections (===== SECTION =====)
    Section,
    /// Level 2: Processing steps (» Step)
    Subsection,
    /// Level 3: Items under a step
    Progress,
    /// Level 4: Key-value status information
    Status,
}

impl OutputLevel {
    fn indent(&self) -> &'static str {
        match self {
            OutputLevel::Section => "",
            OutputLevel::Subsection => "  ",
            OutputLevel::Progress => "    ",
            OutputLevel::Status => "      ",
        }
    }
}

/// Check if color should be used (respects NO_COLOR environment variable)
fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::colors_enabled_stderr()
}

/// Print a section header for major workflow phases
pub fn print_section(title: &str) {
    info!("");
    if should_use_color() {
        info!("===== {} =====", style(title.to_uppercase()).cyan().bold());
    } else {
        info!("===== {} =====", title.to_uppercase());
    }
}

/// Print a processing step
pub fn print_processing(message: &str) {
    let indent = OutputLevel::Subsection.indent();
    if should_use_color() {
        info!("{indent}» {}", style(message).bold());
    } else {
        info!("{indent}» {message}");
    }
}

/// Print a detail line under a processing step
pub fn print_sub_item(message: &str) {
    info!("{}{message}", OutputLevel::Progress.indent());
}

/// Print a key-value status line with the label padded for alignment
pub fn print_status(label: &str, value: &str) {
    let indent = OutputLevel::Status.indent();
    let label = format!("{label}:");
    if should_use_color() {
        info!("{indent}{:<14} {}", style(label).dim(), value);
    } else {
        info!("{indent}{label:<14} {value}");
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    let indent = OutputLevel::Progress.indent();
    if should_use_color() {
        info!("{indent}{} {message}", style("✓").green());
    } else {
        info!("{indent}✓ {message}");
    }
}

/// Print a per-item failure; the run continues
pub fn print_failure(message: &str) {
    let indent = OutputLevel::Progress.indent();
    if should_use_color() {
        warn!("{indent}{} {message}", style("✗").red());
    } else {
        warn!("{indent}✗ {message}");
    }
}

/// Print a warning
pub fn print_warning(message: &str) {
    warn!("{}⚠ {message}", OutputLevel::Progress.indent());
}

/// Print a fatal error
pub fn print_error(message: &str) {
    error!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_grows_with_depth() {
        let levels = [
            OutputLevel::Section,
            OutputLevel::Subsection,
            OutputLevel::Progress,
            OutputLevel::Status,
        ];
        let widths: Vec<_> = levels.iter().map(|l| l.indent().len()).collect();
        assert!(widths.windows(2).all(|w| w[0] < w[1]));
    }
}
