// ============================================================================
// subforge-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent API over CoreConfig. Every field starts at its default; `build`
// runs `CoreConfig::validate` so a built config is always usable.

use std::path::PathBuf;
use std::time::Duration;

use super::{CoreConfig, ToolPaths};
use crate::error::CoreResult;
use crate::naming::NamingScheme;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use subforge_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/tmp/subs"))
///     .default_ocr_language("fra")
///     .build()
///     .unwrap();
/// assert_eq!(config.default_ocr_language, "fra");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output directory.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.config.output_dir = output_dir;
        self
    }

    /// Sets the scratch directory used for conversions.
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.config.temp_dir = Some(temp_dir);
        self
    }

    /// Sets the output naming scheme.
    pub fn naming_scheme(mut self, scheme: NamingScheme) -> Self {
        self.config.naming_scheme = scheme;
        self
    }

    /// Replaces all tool locations at once.
    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.config.tools = tools;
        self
    }

    /// Sets the mkvmerge binary.
    pub fn mkvmerge(mut self, path: PathBuf) -> Self {
        self.config.tools.mkvmerge = path;
        self
    }

    /// Sets the mkvextract binary.
    pub fn mkvextract(mut self, path: PathBuf) -> Self {
        self.config.tools.mkvextract = path;
        self
    }

    /// Sets the ffmpeg binary.
    pub fn ffmpeg(mut self, path: PathBuf) -> Self {
        self.config.tools.ffmpeg = path;
        self
    }

    /// Sets the deno runtime.
    pub fn deno(mut self, path: PathBuf) -> Self {
        self.config.tools.deno = path;
        self
    }

    /// Sets the PGS OCR script.
    pub fn pgs_script(mut self, path: PathBuf) -> Self {
        self.config.tools.pgs_script = Some(path);
        self
    }

    /// Sets the trained-data directory for the PGS OCR script.
    pub fn tessdata_dir(mut self, path: PathBuf) -> Self {
        self.config.tools.tessdata_dir = Some(path);
        self
    }

    /// Sets the vobsub2srt binary.
    pub fn vobsub2srt(mut self, path: PathBuf) -> Self {
        self.config.tools.vobsub2srt = path;
        self
    }

    /// Sets the fallback OCR language.
    pub fn default_ocr_language(mut self, code: &str) -> Self {
        self.config.default_ocr_language = code.trim().to_ascii_lowercase();
        self
    }

    /// Sets the in-memory cap on tool output.
    pub fn output_cap(mut self, cap: usize) -> Self {
        self.config.output_cap = cap;
        self
    }

    /// Sets the elapsed/remaining refresh interval.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Sets a deadline for each converter process.
    pub fn converter_timeout(mut self, timeout: Duration) -> Self {
        self.config.converter_timeout = Some(timeout);
        self
    }

    /// Keeps or removes the extracted native file after conversion.
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.config.keep_intermediates = keep;
        self
    }

    /// Enables or disables the permission fix-up after pass-through extraction.
    pub fn set_permissions(mut self, enabled: bool) -> Self {
        self.config.set_permissions = enabled;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = CoreConfigBuilder::new()
            .output_dir(PathBuf::from("out"))
            .naming_scheme(NamingScheme::Batch)
            .default_ocr_language(" DEU ")
            .keep_intermediates(false)
            .build()
            .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.naming_scheme, NamingScheme::Batch);
        assert_eq!(config.default_ocr_language, "deu");
        assert!(!config.keep_intermediates);
        assert!(config.set_permissions);
    }

    #[test]
    fn build_rejects_invalid_values() {
        assert!(CoreConfigBuilder::new().output_cap(0).build().is_err());
        assert!(
            CoreConfigBuilder::new()
                .progress_interval(Duration::ZERO)
                .build()
                .is_err()
        );
    }
}
