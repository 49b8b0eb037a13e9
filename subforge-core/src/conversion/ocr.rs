// ============================================================================
// subforge-core/src/conversion/ocr.rs
// ============================================================================
//
// OCR CONVERTERS: Bitmap Subtitles to SRT
//
// PGS: `deno run --allow-read --allow-write <script> <traineddata> <input.sup>`
//      prints SRT on stdout; progress and status lines go to stderr.
// VobSub: `vobsub2srt --lang <xx> <stem>` reads `<stem>.idx`/`<stem>.sub`
//      and writes `<stem>.srt`. The pair is copied into the scratch
//      directory first so the tool never writes next to the user's files.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::language::{LanguageConvention, to_convention};
use super::{ConversionPlan, Converter, OutputCapture};
use crate::config::{DEFAULT_TESSDATA_DIR_NAME, ToolPaths};
use crate::error::{CoreError, CoreResult};

/// PGS OCR through the deno script.
#[derive(Debug, Clone)]
pub struct PgsOcrConverter {
    deno: PathBuf,
    script: Option<PathBuf>,
    tessdata_dir: Option<PathBuf>,
}

impl PgsOcrConverter {
    pub fn new(deno: PathBuf, script: Option<PathBuf>, tessdata_dir: Option<PathBuf>) -> Self {
        Self {
            deno,
            script,
            tessdata_dir,
        }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(
            tools.deno.clone(),
            tools.pgs_script.clone(),
            tools.resolved_tessdata_dir(),
        )
    }
}

impl Converter for PgsOcrConverter {
    fn name(&self) -> &str {
        "pgs-to-srt"
    }

    fn prepare(&self, input: &Path, _scratch: &Path, language: &str) -> CoreResult<ConversionPlan> {
        let script = self
            .script
            .as_ref()
            .ok_or_else(|| CoreError::ConverterNotFound("PGS OCR script (not configured)".into()))?;
        if !script.is_file() {
            return Err(CoreError::ConverterNotFound(format!(
                "PGS OCR script {}",
                script.display()
            )));
        }

        // The script runs from its own directory, so every path handed to it
        // must be absolute.
        let script = std::path::absolute(script)?;
        let script_dir = script.parent().map(Path::to_path_buf);

        let mut warnings = Vec::new();
        let mapped = to_convention(language, LanguageConvention::Tesseract);
        if !mapped.mapped {
            warnings.push(format!(
                "Language '{language}' has no trained-data mapping; passing it through unchanged"
            ));
        }

        let tessdata = match (&self.tessdata_dir, &script_dir) {
            (Some(dir), _) => dir.clone(),
            (None, Some(dir)) => dir.join(DEFAULT_TESSDATA_DIR_NAME),
            (None, None) => PathBuf::from(DEFAULT_TESSDATA_DIR_NAME),
        };
        let trained_data =
            std::path::absolute(tessdata.join(format!("{}.traineddata", mapped.code)))?;
        if !trained_data.is_file() {
            return Err(CoreError::ConverterNotFound(format!(
                "trained data {}",
                trained_data.display()
            )));
        }

        let args: Vec<OsString> = vec![
            "run".into(),
            "--allow-read".into(),
            "--allow-write".into(),
            script.into_os_string(),
            trained_data.into(),
            std::path::absolute(input)?.into(),
        ];
        Ok(ConversionPlan {
            program: self.deno.clone(),
            args,
            current_dir: script_dir,
            capture: OutputCapture::Stdout,
            warnings,
        })
    }
}

/// Stem used for the idx/sub pair inside the scratch directory.
const VOBSUB_STEM: &str = "vobsub";

/// VobSub OCR through vobsub2srt.
#[derive(Debug, Clone)]
pub struct VobSubConverter {
    program: PathBuf,
}

impl VobSubConverter {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(tools.vobsub2srt.clone())
    }
}

impl Converter for VobSubConverter {
    fn name(&self) -> &str {
        "vobsub2srt"
    }

    fn prepare(&self, input: &Path, scratch: &Path, language: &str) -> CoreResult<ConversionPlan> {
        let mut warnings = Vec::new();
        let idx = input.with_extension("idx");
        let sub = input.with_extension("sub");
        if !idx.is_file() {
            return Err(CoreError::missing_artifact(idx));
        }
        let stem = scratch.join(VOBSUB_STEM);
        fs::copy(&idx, stem.with_extension("idx"))?;
        if sub.is_file() {
            fs::copy(&sub, stem.with_extension("sub"))?;
        } else {
            warnings.push(format!("VobSub image file {} is missing", sub.display()));
        }

        let mapped = to_convention(language, LanguageConvention::TwoLetter);
        if !mapped.mapped {
            warnings.push(format!(
                "Language '{language}' has no two-letter mapping; passing it through unchanged"
            ));
        }

        let args: Vec<OsString> = vec!["--lang".into(), mapped.code.into(), stem.clone().into()];
        Ok(ConversionPlan {
            program: self.program.clone(),
            args,
            current_dir: Some(scratch.to_path_buf()),
            capture: OutputCapture::File(stem.with_extension("srt")),
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pgs_plan_uses_tesseract_code_and_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("pgs-to-srt.js");
        fs::write(&script, "// script").unwrap();
        let tessdata = dir.path().join(DEFAULT_TESSDATA_DIR_NAME);
        fs::create_dir_all(&tessdata).unwrap();
        fs::write(tessdata.join("deu.traineddata"), b"x").unwrap();

        let converter = PgsOcrConverter::new(PathBuf::from("deno"), Some(script.clone()), None);
        let plan = converter
            .prepare(Path::new("in.sup"), dir.path(), "ger")
            .unwrap();

        assert_eq!(plan.capture, OutputCapture::Stdout);
        assert_eq!(plan.args[3], OsString::from(script));
        assert_eq!(plan.args[4], OsString::from(tessdata.join("deu.traineddata")));
        assert!(plan.warnings.is_empty());
        assert_eq!(plan.current_dir.as_deref(), Some(dir.path()));
        assert!(Path::new(&plan.args[5]).is_absolute());
    }

    #[test]
    fn pgs_without_script_is_not_found() {
        let converter = PgsOcrConverter::new(PathBuf::from("deno"), None, None);
        let err = converter
            .prepare(Path::new("in.sup"), Path::new("."), "eng")
            .unwrap_err();
        assert!(matches!(err, CoreError::ConverterNotFound(_)));
    }

    #[test]
    fn vobsub_plan_copies_pair_into_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let idx = dir.path().join("movie.track4_fre.idx");
        fs::write(&idx, "# VobSub index").unwrap();
        fs::write(idx.with_extension("sub"), b"\x00\x01").unwrap();

        let plan = VobSubConverter::new(PathBuf::from("vobsub2srt"))
            .prepare(&idx, scratch.path(), "fra")
            .unwrap();

        assert_eq!(plan.args[0], OsString::from("--lang"));
        assert_eq!(plan.args[1], OsString::from("fr"));
        assert!(scratch.path().join("vobsub.idx").is_file());
        assert!(scratch.path().join("vobsub.sub").is_file());
        assert_eq!(
            plan.capture,
            OutputCapture::File(scratch.path().join("vobsub.srt"))
        );
    }
}
