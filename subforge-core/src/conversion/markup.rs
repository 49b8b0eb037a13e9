// ============================================================================
// subforge-core/src/conversion/markup.rs
// ============================================================================
//
// MARKUP CONVERTER: ASS/SSA to SRT through ffmpeg
//
// `ffmpeg -y -i <input> -f srt <scratch>/converted.srt`. Styling is dropped
// by ffmpeg's SRT muxer; only timing and text survive.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ConversionPlan, Converter, OutputCapture};
use crate::config::ToolPaths;
use crate::error::CoreResult;

#[derive(Debug, Clone)]
pub struct FfmpegMarkupConverter {
    program: PathBuf,
}

impl FfmpegMarkupConverter {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    pub fn from_tools(tools: &ToolPaths) -> Self {
        Self::new(tools.ffmpeg.clone())
    }
}

impl Converter for FfmpegMarkupConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn prepare(&self, input: &Path, scratch: &Path, _language: &str) -> CoreResult<ConversionPlan> {
        let target = scratch.join("converted.srt");
        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.to_path_buf().into(),
            "-f".into(),
            "srt".into(),
            target.clone().into(),
        ];
        Ok(ConversionPlan {
            program: self.program.clone(),
            args,
            current_dir: None,
            capture: OutputCapture::File(target),
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_requests_srt_format_into_scratch() {
        let plan = FfmpegMarkupConverter::new(PathBuf::from("ffmpeg"))
            .prepare(Path::new("in.ass"), Path::new("/tmp/scratch"), "eng")
            .unwrap();
        let args: Vec<String> = plan
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "srt");
        assert_eq!(
            plan.capture,
            OutputCapture::File(PathBuf::from("/tmp/scratch/converted.srt"))
        );
    }
}
