//! Implementation of the 'info' subcommand.
//!
//! Lists every track of a container. Subtitle tracks also show the codec
//! family and what an extraction would produce.

use crate::cli::{InfoArgs, ToolArgs};
use crate::error::CliResult;
use crate::terminal;

use subforge_core::{ContainerInfo, MkvmergeExecutor, Strategy, classify, inspect};

/// One line per track, as printed on stdout.
pub fn describe_tracks(info: &ContainerInfo, convert: bool) -> Vec<String> {
    info.tracks
        .iter()
        .map(|track| {
            let mut line = track.describe();
            if track.is_subtitle() {
                let classification = classify(track, convert);
                line.push_str(&format!(
                    " -> {:?}, .{}",
                    classification.family, classification.extension
                ));
                if classification.strategy != Strategy::PassThrough {
                    line.push_str(&format!(" via {}", classification.strategy));
                }
            }
            line
        })
        .collect()
}

/// Inspects a container and prints its tracks.
pub fn run_info(args: &InfoArgs, tools: &ToolArgs) -> CliResult<()> {
    let probe = MkvmergeExecutor::new(tools.mkvmerge.clone());
    let info = inspect(&probe, &args.input_path)?;

    terminal::print_section("Container");
    terminal::print_status("File", &args.input_path.display().to_string());
    terminal::print_status("Type", &info.container_type);
    terminal::print_status(
        "Subtitles",
        &format!("{} of {} tracks", info.subtitle_tracks().count(), info.tracks.len()),
    );

    for line in describe_tracks(&info, args.convert) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use subforge_core::{ContainerTrack, TrackType};

    fn track(id: u64, track_type: TrackType, codec: &str) -> ContainerTrack {
        ContainerTrack {
            id,
            number: id + 1,
            track_type,
            codec_id: codec.into(),
            codec_name: String::new(),
            language: "eng".into(),
            name: String::new(),
            forced: false,
            default: false,
        }
    }

    #[test]
    fn subtitle_lines_carry_classification() {
        let info = ContainerInfo {
            container_type: "Matroska".into(),
            tracks: vec![
                track(0, TrackType::Audio, "A_AAC"),
                track(1, TrackType::Subtitles, "S_HDMV/PGS"),
            ],
        };

        let plain = describe_tracks(&info, false);
        assert!(!plain[0].contains("->"));
        assert!(plain[1].contains("Pgs, .sup"));

        let converting = describe_tracks(&info, true);
        assert!(converting[1].contains(".srt via OCR"));
    }
}
