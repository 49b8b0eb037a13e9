// ============================================================================
// subforge-core/src/classify.rs
// ============================================================================
//
// TRACK CLASSIFIER: Codec Identifier -> Extraction Strategy
//
// Pure lookup. The codec string is normalized (lowercase, `_ / - .` turned
// into spaces, runs of whitespace collapsed) and matched against a fixed
// alias table on whole-word boundaries. When several aliases match, the
// longest one wins, so "hdmv pgs subtitle" beats "pgs".

use std::fmt;

use crate::media::ContainerTrack;

/// Family of subtitle codec, independent of how it is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    /// Plain UTF-8 timed text (SubRip).
    Utf8Text,
    /// Advanced/SubStation Alpha markup.
    SubStationAlpha,
    /// Presentation-graphics bitmaps (Blu-ray PGS).
    Pgs,
    /// DVD bitmaps with an index file (idx/sub pair).
    VobSub,
    Unknown,
}

/// How a track's bytes get from the container to the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Native bytes written unchanged.
    PassThrough,
    /// Bitmaps recognized into text by an OCR converter.
    OcrImageToText,
    /// Styled markup reformatted into plain timed text.
    MarkupToText,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::PassThrough => "pass-through",
            Strategy::OcrImageToText => "OCR",
            Strategy::MarkupToText => "markup conversion",
        })
    }
}

/// Outcome of classifying one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: CodecFamily,
    pub strategy: Strategy,
    /// Extension of the final artifact, without the leading dot.
    pub extension: String,
}

impl Classification {
    /// Extension of the artifact the extraction tool writes natively.
    pub fn native_extension(&self) -> String {
        match self.family {
            CodecFamily::Utf8Text => "srt".to_string(),
            CodecFamily::SubStationAlpha => "ass".to_string(),
            CodecFamily::Pgs => "sup".to_string(),
            CodecFamily::VobSub => "idx".to_string(),
            CodecFamily::Unknown => self.extension.clone(),
        }
    }

    /// True when the family can be turned into SRT by some converter.
    pub fn is_convertible(&self) -> bool {
        matches!(
            self.family,
            CodecFamily::SubStationAlpha | CodecFamily::Pgs | CodecFamily::VobSub
        )
    }
}

// Aliases are stored already normalized.
const CODEC_ALIASES: &[(&str, CodecFamily)] = &[
    ("s text utf8", CodecFamily::Utf8Text),
    ("utf8", CodecFamily::Utf8Text),
    ("subrip", CodecFamily::Utf8Text),
    ("srt", CodecFamily::Utf8Text),
    ("s text ass", CodecFamily::SubStationAlpha),
    ("s text ssa", CodecFamily::SubStationAlpha),
    ("substationalpha", CodecFamily::SubStationAlpha),
    ("substation alpha", CodecFamily::SubStationAlpha),
    ("sub station alpha", CodecFamily::SubStationAlpha),
    ("advanced substation alpha", CodecFamily::SubStationAlpha),
    ("ass", CodecFamily::SubStationAlpha),
    ("ssa", CodecFamily::SubStationAlpha),
    ("s hdmv pgs", CodecFamily::Pgs),
    ("hdmv pgs", CodecFamily::Pgs),
    ("hdmv pgs subtitle", CodecFamily::Pgs),
    ("pgs", CodecFamily::Pgs),
    ("s vobsub", CodecFamily::VobSub),
    ("vobsub", CodecFamily::VobSub),
    ("dvd subtitle", CodecFamily::VobSub),
];

fn normalize_codec(codec: &str) -> String {
    let replaced: String = codec
        .chars()
        .map(|c| match c {
            '_' | '/' | '-' | '.' => ' ',
            other => other.to_ascii_lowercase(),
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a codec string to its family.
pub fn codec_family(codec: &str) -> CodecFamily {
    let normalized = normalize_codec(codec);
    if normalized.is_empty() {
        return CodecFamily::Unknown;
    }
    let haystack = format!(" {normalized} ");
    CODEC_ALIASES
        .iter()
        .filter(|(alias, _)| haystack.contains(&format!(" {alias} ")))
        .max_by_key(|(alias, _)| alias.len())
        .map(|(_, family)| *family)
        .unwrap_or(CodecFamily::Unknown)
}

/// Extension used for unrecognized codecs.
fn fallback_extension(codec: &str) -> String {
    let sanitized: String = codec
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ' ' => '_',
            other => other,
        })
        .collect();
    if sanitized.is_empty() {
        "bin".to_string()
    } else {
        sanitized
    }
}

/// Classifies a codec string given the user's conversion opt-in.
pub fn classify_codec(codec: &str, convert: bool) -> Classification {
    let family = codec_family(codec);
    let (strategy, extension) = match family {
        CodecFamily::Utf8Text => (Strategy::PassThrough, "srt".to_string()),
        CodecFamily::SubStationAlpha if convert => (Strategy::MarkupToText, "srt".to_string()),
        CodecFamily::SubStationAlpha => (Strategy::PassThrough, "ass".to_string()),
        CodecFamily::Pgs if convert => (Strategy::OcrImageToText, "srt".to_string()),
        CodecFamily::Pgs => (Strategy::PassThrough, "sup".to_string()),
        CodecFamily::VobSub if convert => (Strategy::OcrImageToText, "srt".to_string()),
        CodecFamily::VobSub => (Strategy::PassThrough, "idx".to_string()),
        CodecFamily::Unknown => (Strategy::PassThrough, fallback_extension(codec)),
    };
    Classification {
        family,
        strategy,
        extension,
    }
}

/// Classifies a track, preferring its codec identifier and falling back to
/// the human-readable codec name when the identifier is not recognized.
pub fn classify(track: &ContainerTrack, convert: bool) -> Classification {
    let by_id = classify_codec(&track.codec_id, convert);
    if by_id.family != CodecFamily::Unknown {
        return by_id;
    }
    let by_name = classify_codec(&track.codec_name, convert);
    if by_name.family != CodecFamily::Unknown || track.codec_id.trim().is_empty() {
        return by_name;
    }
    by_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        let cases = [
            ("S_TEXT/UTF8", false, Strategy::PassThrough, "srt"),
            ("S_TEXT/UTF8", true, Strategy::PassThrough, "srt"),
            ("S_TEXT/ASS", false, Strategy::PassThrough, "ass"),
            ("S_TEXT/SSA", true, Strategy::MarkupToText, "srt"),
            ("S_HDMV/PGS", false, Strategy::PassThrough, "sup"),
            ("S_HDMV/PGS", true, Strategy::OcrImageToText, "srt"),
            ("S_VOBSUB", false, Strategy::PassThrough, "idx"),
            ("S_VOBSUB", true, Strategy::OcrImageToText, "srt"),
        ];
        for (codec, convert, strategy, ext) in cases {
            let c = classify_codec(codec, convert);
            assert_eq!(c.strategy, strategy, "{codec} convert={convert}");
            assert_eq!(c.extension, ext, "{codec} convert={convert}");
        }
    }

    #[test]
    fn aliases_and_case_classify_identically() {
        for codec in ["HDMV PGS", "hdmv_pgs_subtitle", "s_hdmv/pgs", "PGS"] {
            assert_eq!(codec_family(codec), CodecFamily::Pgs, "{codec}");
        }
        for codec in ["SubStationAlpha", "Sub Station Alpha", "ASS", "substation alpha"] {
            assert_eq!(codec_family(codec), CodecFamily::SubStationAlpha, "{codec}");
        }
        assert_eq!(codec_family("SubRip/SRT"), CodecFamily::Utf8Text);
        assert_eq!(codec_family("VobSub"), CodecFamily::VobSub);
    }

    #[test]
    fn matching_is_word_bounded() {
        // "class" contains "ass" but is not an ASS codec.
        assert_eq!(codec_family("S_TEXT/CLASSIC"), CodecFamily::Unknown);
    }

    #[test]
    fn unknown_codecs_get_sanitized_extension() {
        let c = classify_codec("S_TEXT/WEBVTT", true);
        assert_eq!(c.family, CodecFamily::Unknown);
        assert_eq!(c.strategy, Strategy::PassThrough);
        assert_eq!(c.extension, "s_text_webvtt");

        assert_eq!(classify_codec("", false).extension, "bin");
        assert_eq!(classify_codec("   ", true).extension, "bin");
    }
}
