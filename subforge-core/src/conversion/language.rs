// ============================================================================
// subforge-core/src/conversion/language.rs
// ============================================================================
//
// LANGUAGE CODES: Fixed Lookup Between ISO-639 Conventions
//
// Tracks carry ISO-639-2 codes (either the terminology or the bibliographic
// form), the PGS OCR script wants Tesseract trained-data names and
// vobsub2srt wants ISO-639-1. One immutable table serves every direction.

/// One row of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageEntry {
    /// ISO-639-1
    pub two_letter: &'static str,
    /// ISO-639-2/T, the canonical form used inside the pipeline.
    pub terminology: &'static str,
    /// ISO-639-2/B where it differs from the terminology code.
    pub bibliographic: Option<&'static str>,
    /// Tesseract trained-data name.
    pub tesseract: &'static str,
}

const fn entry(
    two_letter: &'static str,
    terminology: &'static str,
    bibliographic: Option<&'static str>,
    tesseract: &'static str,
) -> LanguageEntry {
    LanguageEntry {
        two_letter,
        terminology,
        bibliographic,
        tesseract,
    }
}

pub const LANGUAGES: &[LanguageEntry] = &[
    entry("en", "eng", None, "eng"),
    entry("fr", "fra", Some("fre"), "fra"),
    entry("de", "deu", Some("ger"), "deu"),
    entry("it", "ita", None, "ita"),
    entry("es", "spa", None, "spa"),
    entry("pt", "por", None, "por"),
    entry("nl", "nld", Some("dut"), "nld"),
    entry("sv", "swe", None, "swe"),
    entry("no", "nor", None, "nor"),
    entry("da", "dan", None, "dan"),
    entry("fi", "fin", None, "fin"),
    entry("ja", "jpn", None, "jpn"),
    entry("ko", "kor", None, "kor"),
    entry("zh", "zho", Some("chi"), "chi_sim"),
    entry("ru", "rus", None, "rus"),
    entry("pl", "pol", None, "pol"),
    entry("cs", "ces", Some("cze"), "ces"),
    entry("hu", "hun", None, "hun"),
    entry("el", "ell", Some("gre"), "ell"),
    entry("tr", "tur", None, "tur"),
    entry("ar", "ara", None, "ara"),
    entry("he", "heb", None, "heb"),
    entry("th", "tha", None, "tha"),
    entry("ro", "ron", Some("rum"), "ron"),
    entry("uk", "ukr", None, "ukr"),
    entry("bg", "bul", None, "bul"),
    entry("hr", "hrv", None, "hrv"),
    entry("sk", "slk", Some("slo"), "slk"),
    entry("vi", "vie", None, "vie"),
    entry("hi", "hin", None, "hin"),
    entry("id", "ind", None, "ind"),
    entry("ca", "cat", None, "cat"),
];

/// Code convention a converter expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageConvention {
    TwoLetter,
    Tesseract,
}

/// Result of translating a code for a converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedLanguage {
    pub code: String,
    /// False when the code was not in the table and passed through unchanged.
    pub mapped: bool,
}

/// Lowercases and strips any region/script subtag ("en-US" -> "en").
fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Finds the table row for a 2-letter, 3-letter or Tesseract code.
pub fn lookup(code: &str) -> Option<&'static LanguageEntry> {
    let trimmed = code.trim().to_ascii_lowercase();
    if let Some(found) = LANGUAGES.iter().find(|e| e.tesseract == trimmed) {
        return Some(found);
    }
    let primary = primary_subtag(&trimmed);
    LANGUAGES.iter().find(|e| {
        e.two_letter == primary
            || e.terminology == primary
            || e.bibliographic == Some(primary.as_str())
    })
}

/// Canonical 3-letter form of `code`, if known.
pub fn canonical(code: &str) -> Option<&'static str> {
    lookup(code).map(|e| e.terminology)
}

/// Translates `code` into the convention a converter expects.
///
/// Unknown codes come back unchanged with `mapped == false`.
pub fn to_convention(code: &str, convention: LanguageConvention) -> MappedLanguage {
    match lookup(code) {
        Some(entry) => MappedLanguage {
            code: match convention {
                LanguageConvention::TwoLetter => entry.two_letter,
                LanguageConvention::Tesseract => entry.tesseract,
            }
            .to_string(),
            mapped: true,
        },
        None => MappedLanguage {
            code: code.trim().to_string(),
            mapped: false,
        },
    }
}

/// True for the "undetermined"/missing tag.
pub fn is_undetermined(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code.eq_ignore_ascii_case("und") || code.eq_ignore_ascii_case("auto")
}

/// Picks the OCR language for a track: an explicit override wins, then the
/// track's own tag, then the configured default.
pub fn resolve_ocr_language(track_language: &str, override_code: Option<&str>, default: &str) -> String {
    let chosen = match override_code {
        Some(code) if !is_undetermined(code) => code,
        _ if !is_undetermined(track_language) => track_language,
        _ => default,
    };
    canonical(chosen)
        .map(str::to_string)
        .unwrap_or_else(|| chosen.trim().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_iso_639_2_forms_resolve() {
        assert_eq!(canonical("ger"), Some("deu"));
        assert_eq!(canonical("deu"), Some("deu"));
        assert_eq!(canonical("de"), Some("deu"));
        assert_eq!(canonical("FRE"), Some("fra"));
        assert_eq!(canonical("pt-BR"), Some("por"));
        assert_eq!(canonical("chi_sim"), Some("zho"));
    }

    #[test]
    fn converter_conventions() {
        let two = to_convention("fre", LanguageConvention::TwoLetter);
        assert_eq!(two.code, "fr");
        assert!(two.mapped);
        assert_eq!(to_convention("zho", LanguageConvention::Tesseract).code, "chi_sim");
        assert_eq!(to_convention("dut", LanguageConvention::Tesseract).code, "nld");
    }

    #[test]
    fn unmapped_codes_pass_through() {
        let mapped = to_convention("tlh", LanguageConvention::TwoLetter);
        assert_eq!(mapped.code, "tlh");
        assert!(!mapped.mapped);
    }

    #[test]
    fn ocr_language_precedence() {
        assert_eq!(resolve_ocr_language("ger", None, "eng"), "deu");
        assert_eq!(resolve_ocr_language("und", None, "eng"), "eng");
        assert_eq!(resolve_ocr_language("", Some("Auto"), "eng"), "eng");
        assert_eq!(resolve_ocr_language("spa", Some("fr"), "eng"), "fra");
        assert_eq!(resolve_ocr_language("xyz", None, "eng"), "xyz");
    }
}
