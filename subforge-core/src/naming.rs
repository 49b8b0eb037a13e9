// ============================================================================
// subforge-core/src/naming.rs
// ============================================================================
//
// FILENAME DERIVER: Deterministic Output Names
//
// Names are composed purely from strings; nothing here touches the
// filesystem. `OutputNamer` adds batch-wide collision freedom on top of the
// per-track composition by reserving every name a task will produce
// (final artifact, native intermediate and the VobSub `.sub` sibling).

use std::collections::HashSet;
use std::path::Path;

use crate::classify::{Classification, CodecFamily, Strategy};
use crate::media::ContainerTrack;

/// Output naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NamingScheme {
    /// `<base>.track<number>_<language>.<ext>`
    Batch,
    /// `<base>.<language>.<NNN>[.<name>][.forced].<ext>`
    #[default]
    Cli,
}

impl std::str::FromStr for NamingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(NamingScheme::Batch),
            "cli" => Ok(NamingScheme::Cli),
            other => Err(format!("unknown naming scheme '{other}' (expected cli or batch)")),
        }
    }
}

/// Removes path separators and control characters from a name component.
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '/' | '\\') && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Builds the filename stem (everything before the extension) for a track.
pub fn derive_stem(scheme: NamingScheme, base: &str, track: &ContainerTrack) -> String {
    let language = match sanitize_component(&track.language) {
        lang if lang.is_empty() => "und".to_string(),
        lang => lang,
    };
    match scheme {
        NamingScheme::Batch => format!("{base}.track{}_{language}", track.number),
        NamingScheme::Cli => {
            let mut stem = format!("{base}.{language}.{:03}", track.number);
            let name = sanitize_component(&track.name);
            if !name.is_empty() {
                stem.push('.');
                stem.push_str(&name);
            }
            if track.forced {
                stem.push_str(".forced");
            }
            stem
        }
    }
}

/// Builds the output filename for a track. Pure string composition.
pub fn derive_name(
    scheme: NamingScheme,
    base: &str,
    track: &ContainerTrack,
    extension: &str,
) -> String {
    format!("{}.{extension}", derive_stem(scheme, base, track))
}

/// Filenames reserved for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNames {
    /// Name of the artifact the task ends with.
    pub final_name: String,
    /// Name the extraction tool writes to. Equal to `final_name` for pass-through.
    pub intermediate_name: String,
}

/// Hands out collision-free names for every task of one batch.
#[derive(Debug, Clone)]
pub struct OutputNamer {
    scheme: NamingScheme,
    base: String,
    reserved: HashSet<String>,
}

impl OutputNamer {
    /// Creates a namer for the container at `container_path`.
    pub fn new(scheme: NamingScheme, container_path: &Path) -> Self {
        let base = container_path
            .file_stem()
            .map(|s| sanitize_component(&s.to_string_lossy()))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "subtitles".to_string());
        Self::with_base(scheme, base)
    }

    /// Creates a namer with an explicit base name.
    pub fn with_base(scheme: NamingScheme, base: impl Into<String>) -> Self {
        Self {
            scheme,
            base: base.into(),
            reserved: HashSet::new(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Reserves the names for a classified track.
    ///
    /// If any of them is already taken (compared case-insensitively), the
    /// stem gets `-id<track id>` appended, then a counter if still taken.
    pub fn reserve(&mut self, track: &ContainerTrack, classification: &Classification) -> TaskNames {
        let stem = derive_stem(self.scheme, &self.base, track);
        let mut candidate = stem.clone();
        let mut attempt = 0u32;
        loop {
            let names = self.names_for(&candidate, classification);
            if names.iter().all(|n| !self.reserved.contains(&n.to_lowercase())) {
                for name in &names {
                    self.reserved.insert(name.to_lowercase());
                }
                let final_name = format!("{candidate}.{}", classification.extension);
                let intermediate_name = match classification.strategy {
                    Strategy::PassThrough => final_name.clone(),
                    _ => format!("{candidate}.{}", classification.native_extension()),
                };
                return TaskNames {
                    final_name,
                    intermediate_name,
                };
            }
            attempt += 1;
            candidate = if attempt == 1 {
                format!("{stem}-id{}", track.id)
            } else {
                format!("{stem}-id{}-{attempt}", track.id)
            };
        }
    }

    fn names_for(&self, stem: &str, classification: &Classification) -> Vec<String> {
        let mut names = vec![format!("{stem}.{}", classification.extension)];
        let native = classification.native_extension();
        if native != classification.extension {
            names.push(format!("{stem}.{native}"));
        }
        if classification.family == CodecFamily::VobSub {
            names.push(format!("{stem}.idx"));
            names.push(format!("{stem}.sub"));
        }
        names.sort();
        names.dedup();
        names
    }
}
