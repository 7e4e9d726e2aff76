//! Sidecar subtitle file discovery and naming.
//!
//! Naming conventions:
//! - `Movie.en.srt`          → language "eng"
//! - `Movie.en.forced.srt`   → language "eng", forced
//! - `Movie.srt`             → undefined language
//! - `Movie.en.hi.srt`       → language "eng", hearing impaired
//!
//! Supported extensions: .srt, .sub, .ass, .ssa, .vtt, .sup, .idx

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use subfetch_core::language::Language;

/// A discovered sidecar subtitle file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarSubtitle {
    pub path: PathBuf,
    pub format: SubtitleFormat,
    pub language: Option<Language>,
    pub forced: bool,
    pub sdh: bool, // hearing impaired / SDH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Srt,
    Sub,
    Ass,
    Ssa,
    Vtt,
    Sup, // PGS bitmap
    Idx, // VobSub index
}

impl SubtitleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "sub" => Some(Self::Sub),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "vtt" => Some(Self::Vtt),
            "sup" => Some(Self::Sup),
            "idx" => Some(Self::Idx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Sub => "sub",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
            Self::Vtt => "vtt",
            Self::Sup => "sup",
            Self::Idx => "idx",
        }
    }
}

/// Parse subtitle metadata from the segments between the media stem and
/// the subtitle extension.
fn parse_sub_markers(media_stem: &str, sub_stem: &str) -> (Option<Language>, bool, bool) {
    let extra = if sub_stem.len() > media_stem.len() {
        &sub_stem[media_stem.len()..]
    } else {
        return (None, false, false);
    };

    let mut language = None;
    let mut forced = false;
    let mut sdh = false;

    for part in extra.split(['.', '_', '-']).filter(|s| !s.is_empty()) {
        let lower = part.to_ascii_lowercase();
        if lower == "forced" {
            forced = true;
        } else if lower == "sdh" || lower == "hi" || lower == "cc" {
            sdh = true;
        } else if language.is_none() {
            language = Language::parse(&lower).ok();
        }
    }

    (language, forced, sdh)
}

/// Discover sidecar subtitle files for a given media file.
pub fn discover_sidecars(media_path: &Path) -> Vec<SidecarSubtitle> {
    let parent = match media_path.parent() {
        Some(p) => p,
        None => return Vec::new(),
    };

    let media_stem = match media_path.file_stem().and_then(|s| s.to_str()) {
        Some(s) => s.to_string(),
        None => return Vec::new(),
    };

    let entries = match std::fs::read_dir(parent) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut results = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let format = match path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SubtitleFormat::from_extension)
        {
            Some(f) => f,
            None => continue,
        };

        let sub_stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };

        // Subtitle stem must be the media stem, optionally followed by markers
        let belongs = sub_stem == media_stem
            || sub_stem
                .strip_prefix(&media_stem)
                .is_some_and(|rest| rest.starts_with(['.', '_', '-']));
        if !belongs {
            continue;
        }

        let (language, forced, sdh) = parse_sub_markers(&media_stem, &sub_stem);

        results.push(SidecarSubtitle {
            path,
            format,
            language,
            forced,
            sdh,
        });
    }

    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}

/// Sidecar subtitles of a video keyed by path. Files without a
/// recognizable language map to the undefined language.
pub fn search_external_subtitles(media_path: &Path) -> BTreeMap<PathBuf, Language> {
    discover_sidecars(media_path)
        .into_iter()
        .map(|s| (s.path, s.language.unwrap_or_else(Language::undefined)))
        .collect()
}

/// Path a subtitle in `language` is saved to: `<stem>.<lang>.srt` next to the video.
pub fn subtitle_path(media_path: &Path, language: Option<&Language>) -> PathBuf {
    let stem = media_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match language {
        Some(lang) => format!("{stem}.{}.srt", lang.short_code()),
        None => format!("{stem}.srt"),
    };
    media_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn lang(code: &str) -> Language {
        Language::parse(code).unwrap()
    }

    #[test]
    fn subtitle_format_detection() {
        assert_eq!(SubtitleFormat::from_extension("srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("SRT"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("ass"), Some(SubtitleFormat::Ass));
        assert_eq!(SubtitleFormat::from_extension("sup"), Some(SubtitleFormat::Sup));
        assert_eq!(SubtitleFormat::from_extension("mp4"), None);
    }

    #[test]
    fn parse_markers_english() {
        let (l, forced, sdh) = parse_sub_markers("Movie.2020", "Movie.2020.en");
        assert_eq!(l, Some(lang("eng")));
        assert!(!forced);
        assert!(!sdh);
    }

    #[test]
    fn parse_markers_alpha3_forced_sdh() {
        let (l, forced, sdh) = parse_sub_markers("Movie.2020", "Movie.2020.fre.forced.sdh");
        assert_eq!(l, Some(lang("fra")));
        assert!(forced);
        assert!(sdh);
    }

    #[test]
    fn parse_markers_no_lang() {
        let (l, forced, sdh) = parse_sub_markers("Movie.2020", "Movie.2020");
        assert!(l.is_none());
        assert!(!forced);
        assert!(!sdh);
    }

    #[test]
    fn subtitle_path_uses_short_code() {
        let p = subtitle_path(Path::new("/media/Movie.2020.mkv"), Some(&lang("eng")));
        assert_eq!(p, PathBuf::from("/media/Movie.2020.en.srt"));
        let p = subtitle_path(Path::new("/media/Movie.2020.mkv"), None);
        assert_eq!(p, PathBuf::from("/media/Movie.2020.srt"));
    }

    #[test]
    fn discover_sidecars_finds_subtitles() {
        let tmp = tempfile::tempdir().unwrap();

        let media = tmp.path().join("Movie.Title.2020.mkv");
        fs::write(&media, "fake video").unwrap();

        fs::write(tmp.path().join("Movie.Title.2020.en.srt"), "1\n00:00:01,000 --> 00:00:02,000\nHello").unwrap();
        fs::write(tmp.path().join("Movie.Title.2020.fr.forced.srt"), "Bonjour").unwrap();
        fs::write(tmp.path().join("Movie.Title.2020.srt"), "no lang").unwrap();
        fs::write(tmp.path().join("Movie.Title.2020.en.sdh.ass"), "sdh subs").unwrap();
        // Unrelated files
        fs::write(tmp.path().join("OtherMovie.en.srt"), "not ours").unwrap();
        fs::write(tmp.path().join("Movie.Title.20201.en.srt"), "not ours either").unwrap();

        let subs = discover_sidecars(&media);
        assert_eq!(subs.len(), 4);

        let fr = subs.iter().find(|s| s.language == Some(lang("fra"))).unwrap();
        assert!(fr.forced);

        let sdh_ass = subs.iter().find(|s| s.sdh && s.format == SubtitleFormat::Ass).unwrap();
        assert_eq!(sdh_ass.language, Some(lang("eng")));

        let external = search_external_subtitles(&media);
        assert_eq!(external.len(), 4);
        assert_eq!(
            external[&tmp.path().join("Movie.Title.2020.srt")],
            Language::undefined()
        );
    }
}
