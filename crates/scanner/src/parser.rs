use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use subfetch_core::video::{EpisodeIdentity, MovieIdentity, ReleaseInfo, VideoInfo};

/// Identity and release properties guessed from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub info: VideoInfo,
    pub release: ReleaseInfo,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
}

// Patterns to ignore
static IGNORE_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "@eaDir",
    ".nfo",
    ".txt",
    ".jpg",
    ".jpeg",
    ".png",
    ".srt",
    ".sub",
    ".idx",
    ".ass",
    ".ssa",
    ".vtt",
];

static VIDEO_EXTENSIONS: &[&str] = &[
    "3g2", "3gp", "asf", "avi", "divx", "f4v", "flv", "m2ts", "m4v", "mk3d", "mkv", "mov", "mp4",
    "mpe", "mpeg", "mpg", "mpv", "mts", "mxf", "ogm", "ogv", "rm", "rmvb", "ts", "vob", "webm",
    "wmv",
];

// SxxExx pattern: S01E02, s1e3, etc.
static RE_SXXEXX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[Ss](\d{1,2})[Ee](\d{1,3})").unwrap()
});

// 1x02 pattern, not part of a longer number like 1920x1080
static RE_XEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\d])(\d{1,2})[xX](\d{2,3})(?:[^\d]|$)").unwrap()
});

// "Season X Episode Y" pattern
static RE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Season\s+(\d+)\s+Episode\s+(\d+)").unwrap()
});

// Movie: "Title (Year)" or "Title.Year"
static RE_MOVIE_YEAR_PAREN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*\((\d{4})\)").unwrap()
});

static RE_MOVIE_YEAR_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)[\.\s](\d{4})(?:[\.\s]|$)").unwrap()
});

// Trailing year on a series name: "Doctor Who (2005)", "Doctor.Who.2005."
static RE_TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)[\s\._]*\(?(\d{4})\)?[\s\._\-]*$").unwrap()
});

// Provider ID in folder name: [tmdb=12345], [imdb=tt123]
static RE_PROVIDER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\w+)=([^\]]+)\]").unwrap()
});

static RE_RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(480p|576p|720p|1080[pi]|2160p|4k)\b").unwrap()
});

static RE_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(blu-?ray|bdrip|brrip|web-?dl|webrip|web|hdtv|dvdrip|dvd)\b").unwrap()
});

static RE_VIDEO_CODEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(x264|h\.?264|avc|x265|h\.?265|hevc|xvid|divx|av1)\b").unwrap()
});

static RE_AUDIO_CODEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(aac|e?ac3|dd5\.?1|ddp5\.?1|dts|truehd|flac|mp3)\b").unwrap()
});

static RE_RELEASE_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-([A-Za-z0-9]+)$").unwrap()
});

/// Check if a filename should be ignored.
pub fn should_ignore(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IGNORE_NAMES
        .iter()
        .any(|pat| lower == pat.to_lowercase() || lower.ends_with(&pat.to_lowercase()))
}

/// Check if a file has a video extension.
pub fn is_video_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Extract provider IDs from a folder/file name like `[tmdb=12345]`.
pub fn extract_provider_ids(name: &str) -> Vec<(String, String)> {
    RE_PROVIDER_ID
        .captures_iter(name)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .collect()
}

fn strip_provider_ids(name: &str) -> String {
    RE_PROVIDER_ID.replace_all(name, "").trim().to_string()
}

/// Clean up a title: replace dots/underscores with spaces, trim.
fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .trim_matches(|c: char| c == ' ' || c == '-')
        .to_string()
}

fn plausible_year(year: u16) -> bool {
    year >= 1900 && year <= 2100
}

/// Split `"Show Name (2005)"` into `("Show Name", Some(2005))`.
fn split_trailing_year(raw: &str) -> (String, Option<u16>) {
    if let Some(caps) = RE_TRAILING_YEAR.captures(raw) {
        if let Ok(year) = caps[2].parse::<u16>() {
            if plausible_year(year) {
                return (clean_title(&caps[1]), Some(year));
            }
        }
    }
    (clean_title(raw), None)
}

/// Byte offset of the first release token (resolution, source, codec).
fn first_release_token(s: &str) -> Option<usize> {
    [&RE_RESOLUTION, &RE_SOURCE, &RE_VIDEO_CODEC, &RE_AUDIO_CODEC]
        .iter()
        .filter_map(|re| re.find(s).map(|m| m.start()))
        .min()
}

/// Guess release properties from a file stem.
pub fn parse_release(stem: &str) -> ReleaseInfo {
    let resolution = RE_RESOLUTION.captures(stem).map(|c| {
        let r = c[1].to_lowercase();
        if r == "4k" { "2160p".to_string() } else { r }
    });

    let source = RE_SOURCE.captures(stem).map(|c| {
        let s = c[1].to_lowercase().replace('-', "");
        match s.as_str() {
            "bluray" | "bdrip" | "brrip" => "Blu-ray",
            "webdl" | "webrip" | "web" => "Web",
            "hdtv" => "HDTV",
            _ => "DVD",
        }
        .to_string()
    });

    let video_codec = RE_VIDEO_CODEC.captures(stem).map(|c| {
        let v = c[1].to_lowercase().replace('.', "");
        match v.as_str() {
            "x264" | "h264" | "avc" => "H.264",
            "x265" | "h265" | "hevc" => "H.265",
            "xvid" | "divx" => "Xvid",
            _ => "AV1",
        }
        .to_string()
    });

    let audio_codec = RE_AUDIO_CODEC.captures(stem).map(|c| {
        let a = c[1].to_lowercase().replace('.', "");
        match a.as_str() {
            "aac" => "AAC",
            "ac3" | "dd51" => "Dolby Digital",
            "eac3" | "ddp51" => "Dolby Digital Plus",
            "dts" => "DTS",
            "truehd" => "Dolby TrueHD",
            "flac" => "FLAC",
            _ => "MP3",
        }
        .to_string()
    });

    // Only trust a "-GROUP" suffix on names that look like scene releases.
    let release_group = if resolution.is_some() || source.is_some() || video_codec.is_some() {
        RE_RELEASE_GROUP.captures(stem).map(|c| c[1].to_string())
    } else {
        None
    };

    ReleaseInfo {
        release_group,
        source,
        resolution,
        video_codec,
        audio_codec,
    }
}

fn strip_extension(filename: &str) -> &str {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    match name.rfind('.') {
        Some(pos) if is_video_file(name) => &name[..pos],
        _ => name,
    }
}

/// Parse a video filename into movie or episode info.
pub fn parse_filename(filename: &str) -> ParsedName {
    let stem = strip_extension(filename);

    let ids = extract_provider_ids(stem);
    let stem_clean = strip_provider_ids(stem);
    let stem = stem_clean.as_str();

    let info = if let Some(ep) = try_parse_episode(stem) {
        VideoInfo::Episode(ep)
    } else if let Some(movie) = try_parse_movie(stem) {
        VideoInfo::Movie(movie)
    } else {
        let end = first_release_token(stem).unwrap_or(stem.len());
        VideoInfo::Movie(MovieIdentity {
            title: clean_title(&stem[..end]),
            year: None,
        })
    };

    let mut parsed = ParsedName {
        info,
        release: parse_release(stem),
        imdb_id: None,
        tmdb_id: None,
    };
    apply_provider_ids(&mut parsed, &ids);
    parsed
}

/// Parse a path relative to the scan root, using parent folders to fill
/// in a missing series name or movie year.
pub fn parse_path(rel: &Path) -> ParsedName {
    let filename = rel
        .file_name()
        .unwrap_or_default()
        .to_string_lossy();
    let mut parsed = parse_filename(&filename);

    let dirs: Vec<String> = rel
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();

    for dir in &dirs {
        let ids = extract_provider_ids(dir);
        apply_provider_ids(&mut parsed, &ids);
    }

    match &mut parsed.info {
        VideoInfo::Episode(ep) => {
            // Typical structure: `Show Name/Season XX/file.mkv`; the first
            // directory is the series.
            if let Some(series_dir) = dirs.first() {
                let (title, year) = split_trailing_year(&strip_provider_ids(series_dir));
                if ep.series.is_empty() {
                    ep.series = title;
                }
                if ep.year.is_none() {
                    ep.year = year;
                }
            }
        }
        VideoInfo::Movie(movie) => {
            if movie.year.is_none() {
                if let Some(folder) = dirs.last() {
                    if let Some(from_folder) = try_parse_movie(&strip_provider_ids(folder)) {
                        *movie = from_folder;
                    }
                }
            }
        }
    }

    parsed
}

fn apply_provider_ids(parsed: &mut ParsedName, ids: &[(String, String)]) {
    for (provider, id) in ids {
        match provider.as_str() {
            "imdb" | "imdbid" if parsed.imdb_id.is_none() => parsed.imdb_id = Some(id.clone()),
            "tmdb" | "tmdbid" if parsed.tmdb_id.is_none() => parsed.tmdb_id = id.parse().ok(),
            _ => {}
        }
    }
}

fn episode_from_parts(
    stem: &str,
    start: usize,
    end: usize,
    season: u32,
    episode: u32,
) -> EpisodeIdentity {
    let (series, year) = split_trailing_year(&stem[..start]);
    let after = &stem[end..];
    let after = match first_release_token(after) {
        Some(pos) => &after[..pos],
        None => after,
    };
    let title = clean_title(after.trim_start_matches(['-', '.', ' ', '_']));
    EpisodeIdentity {
        series,
        year,
        season,
        episode,
        title: if title.is_empty() { None } else { Some(title) },
    }
}

fn try_parse_episode(stem: &str) -> Option<EpisodeIdentity> {
    // Try SxxExx
    if let Some(caps) = RE_SXXEXX.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        let m = caps.get(0)?;
        return Some(episode_from_parts(stem, m.start(), m.end(), season, episode));
    }

    // Try 1x02
    if let Some(caps) = RE_XEP.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        let start = caps.get(1)?.start();
        let end = caps.get(2)?.end();
        return Some(episode_from_parts(stem, start, end, season, episode));
    }

    // Try "Season X Episode Y"
    if let Some(caps) = RE_SEASON_EPISODE.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        let m = caps.get(0)?;
        return Some(episode_from_parts(stem, m.start(), m.end(), season, episode));
    }

    None
}

fn try_parse_movie(stem: &str) -> Option<MovieIdentity> {
    // "Title (2024)"
    if let Some(caps) = RE_MOVIE_YEAR_PAREN.captures(stem) {
        let title = clean_title(&caps[1]);
        let year: u16 = caps[2].parse().ok()?;
        return Some(MovieIdentity {
            title,
            year: Some(year),
        });
    }

    // "Title.2024.etc"
    if let Some(caps) = RE_MOVIE_YEAR_DOT.captures(stem) {
        let title = clean_title(&caps[1]);
        let year: u16 = caps[2].parse().ok()?;
        if plausible_year(year) {
            return Some(MovieIdentity {
                title,
                year: Some(year),
            });
        }
    }

    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────
