use std::path::{Path, PathBuf};
use std::time::Duration;

use subfetch_core::language::{Language, LanguageSet};
use subfetch_core::video::Video;
use tracing::{debug, info};

use crate::embedded;
use crate::parser;
use crate::subtitles;
use crate::walk::{self, MediaEntry};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a `Video` from a walked entry.
pub fn scan_video(root: &Path, entry: &MediaEntry) -> Video {
    let rel = entry.path.strip_prefix(root).unwrap_or(&entry.path);
    let parsed = parser::parse_path(rel);

    let mut video = Video::new(entry.path.clone(), parsed.info);
    video.size_bytes = entry.size_bytes;
    video.mtime_ts = entry.mtime_ts;
    video.release = parsed.release;
    video.imdb_id = parsed.imdb_id;
    video.tmdb_id = parsed.tmdb_id;
    video.hash = match crate::hash::video_hash(&entry.path) {
        Ok(h) => h,
        Err(e) => {
            debug!(path = %entry.path.display(), error = %e, "could not hash video");
            None
        }
    };
    video
}

/// Scan `root` recursively for videos modified within `age`.
pub fn scan_videos(root: &Path, age: Option<Duration>) -> Result<Vec<Video>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let now = chrono::Utc::now().timestamp();
    let entries = walk::walk_media_dir(root, age, now)?;
    info!(
        path = %root.display(),
        files_found = entries.len(),
        "scan found video files"
    );

    Ok(entries.iter().map(|e| scan_video(root, e)).collect())
}

/// Add languages of sidecar subtitle files to the video's known languages.
pub fn merge_external_subtitles(video: &mut Video) {
    let found = subtitles::search_external_subtitles(&video.path);
    video.subtitle_languages.extend(found.into_values());
}

/// Add languages of subtitle tracks embedded in the video file. A failed
/// probe is logged and leaves the video unchanged.
pub async fn merge_embedded_subtitles(video: &mut Video, ffprobe_path: &Path) {
    match embedded::probe_subtitle_languages(ffprobe_path, &video.path).await {
        Ok(found) => {
            debug!(video = %video, languages = ?found, "embedded subtitles");
            video.subtitle_languages.extend(found);
        }
        Err(e) => debug!(path = %video.path.display(), error = %e, "could not probe video"),
    }
}

/// Whether a video still qualifies for a subtitle search.
///
/// Rejects videos older than `age`, videos that already have every
/// requested language and, when `undefined` is set, videos that have a
/// subtitle of undefined language.
pub fn check_video(
    video: &Video,
    languages: &LanguageSet,
    age: Option<Duration>,
    undefined: bool,
) -> bool {
    if languages.is_subset(&video.subtitle_languages) {
        debug!(video = %video, kind = %video.kind(), "all languages already present");
        return false;
    }

    if let Some(age) = age {
        let now = chrono::Utc::now().timestamp();
        if now - video.mtime_ts > i64::try_from(age.as_secs()).unwrap_or(i64::MAX) {
            debug!(video = %video, "video older than scan age");
            return false;
        }
    }

    if undefined && video.subtitle_languages.contains(&Language::undefined()) {
        debug!(video = %video, "undefined subtitle already present");
        return false;
    }

    true
}
