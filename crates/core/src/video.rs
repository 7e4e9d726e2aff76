use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::language::LanguageSet;
use crate::types::VideoKind;

/// Identity of a movie file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieIdentity {
    pub title: String,
    pub year: Option<u16>,
}

/// Identity of a TV episode file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeIdentity {
    pub series: String,
    pub year: Option<u16>,
    pub season: u32,
    pub episode: u32,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoInfo {
    Movie(MovieIdentity),
    Episode(EpisodeIdentity),
}

/// Release properties guessed from the file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub release_group: Option<String>,
    pub source: Option<String>,
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
}

/// A video file discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub mtime_ts: i64,
    /// 64-bit content hash in lowercase hex, when computed.
    pub hash: Option<String>,
    pub info: VideoInfo,
    pub release: ReleaseInfo,
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<u64>,
    /// Languages already available, embedded or as sidecar files.
    pub subtitle_languages: LanguageSet,
}

impl Video {
    pub fn new(path: PathBuf, info: VideoInfo) -> Self {
        Self {
            path,
            size_bytes: 0,
            mtime_ts: 0,
            hash: None,
            info,
            release: ReleaseInfo::default(),
            imdb_id: None,
            tmdb_id: None,
            subtitle_languages: LanguageSet::new(),
        }
    }

    pub fn kind(&self) -> VideoKind {
        match self.info {
            VideoInfo::Movie(_) => VideoKind::Movie,
            VideoInfo::Episode(_) => VideoKind::Episode,
        }
    }

    /// File name without directories.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn year(&self) -> Option<u16> {
        match &self.info {
            VideoInfo::Movie(m) => m.year,
            VideoInfo::Episode(e) => e.year,
        }
    }
}

impl std::fmt::Display for Video {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.info {
            VideoInfo::Movie(m) => match m.year {
                Some(y) => write!(f, "<Movie [{}, {}]>", m.title, y),
                None => write!(f, "<Movie [{}]>", m.title),
            },
            VideoInfo::Episode(e) => match e.year {
                Some(y) => write!(
                    f,
                    "<Episode [{} ({}), {}x{:02}]>",
                    e.series, y, e.season, e.episode
                ),
                None => write!(f, "<Episode [{}, {}x{:02}]>", e.series, e.season, e.episode),
            },
        }
    }
}
