//! The scheduled scan-and-fetch job.
//!
//! Flow of a run:
//! 1. Validate parameters and resolve encoding, languages and media server.
//! 2. Configure the process-wide metadata cache once.
//! 3. Scan for recent videos, detect their sidecar and embedded subtitles and
//!    keep those missing a requested language.
//! 4. List and download the best subtitles through a provider pool.
//! 5. Save subtitles beside each video and refresh the media server.

use std::path::PathBuf;
use std::sync::Arc;

use encoding_rs::Encoding;
use serde::Serialize;
use serde_json::Value;
use subfetch_cache::region::{self, RegionConfig};
use subfetch_core::language::{LanguageSet, parse_languages};
use subfetch_core::video::Video;
use subfetch_mediaserver::{MediaLibrary, MediaServerError, PlexServer, refresh_video};
use subfetch_metadata::provider::MetadataProvider;
use subfetch_metadata::refine::refine;
use subfetch_providers::save::save_subtitles;
use subfetch_providers::score::get_scores;
use subfetch_providers::{ProviderPool, ProviderRegistry, Subtitle};
use subfetch_scanner::scan::{
    check_video, merge_embedded_subtitles, merge_external_subtitles, scan_videos,
};
use tracing::{debug, info};

use crate::error::JobError;
use crate::params::JobParams;
use crate::result::{ScanResult, ScanResultBuilder};

pub type MediaConnector =
    Arc<dyn Fn(&str, &str) -> Result<Arc<dyn MediaLibrary>, MediaServerError> + Send + Sync>;

/// Scheduler-facing argument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    String,
    Int,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    #[serde(rename = "type")]
    pub kind: ArgumentKind,
    pub description: &'static str,
}

/// What the scheduler shows about this job class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobMetaInfo {
    pub job_class_string: &'static str,
    pub notes: &'static str,
    pub arguments: Vec<ArgumentSpec>,
    pub example_arguments: &'static str,
}

pub struct ScanJob {
    registry: ProviderRegistry,
    refiners: Vec<Arc<dyn MetadataProvider>>,
    cache: RegionConfig,
    connect_media: MediaConnector,
    ffprobe: Option<PathBuf>,
}

impl ScanJob {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            refiners: Vec::new(),
            cache: RegionConfig::default(),
            connect_media: Arc::new(connect_plex),
            ffprobe: Some(PathBuf::from("ffprobe")),
        }
    }

    /// Metadata providers used to refine videos, in priority order.
    pub fn with_refiners(mut self, refiners: Vec<Arc<dyn MetadataProvider>>) -> Self {
        self.refiners = refiners;
        self
    }

    /// Cache settings applied if the process-wide region is not configured yet.
    pub fn with_cache(mut self, cache: RegionConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Replace how a media-server client is built from URL and token.
    pub fn with_media_connector(mut self, connect: MediaConnector) -> Self {
        self.connect_media = connect;
        self
    }

    /// ffprobe binary used to find embedded subtitle tracks. `None` skips
    /// embedded detection.
    pub fn with_ffprobe(mut self, ffprobe: Option<PathBuf>) -> Self {
        self.ffprobe = ffprobe;
        self
    }

    pub fn meta_info() -> JobMetaInfo {
        use ArgumentKind as K;
        let arg = |kind, description| ArgumentSpec { kind, description };

        JobMetaInfo {
            job_class_string: "subfetch_job::scan_job::ScanJob",
            notes: "Subtitle scanner with optional Plex support",
            arguments: vec![
                arg(K::String, "Path to scan for new subtitles"),
                arg(K::Int, "Maximum file age in weeks"),
                arg(K::String, "List of alpha3 language codes"),
                arg(K::String, "Encoding for saving subtitles"),
                arg(K::Int, "Minimum subtitle score"),
                arg(K::String, "List of providers to use"),
                arg(K::String, "Dictionary with usernames and passwords"),
                arg(K::Int, "Number of scanner workers"),
                arg(K::String, "Plex Server URL (optional)"),
                arg(K::String, "Plex token (optional)"),
            ],
            example_arguments: "",
        }
    }

    pub fn scheduled_description() -> String {
        format!("pid: {}", std::process::id())
    }

    pub fn running_description() -> String {
        format!("pid: {}", std::process::id())
    }

    pub fn scheduled_error_description(err: &JobError) -> String {
        format!("pid: {} | exception: {}", std::process::id(), err.type_name())
    }

    pub fn failed_description(err: &JobError) -> String {
        format!("pid: {} | exception: {}", std::process::id(), err.type_name())
    }

    pub fn succeeded_description(result: &ScanResult) -> String {
        format!(
            "pid: {} | downloaded: {}",
            std::process::id(),
            result.subtitles.total
        )
    }

    /// Decode positional scheduler arguments and run.
    pub async fn run_with_args(&self, args: &[Value]) -> Result<ScanResult, JobError> {
        let params = JobParams::from_positional(args)?;
        self.run(&params).await
    }

    pub async fn run(&self, params: &JobParams) -> Result<ScanResult, JobError> {
        params.validate()?;

        let provider_configs = params.provider_configs.clone().unwrap_or_default();
        let encoding = Encoding::for_label(params.encoding.trim().as_bytes())
            .filter(|e| *e != encoding_rs::REPLACEMENT)
            .ok_or_else(|| JobError::UnknownEncoding(params.encoding.clone()))?;
        let age = params.age();
        let languages = parse_languages(&params.languages)?;
        let library = match params.media_server() {
            Some((url, token)) => Some((self.connect_media)(url, token)?),
            None => None,
        };

        let mut report = ScanResultBuilder::start();
        let run_id = report.run_id();
        info!(
            run_id = %run_id,
            path = %params.scan_path.display(),
            languages = ?languages,
            encoding = encoding.name(),
            "scan job started"
        );

        let cache = region::configure_global(&self.cache).await?;

        let mut videos = Vec::new();
        for mut video in scan_videos(&params.scan_path, Some(age))? {
            merge_external_subtitles(&mut video);
            if let Some(ffprobe) = &self.ffprobe {
                merge_embedded_subtitles(&mut video, ffprobe).await;
            }
            if !check_video(&video, &languages, Some(age), false) {
                report.ignored();
                continue;
            }

            refine(&mut video, &self.refiners, Some(cache)).await;
            if languages.is_subset(&video.subtitle_languages) {
                report.ignored();
            } else {
                report.collected(video.file_name());
                videos.push(video);
            }
        }
        info!(run_id = %run_id, collected = videos.len(), "videos collected");

        if !videos.is_empty() {
            let mut pool = ProviderPool::new(
                self.registry.clone(),
                &params.providers,
                provider_configs,
                params.max_workers as usize,
            )?;
            let downloaded =
                download_all(&mut pool, &videos, &languages, params.min_score).await;
            report.discarded(pool.discarded_providers());
            pool.terminate().await;

            for (video, subtitles) in videos.iter().zip(downloaded) {
                save_and_refresh(video, subtitles, encoding, library.as_deref(), &mut report)
                    .await?;
            }
        }

        let result = report.finish();
        info!(
            run_id = %run_id,
            downloaded = result.subtitles.total,
            duration = %result.meta.duration,
            "scan job finished"
        );
        Ok(result)
    }
}

fn connect_plex(url: &str, token: &str) -> Result<Arc<dyn MediaLibrary>, MediaServerError> {
    Ok(Arc::new(PlexServer::new(url, token)?))
}

async fn download_all(
    pool: &mut ProviderPool,
    videos: &[Video],
    languages: &LanguageSet,
    min_score: u32,
) -> Vec<Vec<Subtitle>> {
    let mut downloaded = Vec::with_capacity(videos.len());
    for video in videos {
        let scores = get_scores(video);
        let missing: LanguageSet = languages
            .difference(&video.subtitle_languages)
            .copied()
            .collect();
        let floor = score_floor(scores.hash(), min_score);
        debug!(video = %video, missing = ?missing, floor, "fetching subtitles");

        let candidates = pool.list_subtitles(video, &missing).await;
        let best = pool
            .download_best_subtitles(candidates, video, languages, floor, None, false)
            .await;
        downloaded.push(best);
    }
    downloaded
}

/// `min_score` percent of the hash score, rounded up.
fn score_floor(hash_score: u32, min_score: u32) -> u32 {
    let floor = (u64::from(hash_score) * u64::from(min_score)).div_ceil(100);
    u32::try_from(floor).unwrap_or(u32::MAX)
}

async fn save_and_refresh(
    video: &Video,
    subtitles: Vec<Subtitle>,
    encoding: &'static Encoding,
    library: Option<&dyn MediaLibrary>,
    report: &mut ScanResultBuilder,
) -> Result<(), JobError> {
    let saved = save_subtitles(video, subtitles, false, encoding)?;

    for (subtitle, path) in &saved {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        report.saved(&subtitle.provider_name, file_name);
    }

    if saved.is_empty() {
        return Ok(());
    }
    let Some(library) = library else {
        return Ok(());
    };

    let refreshed = refresh_video(library, video).await?;
    if refreshed.is_empty() {
        report.failed(video.to_string());
    }
    for label in refreshed {
        report.refreshed(label);
    }
    Ok(())
}
