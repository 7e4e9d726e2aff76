use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one scan job run, serialized as the job's output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub videos: VideoReport,
    pub providers: ProviderReport,
    pub subtitles: SubtitleReport,
    pub media_server: MediaServerReport,
    pub meta: RunMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoReport {
    /// File names of videos that needed subtitles.
    pub collected: Vec<String>,
    pub ignored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub discarded: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtitleReport {
    /// Saved subtitle file names keyed by provider.
    pub by_provider: BTreeMap<String, Vec<String>>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaServerReport {
    pub refreshed: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub start: String,
    pub end: String,
    /// Elapsed time as `H:MM:SS.ffffff`.
    pub duration: String,
    pub duration_ms: u64,
}

/// Accumulates a `ScanResult` while a job runs.
pub struct ScanResultBuilder {
    run_id: Uuid,
    start: DateTime<Local>,
    started: Instant,
    result: ScanResult,
}

impl ScanResultBuilder {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            start: Local::now(),
            started: Instant::now(),
            result: ScanResult::default(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn collected(&mut self, file_name: impl Into<String>) -> &mut Self {
        self.result.videos.collected.push(file_name.into());
        self
    }

    pub fn ignored(&mut self) -> &mut Self {
        self.result.videos.ignored += 1;
        self
    }

    pub fn discarded(&mut self, providers: Vec<String>) -> &mut Self {
        self.result.providers.discarded = providers;
        self
    }

    /// Record a subtitle file written to disk.
    pub fn saved(&mut self, provider: &str, file_name: impl Into<String>) -> &mut Self {
        self.result
            .subtitles
            .by_provider
            .entry(provider.to_string())
            .or_default()
            .push(file_name.into());
        self.result.subtitles.total += 1;
        self
    }

    pub fn refreshed(&mut self, label: impl Into<String>) -> &mut Self {
        self.result.media_server.refreshed.push(label.into());
        self
    }

    pub fn failed(&mut self, label: impl Into<String>) -> &mut Self {
        self.result.media_server.failed.push(label.into());
        self
    }

    pub fn finish(self) -> ScanResult {
        let elapsed = self.started.elapsed();
        let end = Local::now();

        let mut result = self.result;
        result.meta = RunMeta {
            run_id: self.run_id.to_string(),
            start: self.start.to_rfc3339(),
            end: end.to_rfc3339(),
            duration: format_duration(elapsed),
            duration_ms: elapsed.as_millis() as u64,
        };
        result
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_micros()
    )
}
