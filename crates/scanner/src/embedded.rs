//! Subtitle tracks embedded in a video container, read with ffprobe.

use std::path::Path;

use serde::Deserialize;
use subfetch_core::language::{Language, LanguageSet};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("ffprobe failed: {0}")]
    Failed(String),
    #[error("parse ffprobe JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    tags: StreamTags,
}

#[derive(Debug, Default, Deserialize)]
struct StreamTags {
    language: Option<String>,
}

/// Run ffprobe on `file` and return the languages of its subtitle streams.
pub async fn probe_subtitle_languages(
    ffprobe_path: &Path,
    file: &Path,
) -> Result<LanguageSet, ProbeError> {
    let output = tokio::process::Command::new(ffprobe_path)
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(file)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ProbeError::Failed(format!("spawn failed: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Failed(format!(
            "{}: {}",
            output.status,
            stderr.trim()
        )));
    }

    parse_subtitle_languages(&output.stdout)
}

/// Subtitle stream languages from ffprobe's `-show_streams` JSON.
///
/// Streams without a language tag, or with a tag that is not a language
/// code, count as `und`.
pub fn parse_subtitle_languages(json: &[u8]) -> Result<LanguageSet, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(json)?;

    Ok(output
        .streams
        .iter()
        .filter(|s| s.codec_type == "subtitle")
        .map(|s| {
            s.tags
                .language
                .as_deref()
                .and_then(|code| Language::parse(code).ok())
                .unwrap_or_else(Language::undefined)
        })
        .collect())
}
