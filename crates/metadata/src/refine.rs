//! Refinement: fill in missing identity fields of a scanned video from
//! metadata providers.
//!
//! Rules:
//! 1. Values parsed from the file or folder name win.
//! 2. Providers fill blanks in priority order; the first hit stops the search.
//! 3. Provider failures are logged and never fail the refinement.

use std::sync::Arc;

use subfetch_cache::region::CacheRegion;
use subfetch_core::video::{Video, VideoInfo};
use tracing::{debug, warn};

use crate::MetadataError;
use crate::provider::{MetadataProvider, SearchResult};

/// Refine `video` in place using `providers`, memoizing lookups in `cache`.
pub async fn refine(
    video: &mut Video,
    providers: &[Arc<dyn MetadataProvider>],
    cache: Option<&CacheRegion>,
) {
    for provider in providers {
        if is_refined(video) {
            break;
        }

        match lookup(video, provider.as_ref(), cache).await {
            Ok(Some(hit)) => {
                debug!(video = %video, provider = provider.name(), id = %hit.provider_id, "refined video");
                apply(video, provider.name(), &hit);
            }
            Ok(None) => debug!(video = %video, provider = provider.name(), "no metadata match"),
            Err(e) => warn!(video = %video, provider = provider.name(), error = %e, "refiner failed"),
        }
    }
}

fn is_refined(video: &Video) -> bool {
    video.year().is_some() && (video.tmdb_id.is_some() || video.imdb_id.is_some())
}

async fn lookup(
    video: &Video,
    provider: &dyn MetadataProvider,
    cache: Option<&CacheRegion>,
) -> Result<Option<SearchResult>, MetadataError> {
    let (kind, title, year) = match &video.info {
        VideoInfo::Movie(m) => ("movie", m.title.as_str(), m.year),
        VideoInfo::Episode(e) => ("series", e.series.as_str(), e.year),
    };
    if title.is_empty() {
        return Ok(None);
    }

    let search = || async {
        match kind {
            "movie" => provider.search_movie(title, year).await,
            _ => provider.search_series(title, year).await,
        }
    };

    let results = match cache {
        Some(region) => {
            let key = format!(
                "{}.search_{kind}|{}|{}",
                provider.name(),
                title.to_lowercase(),
                year.map(|y| y.to_string()).unwrap_or_default()
            );
            region.get_or_create(&key, search).await?
        }
        None => search().await?,
    };

    Ok(best_match(title, year, results))
}

fn normalize(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The first result with the same normalized title (and year, when known).
fn best_match(title: &str, year: Option<u16>, results: Vec<SearchResult>) -> Option<SearchResult> {
    let wanted = normalize(title);
    results
        .into_iter()
        .find(|r| normalize(&r.title) == wanted && (year.is_none() || r.year == year))
}

fn apply(video: &mut Video, provider: &str, hit: &SearchResult) {
    match &mut video.info {
        VideoInfo::Movie(m) => {
            if m.year.is_none() {
                m.year = hit.year;
            }
        }
        VideoInfo::Episode(e) => {
            if e.year.is_none() {
                e.year = hit.year;
            }
        }
    }

    if video.imdb_id.is_none() {
        video.imdb_id = hit.imdb_id.clone();
    }
    if provider == "tmdb" && video.tmdb_id.is_none() {
        video.tmdb_id = hit.provider_id.parse().ok();
    }
}
