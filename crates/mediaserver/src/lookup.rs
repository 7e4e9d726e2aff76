use subfetch_core::types::SectionKind;
use subfetch_core::video::{Video, VideoInfo};
use tracing::{debug, info, warn};

use crate::MediaServerError;
use crate::library::{LibType, MediaItem, MediaLibrary, Section};

/// Find the media-server items matching `video`, at most one per section.
///
/// Movies are matched in movie sections by title and year. Episodes are
/// matched in show sections by series and year, then by exactly one episode
/// with the same season and episode number. Other section kinds are skipped.
pub async fn find_items(
    library: &dyn MediaLibrary,
    video: &Video,
) -> Result<Vec<(Section, MediaItem)>, MediaServerError> {
    let mut found = Vec::new();

    for section in library.sections().await? {
        let item = match (section.kind, &video.info) {
            (SectionKind::Movie, VideoInfo::Movie(movie)) => library
                .search(&section, &movie.title, movie.year, LibType::Movie)
                .await?
                .into_iter()
                .next(),
            (SectionKind::Show, VideoInfo::Episode(ep)) => {
                let Some(show) = library
                    .search(&section, &ep.series, ep.year, LibType::Show)
                    .await?
                    .into_iter()
                    .next()
                else {
                    debug!(section = %section, video = %video, "show not found");
                    continue;
                };

                let mut episodes: Vec<MediaItem> = library
                    .episodes(&show)
                    .await?
                    .into_iter()
                    .filter(|e| e.season == Some(ep.season) && e.episode == Some(ep.episode))
                    .collect();
                if episodes.len() != 1 {
                    debug!(
                        section = %section,
                        video = %video,
                        matches = episodes.len(),
                        "episode not uniquely matched"
                    );
                    continue;
                }
                episodes.pop()
            }
            _ => continue,
        };

        if let Some(item) = item {
            found.push((section, item));
        }
    }

    Ok(found)
}

/// Refresh every item matching `video`, returning a label per refreshed
/// item. An empty list means no item matched.
pub async fn refresh_video(
    library: &dyn MediaLibrary,
    video: &Video,
) -> Result<Vec<String>, MediaServerError> {
    let mut refreshed = Vec::new();
    for (section, item) in find_items(library, video).await? {
        library.refresh(&item).await?;
        info!(section = %section, rating_key = %item.rating_key, video = %video, "refreshed media item");
        refreshed.push(format!("{section}{video}"));
    }

    if refreshed.is_empty() {
        warn!(video = %video, "no media-server item matched");
    }
    Ok(refreshed)
}
