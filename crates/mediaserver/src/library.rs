use serde::{Deserialize, Serialize};
use subfetch_core::types::SectionKind;

use crate::MediaServerError;

/// A library section on the media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub key: String,
    pub title: String,
    pub kind: SectionKind,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let class = match self.kind {
            SectionKind::Movie => "MovieSection",
            SectionKind::Show => "ShowSection",
            SectionKind::Other => "LibrarySection",
        };
        write!(f, "<{class}:{}:{}>", self.key, self.title)
    }
}

/// Item type to search for within a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibType {
    Movie,
    Show,
}

impl LibType {
    /// Numeric type used by the server's search endpoint.
    pub fn search_type(self) -> u8 {
        match self {
            Self::Movie => 1,
            Self::Show => 2,
        }
    }
}

/// A movie, show or episode known to the media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub rating_key: String,
    pub title: String,
    pub year: Option<u16>,
    /// Season number, for episodes.
    pub season: Option<u32>,
    /// Episode number within the season, for episodes.
    pub episode: Option<u32>,
}

/// Operations the job needs from a media server.
#[async_trait::async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn sections(&self) -> Result<Vec<Section>, MediaServerError>;

    /// Newest-first search returning at most one item.
    async fn search(
        &self,
        section: &Section,
        title: &str,
        year: Option<u16>,
        kind: LibType,
    ) -> Result<Vec<MediaItem>, MediaServerError>;

    /// All episodes of a show.
    async fn episodes(&self, show: &MediaItem) -> Result<Vec<MediaItem>, MediaServerError>;

    /// Ask the server to refresh an item's metadata.
    async fn refresh(&self, item: &MediaItem) -> Result<(), MediaServerError>;
}
