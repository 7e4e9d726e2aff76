use crate::MetadataError;

/// A metadata provider used to refine video identities.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Search for a movie by title and optional year.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, MetadataError>;

    /// Search for a TV series by title and optional first-air year.
    async fn search_series(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, MetadataError>;
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub provider_id: String,
    pub title: String,
    pub year: Option<u16>,
    pub imdb_id: Option<String>,
}
