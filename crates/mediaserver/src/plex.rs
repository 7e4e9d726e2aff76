//! Plex Media Server client.
//!
//! Only the library endpoints needed to locate and refresh an item are used.

use reqwest::Url;
use serde::Deserialize;
use subfetch_core::types::SectionKind;
use tracing::debug;

use crate::MediaServerError;
use crate::library::{LibType, MediaItem, MediaLibrary, Section};

pub struct PlexServer {
    base: Url,
    token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    container: T,
}

#[derive(Deserialize)]
struct DirectoryContainer {
    #[serde(rename = "Directory", default)]
    directories: Vec<Directory>,
}

#[derive(Deserialize)]
struct Directory {
    key: String,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    metadata: Vec<Metadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    rating_key: String,
    title: String,
    year: Option<u16>,
    parent_index: Option<u32>,
    index: Option<u32>,
}

impl From<Metadata> for MediaItem {
    fn from(m: Metadata) -> Self {
        Self {
            rating_key: m.rating_key,
            title: m.title,
            year: m.year,
            season: m.parent_index,
            episode: m.index,
        }
    }
}

impl PlexServer {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, MediaServerError> {
        let base = Url::parse(base_url).map_err(|e| MediaServerError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base,
            token: token.into(),
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, MediaServerError> {
        self.base
            .join(path)
            .map_err(|e| MediaServerError::InvalidUrl(e.to_string()))
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response, MediaServerError> {
        let url = self.url(path)?;
        debug!(method = %method, url = %url, "Plex request");

        let resp = self
            .client
            .request(method, url)
            .query(params)
            .header("X-Plex-Token", &self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| MediaServerError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MediaServerError::Status {
                status: resp.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MediaServerError> {
        let resp = self.send(reqwest::Method::GET, path, params).await?;
        let envelope: Envelope<T> = resp
            .json()
            .await
            .map_err(|e| MediaServerError::Decode(e.to_string()))?;
        Ok(envelope.container)
    }
}

#[async_trait::async_trait]
impl MediaLibrary for PlexServer {
    async fn sections(&self) -> Result<Vec<Section>, MediaServerError> {
        let container: DirectoryContainer = self.get_json("/library/sections", &[]).await?;
        Ok(container
            .directories
            .into_iter()
            .map(|d| Section {
                kind: SectionKind::from_server_type(&d.kind),
                key: d.key,
                title: d.title,
            })
            .collect())
    }

    async fn search(
        &self,
        section: &Section,
        title: &str,
        year: Option<u16>,
        kind: LibType,
    ) -> Result<Vec<MediaItem>, MediaServerError> {
        let search_type = kind.search_type().to_string();
        let year_str = year.map(|y| y.to_string());
        let mut params = vec![
            ("type", search_type.as_str()),
            ("title", title),
            ("sort", "addedAt:desc"),
            ("X-Plex-Container-Start", "0"),
            ("X-Plex-Container-Size", "1"),
        ];
        if let Some(ref y) = year_str {
            params.push(("year", y));
        }

        let path = format!("/library/sections/{}/all", section.key);
        let container: MetadataContainer = self.get_json(&path, &params).await?;
        Ok(container.metadata.into_iter().take(1).map(Into::into).collect())
    }

    async fn episodes(&self, show: &MediaItem) -> Result<Vec<MediaItem>, MediaServerError> {
        let path = format!("/library/metadata/{}/allLeaves", show.rating_key);
        let container: MetadataContainer = self.get_json(&path, &[]).await?;
        Ok(container.metadata.into_iter().map(Into::into).collect())
    }

    async fn refresh(&self, item: &MediaItem) -> Result<(), MediaServerError> {
        let path = format!("/library/metadata/{}/refresh", item.rating_key);
        self.send(reqwest::Method::PUT, &path, &[]).await?;
        Ok(())
    }
}
