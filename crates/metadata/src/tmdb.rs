//! TMDB (The Movie Database) provider client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use tracing::debug;

use crate::MetadataError;
use crate::provider::{MetadataProvider, SearchResult};

const BASE_URL: &str = "https://api.themoviedb.org/3";

pub struct TmdbClient {
    api_key: String,
    client: reqwest::Client,
}

impl TmdbClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MetadataError> {
        let mut all_params = vec![("api_key", self.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{BASE_URL}{path}");
        debug!(url = %url, "TMDB request");

        let resp = self
            .client
            .get(&url)
            .query(&all_params)
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        let mut params = vec![("query", title)];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push(("year", y));
        }

        let data = self.get_json("/search/movie", &params).await?;
        Ok(parse_search_results(&data, "title", "release_date"))
    }

    async fn search_series(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> Result<Vec<SearchResult>, MetadataError> {
        let mut params = vec![("query", title)];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push(("first_air_date_year", y));
        }

        let data = self.get_json("/search/tv", &params).await?;
        Ok(parse_search_results(&data, "name", "first_air_date"))
    }
}

fn parse_search_results(
    data: &serde_json::Value,
    title_field: &str,
    date_field: &str,
) -> Vec<SearchResult> {
    let results = data["results"].as_array().cloned().unwrap_or_default();

    results
        .iter()
        .take(10)
        .map(|r| SearchResult {
            provider_id: r["id"].as_u64().unwrap_or(0).to_string(),
            title: r[title_field].as_str().unwrap_or("Unknown").to_string(),
            year: r[date_field]
                .as_str()
                .and_then(|d| d.get(..4))
                .and_then(|y| y.parse().ok()),
            imdb_id: r["imdb_id"].as_str().map(|s| s.to_string()),
        })
        .collect()
}
