pub mod provider;
pub mod refine;
pub mod tmdb;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
    #[error("cache error: {0}")]
    Cache(#[from] subfetch_cache::CacheError),
}
