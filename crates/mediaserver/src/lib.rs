pub mod library;
pub mod lookup;
pub mod plex;

use thiserror::Error;

pub use library::{LibType, MediaItem, MediaLibrary, Section};
pub use lookup::{find_items, refresh_video};
pub use plex::PlexServer;

#[derive(Error, Debug)]
pub enum MediaServerError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned {status} for {path}")]
    Status { status: u16, path: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}
