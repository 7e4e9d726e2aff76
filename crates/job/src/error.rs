use std::path::PathBuf;

use serde::Serialize;
use subfetch_cache::CacheError;
use subfetch_core::error::LanguageError;
use subfetch_mediaserver::MediaServerError;
use subfetch_providers::ProviderError;
use subfetch_scanner::scan::ScanError;
use thiserror::Error;

/// Failure of a scan job run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("path '{}' doesn't exist", .0.display())]
    InvalidPath(PathBuf),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    InvalidLanguage(#[from] LanguageError),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("media server error: {0}")]
    MediaServer(#[from] MediaServerError),
}

impl JobError {
    /// Stable name reported to the scheduler on failure.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "InvalidPath",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::InvalidLanguage(_) => "InvalidLanguage",
            Self::UnknownEncoding(_) => "UnknownEncoding",
            Self::Io(_) => "Io",
            Self::Scan(_) => "Scan",
            Self::Cache(_) => "Cache",
            Self::Provider(_) => "Provider",
            Self::MediaServer(_) => "MediaServer",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// JSON error report: `{ "error": { "type": "...", "message": "..." } }`
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl From<&JobError> for ErrorReport {
    fn from(e: &JobError) -> Self {
        Self {
            error: ErrorBody {
                kind: e.type_name().to_string(),
                message: e.to_string(),
            },
        }
    }
}
