pub mod pool;
pub mod provider;
pub mod save;
pub mod score;
pub mod subtitle;

use thiserror::Error;

pub use pool::ProviderPool;
pub use provider::{ProviderConfig, ProviderConfigs, ProviderRegistry, SubtitleProvider};
pub use subtitle::{MatchKind, Subtitle};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("invalid config for provider {provider}: {message}")]
    Config { provider: String, message: String },
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("download limit exceeded: {0}")]
    DownloadLimitExceeded(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Errors after which a provider is not asked again for the rest of a
    /// pool session.
    pub fn is_discard(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::ServiceUnavailable(_) | Self::DownloadLimitExceeded(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "unknown_provider",
            Self::Config { .. } => "config",
            Self::Authentication(_) => "authentication",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::DownloadLimitExceeded(_) => "download_limit_exceeded",
            Self::Network(_) => "network",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discard_class() {
        assert!(ProviderError::Authentication("bad password".into()).is_discard());
        assert!(ProviderError::ServiceUnavailable("503".into()).is_discard());
        assert!(ProviderError::DownloadLimitExceeded("quota".into()).is_discard());
        assert!(!ProviderError::Network("timeout".into()).is_discard());
        assert!(!ProviderError::Other("parse".into()).is_discard());
        assert_eq!(ProviderError::UnknownProvider("x".into()).code(), "unknown_provider");
    }
}
