use std::collections::BTreeMap;
use std::sync::Arc;

use subfetch_core::language::LanguageSet;
use subfetch_core::types::VideoKind;
use subfetch_core::video::Video;

use crate::ProviderError;
use crate::subtitle::Subtitle;

/// Credentials and options for one provider, e.g. `{"username": ..., "password": ...}`.
pub type ProviderConfig = serde_json::Map<String, serde_json::Value>;

/// Per-provider configs keyed by provider name.
pub type ProviderConfigs = BTreeMap<String, ProviderConfig>;

/// A subtitle search backend.
#[async_trait::async_trait]
pub trait SubtitleProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Languages this provider can serve.
    fn languages(&self) -> &LanguageSet;

    fn video_kinds(&self) -> &[VideoKind] {
        &[VideoKind::Movie, VideoKind::Episode]
    }

    /// Whether the provider can search for this video at all.
    fn check(&self, video: &Video) -> bool {
        self.video_kinds().contains(&video.kind())
    }

    /// Log in or open a session. Called once, before the first query.
    async fn initialize(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn list_subtitles(
        &self,
        video: &Video,
        languages: &LanguageSet,
    ) -> Result<Vec<Subtitle>, ProviderError>;

    /// Fill `subtitle.content`.
    async fn download_subtitle(&self, subtitle: &mut Subtitle) -> Result<(), ProviderError>;

    async fn terminate(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn SubtitleProvider>, ProviderError> + Send + Sync>;

/// Provider constructors by name.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn SubtitleProvider>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(
        &self,
        name: &str,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn SubtitleProvider>, ProviderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))?;
        factory(config)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
