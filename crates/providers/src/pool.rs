use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::join_all;
use subfetch_core::language::LanguageSet;
use subfetch_core::video::Video;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::ProviderError;
use crate::provider::{ProviderConfig, ProviderConfigs, ProviderRegistry, SubtitleProvider};
use crate::score::compute_score;
use crate::subtitle::Subtitle;

/// A session over a set of named providers.
///
/// Providers are created and initialized on first use. Queries fan out over
/// providers with at most `max_workers` in flight. A provider that fails
/// fatally is discarded for the rest of the session. Call `terminate` when
/// done. A pool dropped before `terminate`, by a panic or a cancelled run,
/// terminates its providers on a spawned task.
pub struct ProviderPool {
    registry: ProviderRegistry,
    names: Vec<String>,
    configs: ProviderConfigs,
    initialized: BTreeMap<String, Arc<dyn SubtitleProvider>>,
    discarded: BTreeSet<String>,
    semaphore: Arc<Semaphore>,
}

impl ProviderPool {
    pub fn new(
        registry: ProviderRegistry,
        names: &[String],
        configs: ProviderConfigs,
        max_workers: usize,
    ) -> Result<Self, ProviderError> {
        if let Some(unknown) = names.iter().find(|n| !registry.contains(n)) {
            return Err(ProviderError::UnknownProvider(unknown.clone()));
        }

        let max_workers = max_workers.max(1);
        let mut unique = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(name) {
                unique.push(name.clone());
            }
        }

        info!(providers = ?unique, max_workers, "provider pool opened");
        Ok(Self {
            registry,
            names: unique,
            configs,
            initialized: BTreeMap::new(),
            discarded: BTreeSet::new(),
            semaphore: Arc::new(Semaphore::new(max_workers)),
        })
    }

    /// Providers disabled during this session, in name order.
    pub fn discarded_providers(&self) -> Vec<String> {
        self.discarded.iter().cloned().collect()
    }

    fn discard(&mut self, name: &str, error: &ProviderError) {
        warn!(provider = name, error = %error, "discarding provider");
        self.discarded.insert(name.to_string());
    }

    /// The initialized provider, creating it on first use. `None` once discarded.
    async fn provider(&mut self, name: &str) -> Option<Arc<dyn SubtitleProvider>> {
        if self.discarded.contains(name) {
            return None;
        }
        if let Some(provider) = self.initialized.get(name) {
            return Some(provider.clone());
        }

        let empty = ProviderConfig::new();
        let config = self.configs.get(name).unwrap_or(&empty);
        let created = match self.registry.create(name, config) {
            Ok(provider) => provider,
            Err(e) => {
                self.discard(name, &e);
                return None;
            }
        };

        if let Err(e) = created.initialize().await {
            self.discard(name, &e);
            return None;
        }

        debug!(provider = name, "provider initialized");
        self.initialized.insert(name.to_string(), created.clone());
        Some(created)
    }

    /// Ask every usable provider for subtitles of `video` in `languages`.
    ///
    /// Each provider is only asked for the languages it supports. Provider
    /// errors never fail the listing: fatal ones discard the provider, the
    /// rest are logged.
    pub async fn list_subtitles(&mut self, video: &Video, languages: &LanguageSet) -> Vec<Subtitle> {
        let mut queries = Vec::new();
        for name in self.names.clone() {
            let Some(provider) = self.provider(&name).await else {
                continue;
            };
            if !provider.check(video) {
                debug!(provider = %name, video = %video, "provider skips video kind");
                continue;
            }
            let wanted: LanguageSet = provider
                .languages()
                .intersection(languages)
                .copied()
                .collect();
            if wanted.is_empty() {
                debug!(provider = %name, video = %video, "no requested language supported");
                continue;
            }
            queries.push((name, provider, wanted));
        }

        let semaphore = &self.semaphore;
        let results = join_all(queries.into_iter().map(|(name, provider, wanted)| async move {
            let outcome = match semaphore.acquire().await {
                Ok(_permit) => provider.list_subtitles(video, &wanted).await,
                Err(e) => Err(ProviderError::Other(e.to_string())),
            };
            (name, outcome)
        }))
        .await;

        let mut subtitles = Vec::new();
        for (name, outcome) in results {
            match outcome {
                Ok(found) => {
                    debug!(provider = %name, video = %video, found = found.len(), "listed subtitles");
                    subtitles.extend(found);
                }
                Err(e) if e.is_discard() => self.discard(&name, &e),
                Err(e) => warn!(provider = %name, video = %video, error = %e, "provider query failed"),
            }
        }

        info!(video = %video, subtitles = subtitles.len(), "subtitles listed");
        subtitles
    }

    /// Download `subtitle` through its provider. Any failure discards the
    /// provider and returns `false`.
    pub async fn download_subtitle(&mut self, subtitle: &mut Subtitle) -> bool {
        let name = subtitle.provider_name.clone();
        let Some(provider) = self.provider(&name).await else {
            return false;
        };

        let result = match self.semaphore.acquire().await {
            Ok(_permit) => provider.download_subtitle(subtitle).await,
            Err(e) => Err(ProviderError::Other(e.to_string())),
        };
        if let Err(e) = result {
            self.discard(&name, &e);
            return false;
        }

        if !subtitle.is_valid() {
            warn!(provider = %name, id = %subtitle.id, "downloaded subtitle is invalid");
            subtitle.content = None;
            return false;
        }
        true
    }

    /// Download the best subtitle per language, highest score first.
    ///
    /// Subtitles scoring below `min_score` are skipped. Stops once every
    /// language in `languages` is covered, or after the first download when
    /// `only_one` is set.
    pub async fn download_best_subtitles(
        &mut self,
        subtitles: Vec<Subtitle>,
        video: &Video,
        languages: &LanguageSet,
        min_score: u32,
        hearing_impaired: Option<bool>,
        only_one: bool,
    ) -> Vec<Subtitle> {
        let mut scored: Vec<(u32, Subtitle)> = subtitles
            .into_iter()
            .map(|s| (compute_score(&s, video, hearing_impaired), s))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut downloaded: Vec<Subtitle> = Vec::new();
        for (score, mut subtitle) in scored {
            if score < min_score {
                debug!(video = %video, score, min_score, "remaining subtitles below score floor");
                break;
            }
            if self.discarded.contains(&subtitle.provider_name) {
                continue;
            }
            if downloaded.iter().any(|d| d.language == subtitle.language) {
                continue;
            }
            if !self.download_subtitle(&mut subtitle).await {
                continue;
            }

            info!(
                video = %video,
                provider = %subtitle.provider_name,
                language = %subtitle.language,
                score,
                "downloaded subtitle"
            );
            downloaded.push(subtitle);

            let covered: LanguageSet = downloaded.iter().map(|d| d.language).collect();
            if only_one || languages.is_subset(&covered) {
                break;
            }
        }
        downloaded
    }

    /// Terminate every initialized provider. Failures are logged.
    pub async fn terminate(&mut self) {
        terminate_all(std::mem::take(&mut self.initialized)).await;
        info!(discarded = self.discarded.len(), "provider pool closed");
    }
}

impl Drop for ProviderPool {
    fn drop(&mut self) {
        if self.initialized.is_empty() {
            return;
        }
        let providers = std::mem::take(&mut self.initialized);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(providers = providers.len(), "provider pool dropped before terminate");
                handle.spawn(terminate_all(providers));
            }
            Err(_) => warn!(
                providers = providers.len(),
                "provider pool dropped outside a runtime, providers left open"
            ),
        }
    }
}

async fn terminate_all(providers: BTreeMap<String, Arc<dyn SubtitleProvider>>) {
    for (name, provider) in providers {
        if let Err(e) = provider.terminate().await {
            warn!(provider = %name, error = %e, "provider failed to terminate");
        }
    }
}
