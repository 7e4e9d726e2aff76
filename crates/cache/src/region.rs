//! Key/value cache region for provider metadata lookups.
//!
//! Values are JSON documents stored in SQLite under a SHA-256 of their key.
//! Entries older than the region expiration are treated as missing.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::CacheError;
use crate::lock::{FileLock, LockFactory, LockGuard, LockMode, MutexLock};

pub const DEFAULT_CACHE_FILE: &str = "subfetch.cache.db";
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Clone)]
pub struct RegionConfig {
    pub path: PathBuf,
    pub expiration: Duration,
    pub lock_factory: LockFactory,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            expiration: DEFAULT_EXPIRATION,
            lock_factory: MutexLock::factory,
        }
    }
}

impl RegionConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

pub struct CacheRegion {
    pool: SqlitePool,
    lock: Arc<dyn FileLock>,
    expiration: Duration,
    path: PathBuf,
}

impl CacheRegion {
    pub async fn open(config: &RegionConfig) -> Result<Self, CacheError> {
        let pool = crate::connect(&config.path).await?;
        crate::migrate::run(&pool).await?;
        info!(
            path = %config.path.display(),
            expiration_secs = config.expiration.as_secs(),
            "cache region opened"
        );

        Ok(Self {
            pool,
            lock: (config.lock_factory)(&config.path),
            expiration: config.expiration,
            path: config.path.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn guard(&self, mode: LockMode) -> Result<LockGuard, CacheError> {
        LockGuard::acquire(&self.lock, mode)
            .await
            .map_err(CacheError::Lock)
    }

    /// Fetch a value; expired or missing entries yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let _guard = self.guard(LockMode::Read).await?;

        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, created_ts FROM cache_entry WHERE key = ?")
                .bind(mangle_key(key))
                .fetch_optional(&self.pool)
                .await?;

        let Some((value, created_ts)) = row else {
            return Ok(None);
        };

        if self.is_expired(created_ts) {
            debug!(key, "cache entry expired");
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&value)?))
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let now = chrono::Utc::now().timestamp();
        let _guard = self.guard(LockMode::Write).await?;

        sqlx::query(
            "INSERT INTO cache_entry (key, value, created_ts) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, created_ts = excluded.created_ts",
        )
        .bind(mangle_key(key))
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let _guard = self.guard(LockMode::Write).await?;
        let result = sqlx::query("DELETE FROM cache_entry WHERE key = ?")
            .bind(mangle_key(key))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return the cached value or compute, store and return a fresh one.
    pub async fn get_or_create<T, E, F, Fut>(&self, key: &str, creator: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await? {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        let value = creator().await?;
        self.set(key, &value).await?;
        Ok(value)
    }

    /// Delete expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let cutoff = chrono::Utc::now().timestamp() - self.expiration.as_secs() as i64;
        let _guard = self.guard(LockMode::Write).await?;
        let result = sqlx::query("DELETE FROM cache_entry WHERE created_ts < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn is_expired(&self, created_ts: i64) -> bool {
        let age = chrono::Utc::now().timestamp() - created_ts;
        age > self.expiration.as_secs() as i64
    }
}

fn mangle_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

// ─── Process-wide region ─────────────────────────────────────────────────────

static GLOBAL: OnceCell<CacheRegion> = OnceCell::const_new();

/// Configure the process-wide region. Later calls return the first region
/// and ignore their config.
pub async fn configure_global(config: &RegionConfig) -> Result<&'static CacheRegion, CacheError> {
    GLOBAL.get_or_try_init(|| CacheRegion::open(config)).await
}

pub fn is_configured() -> bool {
    GLOBAL.initialized()
}

pub fn global() -> Result<&'static CacheRegion, CacheError> {
    GLOBAL.get().ok_or(CacheError::NotConfigured)
}

/// Close the process-wide region's connections. Call once at process exit.
pub async fn close_global() {
    if let Some(region) = GLOBAL.get() {
        region.close().await;
        info!("cache region closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_hashed() {
        let k = mangle_key("tmdb.search_movie|Inception|2010");
        assert_eq!(k.len(), 64);
        assert_ne!(k, mangle_key("tmdb.search_movie|Inception|2011"));
    }
}
