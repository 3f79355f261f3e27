//! Cache collaborators
//!
//! Keys are track URLs (value: one JSON `TagRecord`) or playlist URLs
//! (value: JSON array of records). Entries are immutable once written, so
//! `set` is a plain idempotent overwrite.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::error::CacheError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tuneline_common::config::{CacheBackend, CacheConfig};

/// Key to JSON-blob store
#[async_trait]
pub trait TagCache: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;
}

/// Look up and decode a cached value
///
/// Any failure is logged and reported as a miss; the caller falls back to
/// the network.
pub async fn load_json<T: DeserializeOwned>(cache: &dyn TagCache, key: &str) -> Option<T> {
    match lookup(cache, key).await {
        Ok(Some(value)) => {
            debug!(key = %key, "Cache hit");
            Some(value)
        }
        Ok(None) => {
            debug!(key = %key, "Cache miss");
            None
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Cache read failed, continuing uncached");
            None
        }
    }
}

/// Encode and store a value; failures are logged and swallowed
pub async fn store_json<T: Serialize + ?Sized>(cache: &dyn TagCache, key: &str, value: &T) {
    match encode_and_set(cache, key, value).await {
        Ok(()) => debug!(key = %key, "Cache entry written"),
        Err(e) => warn!(key = %key, error = %e, "Cache write failed, continuing uncached"),
    }
}

async fn lookup<T: DeserializeOwned>(cache: &dyn TagCache, key: &str) -> Result<Option<T>, CacheError> {
    if !cache.exists(key).await? {
        return Ok(None);
    }
    match cache.get(key).await? {
        Some(blob) => Ok(Some(serde_json::from_slice(&blob)?)),
        None => Ok(None),
    }
}

async fn encode_and_set<T: Serialize + ?Sized>(cache: &dyn TagCache, key: &str, value: &T) -> Result<(), CacheError> {
    let blob = serde_json::to_vec(value)?;
    cache.set(key, blob).await
}

/// Open the configured cache backend
///
/// Returns `None` when caching is disabled, or when the backend cannot be
/// opened (the service then runs uncached).
pub async fn open_cache(config: &CacheConfig) -> Option<Arc<dyn TagCache>> {
    if !config.enabled {
        info!("Cache disabled");
        return None;
    }

    match config.backend {
        CacheBackend::Memory => {
            info!("Using in-memory cache");
            Some(Arc::new(MemoryCache::new()))
        }
        CacheBackend::Sqlite => {
            let path = config.database_path();
            match SqliteCache::open(&path).await {
                Ok(cache) => {
                    info!("Using SQLite cache at {}", path.display());
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    warn!("Failed to open SQLite cache at {}: {} (running uncached)", path.display(), e);
                    None
                }
            }
        }
    }
}
