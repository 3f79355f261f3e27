//! In-process cache backend

use super::TagCache;
use crate::error::CacheError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-lifetime key/value store; clones share the same map
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TagCache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
