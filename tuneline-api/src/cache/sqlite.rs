//! SQLite cache backend
//!
//! Persists entries across restarts in a single `cache_entries` table.

use super::TagCache;
use crate::error::CacheError;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    /// Open (creating if needed) the cache database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self, CacheError> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Backend(format!("{}: {}", parent.display(), e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to cache database: {}", db_url);

        let pool = SqlitePoolOptions::new().max_connections(5).connect(&db_url).await?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        if newly_created {
            info!("Initialized new cache database: {}", db_path.display());
        } else {
            info!("Opened existing cache database: {}", db_path.display());
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl TagCache for SqliteCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let value: Option<Vec<u8>> = sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        sqlx::query("INSERT OR REPLACE INTO cache_entries (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
