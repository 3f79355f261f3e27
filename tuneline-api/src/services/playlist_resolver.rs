//! Playlist resolver
//!
//! Splits a playlist document into track URLs and resolves each one through
//! the cache or the streaming tag resolver. Tracks may be resolved
//! concurrently, but results are always assembled in document order and the
//! first failing track (in document order) fails the whole playlist.

use crate::cache::{load_json, store_json, TagCache};
use crate::error::ResolveError;
use crate::services::audio_source::{fetch_text, AudioSource};
use crate::services::tag_resolver::StreamingTagResolver;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info};
use tuneline_common::TagRecord;

/// Track URLs in document order; `#` comments and blank lines are skipped
pub fn parse_playlist_document(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Per-request cache switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Read and write per-track entries
    pub use_cache: bool,
    /// Also read and write the assembled list under the playlist URL
    pub cache_playlists: bool,
}

impl ResolveOptions {
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            cache_playlists: false,
        }
    }
}

pub struct PlaylistResolver {
    source: Arc<dyn AudioSource>,
    tag_resolver: StreamingTagResolver,
    cache: Option<Arc<dyn TagCache>>,
    max_concurrent: usize,
}

impl PlaylistResolver {
    pub fn new(
        source: Arc<dyn AudioSource>,
        tag_resolver: StreamingTagResolver,
        cache: Option<Arc<dyn TagCache>>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            source,
            tag_resolver,
            cache,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    fn cache_for(&self, opts: &ResolveOptions) -> Option<&dyn TagCache> {
        if opts.use_cache {
            self.cache.as_deref()
        } else {
            None
        }
    }

    /// Fetch the playlist at `url` and resolve every track it lists
    pub async fn resolve_playlist_url(&self, url: &str, opts: &ResolveOptions) -> Result<Vec<TagRecord>, ResolveError> {
        let cache = self.cache_for(opts);

        // Stored lists are served whenever the cache is on; only writing
        // them depends on `cache_playlists`
        if let Some(cache) = cache {
            if let Some(records) = load_json::<Vec<TagRecord>>(cache, url).await {
                info!(url = %url, tracks = records.len(), "Playlist served from cache");
                return Ok(records);
            }
        }

        let document = fetch_text(self.source.as_ref(), url, self.tag_resolver.chunk_size()).await?;
        let records = self.resolve_playlist(&document, opts).await?;

        if let Some(cache) = cache.filter(|_| opts.cache_playlists) {
            store_json(cache, url, &records).await;
        }

        info!(url = %url, tracks = records.len(), "Playlist resolved");
        Ok(records)
    }

    /// Resolve every track of an already fetched playlist document
    pub async fn resolve_playlist(&self, document: &str, opts: &ResolveOptions) -> Result<Vec<TagRecord>, ResolveError> {
        let urls = parse_playlist_document(document);
        debug!(tracks = urls.len(), concurrency = self.max_concurrent, "Resolving playlist tracks");

        stream::iter(urls)
            .map(|url| self.resolve_track(url, opts))
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }

    async fn resolve_track(&self, url: String, opts: &ResolveOptions) -> Result<TagRecord, ResolveError> {
        let cache = self.cache_for(opts);

        if let Some(cache) = cache {
            if let Some(record) = load_json::<TagRecord>(cache, &url).await {
                return Ok(record);
            }
        }

        let record = self.tag_resolver.resolve(&url).await?;

        if let Some(cache) = cache {
            store_json(cache, &url, &record).await;
        }

        Ok(record)
    }
}
