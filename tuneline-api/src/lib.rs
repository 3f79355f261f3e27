//! tuneline-api library interface
//!
//! Resolves remote playlists to per-track tag metadata, downloading only as
//! much of each audio file as its tag needs.

pub mod api;
pub mod cache;
pub mod error;
pub mod extractors;
pub mod services;
pub mod types;

#[cfg(test)]
mod test_support;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::PlaylistResolver;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub playlists: Arc<PlaylistResolver>,
    /// A cache backend is configured and open
    pub cache_enabled: bool,
    /// Whole playlists are cached under their own URL
    pub cache_playlists: bool,
    pub startup_time: DateTime<Utc>,
    /// Last resolution failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(playlists: PlaylistResolver, cache_playlists: bool) -> Self {
        let cache_enabled = playlists.has_cache();
        Self {
            playlists: Arc::new(playlists),
            cache_enabled,
            cache_playlists,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::playlist_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
