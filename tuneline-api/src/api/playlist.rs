//! Playlist metadata endpoint
//!
//! `GET /api/get_playlist_data?url=<playlist-url>[&cache=false]` answers
//! with a JSON array of tag records in playlist order, or `{"error": ...}`.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use tuneline_common::TagRecord;

use crate::error::{ApiError, ApiResult};
use crate::services::ResolveOptions;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    pub url: Option<String>,
    /// `false` bypasses the cache for this request only
    pub cache: Option<String>,
}

impl PlaylistQuery {
    fn cache_requested(&self) -> bool {
        !matches!(self.cache.as_deref(), Some(value) if value.eq_ignore_ascii_case("false"))
    }
}

/// GET /api/get_playlist_data
pub async fn get_playlist_data(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> ApiResult<Json<Vec<TagRecord>>> {
    let url = match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => return Err(ApiError::MissingUrl),
    };

    let use_cache = state.cache_enabled && query.cache_requested();
    let opts = ResolveOptions {
        use_cache,
        cache_playlists: use_cache && state.cache_playlists,
    };
    info!(url = %url, cache = use_cache, "Playlist data requested");

    match state.playlists.resolve_playlist_url(&url, &opts).await {
        Ok(records) => Ok(Json(records)),
        Err(e) => {
            warn!(url = %url, error = %e, "Playlist resolution failed");
            *state.last_error.write().await = Some(e.to_string());
            Err(e.into())
        }
    }
}

pub fn playlist_routes() -> Router<AppState> {
    Router::new().route("/api/get_playlist_data", get(get_playlist_data))
}
