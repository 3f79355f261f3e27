//! Error types for tuneline-api
//!
//! Resolution failures (`DownloadError`, `ResolveError`) abort the playlist
//! request and surface as a JSON `{"error": ...}` body. `CacheError` never
//! aborts anything: callers log it and continue uncached.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Failure fetching a remote resource
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Remote responded with a non-success status
    #[error("Error downloading the file. Remote server responded with status code {0}")]
    Status(u16),

    /// Connect or read did not complete in time
    #[error("Error downloading the file. Timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or body transfer failure
    #[error("Error downloading the file: {0}")]
    Transport(String),
}

impl DownloadError {
    /// Classify a reqwest failure; `limit` is the timeout that governed the call
    pub fn from_reqwest(err: reqwest::Error, limit: Duration) -> Self {
        if err.is_timeout() {
            DownloadError::Timeout(limit)
        } else {
            DownloadError::Transport(err.to_string())
        }
    }
}

/// Failure resolving the tag of one track
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Magic bytes matched no registered format, or the content contradicted it
    #[error("{url} did not match any supported audio file formats")]
    UnrecognizedFormat { url: String },

    /// Stream ended before a complete tag was read
    #[error("No complete tag found in {url} after {bytes} bytes")]
    IncompleteTag { url: String, bytes: usize },
}

/// Cache collaborator failure
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request carried no `url` query parameter (404)
    #[error("No url provided")]
    MissingUrl,

    /// Playlist resolution failed (200 with an error body)
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingUrl => StatusCode::NOT_FOUND,
            ApiError::Resolve(_) => StatusCode::OK,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
