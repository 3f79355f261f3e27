//! Remote audio source
//!
//! The resolver only needs a status check and sequential access to the body
//! in bounded chunks. `HttpSource` streams with reqwest and regroups network
//! frames into pieces of exactly `chunk_size` bytes (the final piece may be
//! shorter). Dropping a `ChunkStream` closes the connection, which is how a
//! download is abandoned once a tag is complete.

use crate::error::DownloadError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tracing::debug;
use tuneline_common::config::FetchConfig;

const USER_AGENT: &str = concat!("tuneline/", env!("CARGO_PKG_VERSION"));

/// Anything that can serve a URL as a chunked byte stream
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Start a streaming download
    ///
    /// # Errors
    /// `DownloadError::Status` for a non-success response, `Timeout` or
    /// `Transport` when the request cannot be made.
    async fn open(&self, url: &str, chunk_size: usize) -> Result<Box<dyn ChunkStream>, DownloadError>;
}

/// Sequential reader over one response body
#[async_trait]
pub trait ChunkStream: Send {
    /// Next chunk of at most `chunk_size` bytes, `None` at end of body
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DownloadError>;
}

/// Read a whole resource as text (used for playlist documents)
pub async fn fetch_text(
    source: &dyn AudioSource,
    url: &str,
    chunk_size: usize,
) -> Result<String, DownloadError> {
    let mut stream = source.open(url, chunk_size).await?;
    let mut body = Vec::new();
    while let Some(chunk) = stream.next_chunk().await? {
        body.extend_from_slice(&chunk);
    }
    debug!(url = %url, bytes = body.len(), "Fetched text document");
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// reqwest-backed audio source
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpSource {
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| DownloadError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            connect_timeout,
            read_timeout,
        })
    }

    pub fn from_config(fetch: &FetchConfig) -> Result<Self, DownloadError> {
        Self::new(
            Duration::from_millis(fetch.connect_timeout_ms),
            Duration::from_millis(fetch.read_timeout_ms),
        )
    }
}

#[async_trait]
impl AudioSource for HttpSource {
    async fn open(&self, url: &str, chunk_size: usize) -> Result<Box<dyn ChunkStream>, DownloadError> {
        let response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| DownloadError::Timeout(self.read_timeout))?
            .map_err(|e| DownloadError::from_reqwest(e, self.connect_timeout))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Remote responded with error status");
            return Err(DownloadError::Status(status.as_u16()));
        }

        Ok(Box::new(HttpChunkStream {
            response,
            chunk_size: chunk_size.max(1),
            read_timeout: self.read_timeout,
            pending: BytesMut::new(),
            finished: false,
        }))
    }
}

struct HttpChunkStream {
    response: reqwest::Response,
    chunk_size: usize,
    read_timeout: Duration,
    pending: BytesMut,
    finished: bool,
}

#[async_trait]
impl ChunkStream for HttpChunkStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DownloadError> {
        while self.pending.len() < self.chunk_size && !self.finished {
            let frame = tokio::time::timeout(self.read_timeout, self.response.chunk())
                .await
                .map_err(|_| DownloadError::Timeout(self.read_timeout))?
                .map_err(|e| DownloadError::from_reqwest(e, self.read_timeout))?;

            match frame {
                Some(bytes) => self.pending.extend_from_slice(&bytes),
                None => self.finished = true,
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }

        let take = self.pending.len().min(self.chunk_size);
        Ok(Some(self.pending.split_to(take).freeze()))
    }
}
