//! Streaming tag resolver
//!
//! Downloads a remote audio file chunk by chunk and re-runs tag extraction
//! after every chunk, stopping the download as soon as a complete tag has
//! been read. The format is locked from the first chunk's magic bytes and
//! never re-evaluated.
//!
//! ```text
//! AwaitingMagic --ID3/fLaC--> Streaming(extractor) --Complete--> done
//!       |                          |  Pending: next chunk
//!       +--no match--> Failed      +--NotThisFormat / end of stream--> Failed
//! ```

use crate::error::ResolveError;
use crate::extractors::ExtractorRegistry;
use crate::services::audio_source::AudioSource;
use crate::types::{TagExtractor, TagFormat, TagResult};
use std::sync::Arc;
use tracing::{debug, info};
use tuneline_common::TagRecord;

/// Buffer for one in-flight download, discarded when resolution ends
#[derive(Debug)]
pub struct DownloadSession {
    url: String,
    buffer: Vec<u8>,
    chunks: usize,
}

impl DownloadSession {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            buffer: Vec::new(),
            chunks: 0,
        }
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        self.chunks += 1;
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Everything received so far
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

enum ResolverState {
    AwaitingMagic,
    Streaming(Arc<dyn TagExtractor>),
}

impl ResolverState {
    fn format(&self) -> TagFormat {
        match self {
            ResolverState::AwaitingMagic => TagFormat::Unknown,
            ResolverState::Streaming(extractor) => extractor.format(),
        }
    }
}

/// Resolves one URL to its tag record with minimal download
#[derive(Clone)]
pub struct StreamingTagResolver {
    source: Arc<dyn AudioSource>,
    registry: Arc<ExtractorRegistry>,
    chunk_size: usize,
}

impl StreamingTagResolver {
    pub fn new(source: Arc<dyn AudioSource>, registry: Arc<ExtractorRegistry>, chunk_size: usize) -> Self {
        Self {
            source,
            registry,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Resolve with the configured chunk size
    pub async fn resolve(&self, url: &str) -> Result<TagRecord, ResolveError> {
        self.resolve_with_chunk_size(url, self.chunk_size).await
    }

    /// Resolve `url`, reading its body `chunk_size` bytes at a time
    ///
    /// # Errors
    /// - `Download` for a non-success status, timeout or transport failure
    /// - `UnrecognizedFormat` when the first bytes match no registered
    ///   extractor, or the locked extractor rejects the content
    /// - `IncompleteTag` when the body ends before a complete tag
    pub async fn resolve_with_chunk_size(&self, url: &str, chunk_size: usize) -> Result<TagRecord, ResolveError> {
        let mut stream = self.source.open(url, chunk_size.max(1)).await?;
        let mut session = DownloadSession::new(url);
        let mut state = ResolverState::AwaitingMagic;

        while let Some(chunk) = stream.next_chunk().await? {
            session.append(&chunk);

            let extractor = match &state {
                ResolverState::Streaming(extractor) => Arc::clone(extractor),
                ResolverState::AwaitingMagic => {
                    let extractor = self.registry.detect(session.bytes()).ok_or_else(|| {
                        debug!(url = %url, "Magic bytes match no supported format");
                        ResolveError::UnrecognizedFormat { url: url.to_string() }
                    })?;
                    debug!(url = %url, format = %extractor.format(), "Tag format detected");
                    state = ResolverState::Streaming(Arc::clone(&extractor));
                    extractor
                }
            };

            match extractor.extract(session.bytes()) {
                TagResult::Complete(fields) => {
                    info!(
                        url = %url,
                        format = %state.format(),
                        bytes = session.bytes().len(),
                        chunks = session.chunks(),
                        "Tag found, stopping download"
                    );
                    return Ok(fields.into_record(session.url()));
                }
                TagResult::Pending => {
                    debug!(
                        url = %url,
                        bytes = session.bytes().len(),
                        "Tag not complete yet, reading next chunk"
                    );
                }
                TagResult::NotThisFormat => {
                    debug!(url = %url, format = %state.format(), "Content does not match locked format");
                    return Err(ResolveError::UnrecognizedFormat { url: url.to_string() });
                }
            }
        }

        Err(ResolveError::IncompleteTag {
            url: url.to_string(),
            bytes: session.bytes().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DownloadError;
    use crate::test_support::{audio_payload, flac_metadata, id3_tag, jpeg_bytes, ScriptedSource};
    use tuneline_common::config::InvalidArtPolicy;

    const URL: &str = "http://a/track";

    fn resolver(source: &ScriptedSource, chunk_size: usize) -> StreamingTagResolver {
        StreamingTagResolver::new(
            Arc::new(source.clone()),
            Arc::new(ExtractorRegistry::with_defaults(InvalidArtPolicy::Drop)),
            chunk_size,
        )
    }

    #[tokio::test]
    async fn test_id3_in_first_chunk_stops_after_one_read() {
        let tag = id3_tag("Title", "Artist", "Album", 2004, Some(("image/jpeg", jpeg_bytes())));
        let chunk_size = tag.len() + 16;
        let mut body = tag;
        body.extend(audio_payload(chunk_size * 20));
        let source = ScriptedSource::new().with_body(URL, body);

        let record = resolver(&source, chunk_size).resolve(URL).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Title"));
        assert_eq!(record.artist.as_deref(), Some("Artist"));
        assert_eq!(record.album.as_deref(), Some("Album"));
        assert_eq!(record.year.as_deref(), Some("2004"));
        assert_eq!(record.album_art, Some(jpeg_bytes()));
        assert_eq!(record.source_url, URL);
        assert_eq!(source.chunks_read(URL), 1);
    }

    #[tokio::test]
    async fn test_id3_spanning_chunks() {
        let tag = id3_tag("Title", "Artist", "Album", 2004, Some(("image/jpeg", jpeg_bytes())));
        let tag_len = tag.len();
        let mut body = tag;
        body.extend(audio_payload(4096));
        let source = ScriptedSource::new().with_body(URL, body);

        let record = resolver(&source, 16).resolve(URL).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Title"));
        assert_eq!(source.chunks_read(URL), tag_len.div_ceil(16));
    }

    #[tokio::test]
    async fn test_flac_completes_on_chunk_with_last_block() {
        let metadata = flac_metadata(
            &[("TITLE", "T"), ("ARTIST", "A"), ("ALBUM", "L"), ("DATE", "2010")],
            None,
        );
        let metadata_len = metadata.len();
        assert!(metadata_len > 32);
        let mut body = metadata;
        body.extend(audio_payload(1024));
        let source = ScriptedSource::new().with_body(URL, body);

        let record = resolver(&source, 16).resolve(URL).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("T"));
        assert_eq!(record.year.as_deref(), Some("2010"));
        // Not one chunk earlier, and nothing after the closing block
        assert_eq!(source.chunks_read(URL), metadata_len.div_ceil(16));
    }

    #[tokio::test]
    async fn test_unknown_magic_fails_after_first_chunk() {
        let mut body = vec![0xDE, 0xAD, 0xBE, 0xEF];
        body.extend(audio_payload(256));
        let source = ScriptedSource::new().with_body(URL, body);

        let err = resolver(&source, 16).resolve(URL).await.unwrap_err();

        assert!(matches!(err, ResolveError::UnrecognizedFormat { .. }));
        assert_eq!(source.chunks_read(URL), 1);
    }

    #[tokio::test]
    async fn test_non_success_status_is_download_error() {
        let source = ScriptedSource::new().with_status(URL, 403);

        let err = resolver(&source, 16).resolve(URL).await.unwrap_err();

        assert!(matches!(err, ResolveError::Download(DownloadError::Status(403))));
        assert_eq!(source.chunks_read(URL), 0);
    }

    #[tokio::test]
    async fn test_truncated_file_is_incomplete_tag() {
        let tag = id3_tag("Title", "Artist", "Album", 2004, None);
        let body = tag[..tag.len() - 5].to_vec();
        let body_len = body.len();
        let source = ScriptedSource::new().with_body(URL, body);

        let err = resolver(&source, 8).resolve(URL).await.unwrap_err();

        match err {
            ResolveError::IncompleteTag { url, bytes } => {
                assert_eq!(url, URL);
                assert_eq!(bytes, body_len);
            }
            other => panic!("expected incomplete tag, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_incomplete_tag() {
        let source = ScriptedSource::new().with_body(URL, Vec::new());
        let err = resolver(&source, 8).resolve(URL).await.unwrap_err();
        assert!(matches!(err, ResolveError::IncompleteTag { bytes: 0, .. }));
    }

    #[tokio::test]
    async fn test_malformed_locked_format_is_unrecognized() {
        // Passes ID3 detection but the size field is not synchsafe
        let mut body = b"ID3\x04\x00\x00\xFF\xFF\xFF\xFF".to_vec();
        body.extend(audio_payload(64));
        let source = ScriptedSource::new().with_body(URL, body);

        let err = resolver(&source, 32).resolve(URL).await.unwrap_err();
        assert!(matches!(err, ResolveError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn test_session_accumulates_chunks() {
        let mut session = DownloadSession::new(URL);
        session.append(b"fLa");
        session.append(b"C");
        assert_eq!(session.bytes(), b"fLaC");
        assert_eq!(session.chunks(), 2);
        assert_eq!(session.url(), URL);
    }
}
