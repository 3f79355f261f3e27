//! Tag extractors and format registration
//!
//! Extractors are registered in priority order; detection walks the
//! registry and the first extractor whose `detect` accepts the magic prefix
//! is locked in for the rest of the download.

pub mod id3_extractor;
pub mod vorbis_extractor;

pub use id3_extractor::Id3Extractor;
pub use vorbis_extractor::VorbisExtractor;

use crate::services::image_validator::validate_image;
use crate::types::{TagExtractor, MAGIC_PREFIX_LEN};
use std::sync::Arc;
use tracing::warn;
use tuneline_common::config::InvalidArtPolicy;

/// Ordered set of extractors consulted during format detection
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn TagExtractor>>,
}

impl ExtractorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in ID3v2 and FLAC/Vorbis extractors
    pub fn with_defaults(art_policy: InvalidArtPolicy) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Id3Extractor::new(art_policy)));
        registry.register(Arc::new(VorbisExtractor::new(art_policy)));
        registry
    }

    /// Append an extractor; earlier registrations win detection ties
    pub fn register(&mut self, extractor: Arc<dyn TagExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find the extractor claiming this file, from its first bytes
    pub fn detect(&self, data: &[u8]) -> Option<Arc<dyn TagExtractor>> {
        let prefix = &data[..data.len().min(MAGIC_PREFIX_LEN)];
        self.extractors
            .iter()
            .find(|extractor| extractor.detect(prefix))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

/// How far into the file a tag container reaches, given the bytes so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerExtent {
    /// More bytes are needed before the end of the container is known
    Incomplete,
    /// The container ends at this byte offset and is fully buffered
    Complete(usize),
    /// The container header is invalid
    Malformed,
}

/// Result of screening an embedded picture
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ArtOutcome {
    Valid(Vec<u8>),
    /// Picture failed validation and the policy discards it
    Dropped,
    /// Picture failed validation and the policy waits for more data
    AwaitMore,
}

/// Validate an embedded picture against its declared MIME type
pub(crate) fn screen_art(data: &[u8], mime: &str, policy: InvalidArtPolicy) -> ArtOutcome {
    if validate_image(data, mime) {
        return ArtOutcome::Valid(data.to_vec());
    }

    match policy {
        InvalidArtPolicy::Drop => {
            warn!(mime = %mime, bytes = data.len(), "Embedded image failed validation, dropping it");
            ArtOutcome::Dropped
        }
        InvalidArtPolicy::Wait => {
            warn!(mime = %mime, bytes = data.len(), "Embedded image failed validation, waiting for more data");
            ArtOutcome::AwaitMore
        }
    }
}
