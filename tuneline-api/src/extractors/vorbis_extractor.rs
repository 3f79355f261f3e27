//! FLAC / Vorbis comment extractor
//!
//! FLAC keeps its metadata in a chain of blocks after the `fLaC` marker;
//! each block header carries its length and a last-block flag. The chain is
//! walked on every attempt and lofty only parses once the last block is
//! fully buffered.

use super::{screen_art, ArtOutcome, ContainerExtent};
use crate::types::{TagExtractor, TagFormat, TagResult};
use lofty::config::ParseOptions;
use lofty::file::{FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, TagType};
use std::io::Cursor;
use tracing::debug;
use tuneline_common::config::InvalidArtPolicy;
use tuneline_common::models::non_empty;
use tuneline_common::TagFields;

const FLAC_MAGIC: &[u8; 4] = b"fLaC";
const BLOCK_HEADER_LEN: usize = 4;
const LAST_BLOCK_FLAG: u8 = 0x80;
/// Block type 127 is reserved as invalid
const INVALID_BLOCK_TYPE: u8 = 0x7F;

/// Extracts Vorbis comments and the first PICTURE block from FLAC files
pub struct VorbisExtractor {
    art_policy: InvalidArtPolicy,
}

impl VorbisExtractor {
    pub fn new(art_policy: InvalidArtPolicy) -> Self {
        Self { art_policy }
    }
}

impl Default for VorbisExtractor {
    fn default() -> Self {
        Self::new(InvalidArtPolicy::default())
    }
}

/// Walk the metadata block chain to find where audio frames begin
pub(crate) fn flac_metadata_extent(data: &[u8]) -> ContainerExtent {
    if data.len() < FLAC_MAGIC.len() {
        return ContainerExtent::Incomplete;
    }
    if &data[..4] != FLAC_MAGIC {
        return ContainerExtent::Malformed;
    }

    let mut offset = FLAC_MAGIC.len();
    loop {
        let Some(header) = data.get(offset..offset + BLOCK_HEADER_LEN) else {
            return ContainerExtent::Incomplete;
        };
        if header[0] & !LAST_BLOCK_FLAG == INVALID_BLOCK_TYPE {
            return ContainerExtent::Malformed;
        }

        let is_last = header[0] & LAST_BLOCK_FLAG != 0;
        let block_len = (usize::from(header[1]) << 16) | (usize::from(header[2]) << 8) | usize::from(header[3]);
        offset += BLOCK_HEADER_LEN + block_len;

        if offset > data.len() {
            return ContainerExtent::Incomplete;
        }
        if is_last {
            return ContainerExtent::Complete(offset);
        }
    }
}

impl TagExtractor for VorbisExtractor {
    fn format(&self) -> TagFormat {
        TagFormat::FlacVorbis
    }

    fn detect(&self, prefix: &[u8]) -> bool {
        prefix.starts_with(FLAC_MAGIC)
    }

    fn extract(&self, data: &[u8]) -> TagResult {
        let end = match flac_metadata_extent(data) {
            ContainerExtent::Complete(end) => end,
            ContainerExtent::Incomplete => return TagResult::Pending,
            ContainerExtent::Malformed => return TagResult::NotThisFormat,
        };

        // Only the metadata blocks are handed to lofty; stream properties
        // would need audio frames we have not downloaded
        let options = ParseOptions::new().read_properties(false);
        let tagged_file = match Probe::with_file_type(Cursor::new(&data[..end]), FileType::Flac)
            .options(options)
            .read()
        {
            Ok(file) => file,
            Err(err) => {
                debug!(error = %err, metadata_bytes = end, "FLAC metadata could not be parsed");
                return TagResult::NotThisFormat;
            }
        };

        // No comment block: never emit an empty record, the stream runs out
        // and the resolver reports an incomplete tag
        let Some(tag) = tagged_file.tag(TagType::VorbisComments) else {
            debug!(metadata_bytes = end, "FLAC metadata has no Vorbis comments");
            return TagResult::Pending;
        };

        let album_art = match tag.pictures().first() {
            Some(picture) => {
                let mime = picture.mime_type().map(|m| m.as_str()).unwrap_or_default();
                match screen_art(picture.data(), mime, self.art_policy) {
                    ArtOutcome::Valid(bytes) => Some(bytes),
                    ArtOutcome::Dropped => None,
                    ArtOutcome::AwaitMore => return TagResult::Pending,
                }
            }
            None => None,
        };

        let fields = TagFields {
            album: tag.album().and_then(|v| non_empty(v.into_owned())),
            artist: tag.artist().and_then(|v| non_empty(v.into_owned())),
            title: tag.title().and_then(|v| non_empty(v.into_owned())),
            year: tag.get_string(&ItemKey::RecordingDate).and_then(non_empty),
            album_art,
        };

        debug!(
            metadata_bytes = end,
            title = ?fields.title,
            has_art = fields.album_art.is_some(),
            "Vorbis comments extracted"
        );

        TagResult::Complete(fields)
    }
}
