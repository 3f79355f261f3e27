//! ID3v2 tag extractor
//!
//! An ID3v2 tag sits at the start of the file and its header declares the
//! tag size, so the extractor knows exactly how many bytes to wait for.
//! Parsing is only attempted once the whole tag is buffered; a tag cut off
//! at a frame boundary would otherwise read as complete with missing frames.

use super::{screen_art, ArtOutcome, ContainerExtent};
use crate::types::{TagExtractor, TagFormat, TagResult};
use id3::{Tag, TagLike};
use std::io::Cursor;
use tracing::{debug, warn};
use tuneline_common::config::InvalidArtPolicy;
use tuneline_common::models::non_empty;
use tuneline_common::TagFields;

const ID3_MAGIC: &[u8; 3] = b"ID3";
const ID3_HEADER_LEN: usize = 10;
const ID3_FOOTER_LEN: usize = 10;
/// Header flag: a 10-byte footer follows the tag (v2.4)
const FLAG_FOOTER_PRESENT: u8 = 0x10;

/// Extracts album/artist/title/date and the first picture from ID3v2 tags
pub struct Id3Extractor {
    art_policy: InvalidArtPolicy,
}

impl Id3Extractor {
    pub fn new(art_policy: InvalidArtPolicy) -> Self {
        Self { art_policy }
    }
}

impl Default for Id3Extractor {
    fn default() -> Self {
        Self::new(InvalidArtPolicy::default())
    }
}

/// Locate the end of the ID3v2 tag from its header
pub(crate) fn id3v2_extent(data: &[u8]) -> ContainerExtent {
    if data.len() < ID3_HEADER_LEN {
        return ContainerExtent::Incomplete;
    }
    if &data[..3] != ID3_MAGIC {
        return ContainerExtent::Malformed;
    }

    let major = data[3];
    let flags = data[5];
    let size_bytes = &data[6..10];
    if !(2..=4).contains(&major) || size_bytes.iter().any(|b| b & 0x80 != 0) {
        return ContainerExtent::Malformed;
    }

    // Synchsafe integer: 7 significant bits per byte
    let body_len = size_bytes
        .iter()
        .fold(0usize, |acc, &b| (acc << 7) | usize::from(b));
    let footer_len = if major == 4 && flags & FLAG_FOOTER_PRESENT != 0 {
        ID3_FOOTER_LEN
    } else {
        0
    };

    let end = ID3_HEADER_LEN + body_len + footer_len;
    if data.len() >= end {
        ContainerExtent::Complete(end)
    } else {
        ContainerExtent::Incomplete
    }
}

/// Release date, then original release, then recording date, then year
fn best_date(tag: &Tag) -> Option<String> {
    tag.date_released()
        .or_else(|| tag.original_date_released())
        .or_else(|| tag.date_recorded())
        .map(|timestamp| timestamp.to_string())
        .or_else(|| tag.year().map(|year| year.to_string()))
}

impl TagExtractor for Id3Extractor {
    fn format(&self) -> TagFormat {
        TagFormat::Id3v2
    }

    fn detect(&self, prefix: &[u8]) -> bool {
        prefix.starts_with(ID3_MAGIC)
    }

    fn extract(&self, data: &[u8]) -> TagResult {
        let end = match id3v2_extent(data) {
            ContainerExtent::Complete(end) => end,
            ContainerExtent::Incomplete => return TagResult::Pending,
            ContainerExtent::Malformed => return TagResult::NotThisFormat,
        };

        let tag = match Tag::read_from2(Cursor::new(&data[..end])) {
            Ok(tag) => tag,
            Err(err) => match err.partial_tag {
                Some(tag) => {
                    warn!(error = %err.description, "ID3v2 tag partially readable, using recovered frames");
                    tag
                }
                None => {
                    debug!(error = %err.description, tag_bytes = end, "ID3v2 tag could not be parsed");
                    return TagResult::NotThisFormat;
                }
            },
        };

        let album_art = match tag.pictures().next() {
            Some(picture) => match screen_art(&picture.data, &picture.mime_type, self.art_policy) {
                ArtOutcome::Valid(bytes) => Some(bytes),
                ArtOutcome::Dropped => None,
                ArtOutcome::AwaitMore => return TagResult::Pending,
            },
            None => None,
        };

        let fields = TagFields {
            album: tag.album().and_then(non_empty),
            artist: tag.artist().and_then(non_empty),
            title: tag.title().and_then(non_empty),
            year: best_date(&tag).and_then(non_empty),
            album_art,
        };

        debug!(
            tag_bytes = end,
            title = ?fields.title,
            has_art = fields.album_art.is_some(),
            "ID3v2 tag extracted"
        );

        TagResult::Complete(fields)
    }
}
