//! Core types and the tag extractor trait
//!
//! An extractor owns one tag container format. The streaming resolver calls
//! `detect` once on the first bytes of a download, then `extract` on the
//! whole buffer after every received chunk until the result is terminal.

use std::fmt;
use tuneline_common::TagFields;

/// Tag container format, locked once per download from its magic prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFormat {
    /// No extractor has claimed the stream yet
    Unknown,
    /// ID3v2 tag at the start of the file (`ID3`)
    Id3v2,
    /// Vorbis comments inside FLAC metadata blocks (`fLaC`)
    FlacVorbis,
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagFormat::Unknown => "unknown",
            TagFormat::Id3v2 => "ID3v2",
            TagFormat::FlacVorbis => "FLAC/Vorbis",
        };
        f.write_str(name)
    }
}

/// Outcome of one extraction attempt against the bytes buffered so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagResult {
    /// The tag container is not fully buffered yet
    Pending,
    /// A complete tag was read
    Complete(TagFields),
    /// The buffered bytes are not a readable container of this format
    NotThisFormat,
}

/// A tag format the streaming resolver can dispatch to
///
/// # Example
/// ```rust,ignore
/// struct ApeExtractor;
///
/// impl TagExtractor for ApeExtractor {
///     fn format(&self) -> TagFormat { TagFormat::Unknown }
///     fn detect(&self, prefix: &[u8]) -> bool { prefix.starts_with(b"APET") }
///     fn extract(&self, data: &[u8]) -> TagResult { TagResult::Pending }
/// }
/// ```
pub trait TagExtractor: Send + Sync {
    /// Format this extractor handles
    fn format(&self) -> TagFormat;

    /// Whether the leading bytes of a file identify this format
    ///
    /// `prefix` holds at most [`MAGIC_PREFIX_LEN`] bytes and may be shorter.
    fn detect(&self, prefix: &[u8]) -> bool;

    /// Attempt to read the tag from everything downloaded so far
    fn extract(&self, data: &[u8]) -> TagResult;
}

/// Number of leading bytes inspected for format detection
pub const MAGIC_PREFIX_LEN: usize = 4;
