//! Services for tuneline-api

pub mod audio_source;
pub mod image_validator;
pub mod playlist_resolver;
pub mod tag_resolver;

pub use audio_source::{fetch_text, AudioSource, ChunkStream, HttpSource};
pub use image_validator::validate_image;
pub use playlist_resolver::{parse_playlist_document, PlaylistResolver, ResolveOptions};
pub use tag_resolver::{DownloadSession, StreamingTagResolver};
