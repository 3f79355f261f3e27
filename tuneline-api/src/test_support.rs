//! Shared fixtures for unit tests: synthetic tagged files and an in-memory
//! audio source that records how much of each body was read.

use crate::error::DownloadError;
use crate::services::audio_source::{AudioSource, ChunkStream};
use async_trait::async_trait;
use bytes::Bytes;
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Timestamp, Version};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const FLAC_BLOCK_STREAMINFO: u8 = 0;
pub const FLAC_BLOCK_PADDING: u8 = 1;
pub const FLAC_BLOCK_VORBIS_COMMENT: u8 = 4;
pub const FLAC_BLOCK_PICTURE: u8 = 6;

pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9]
}

pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    data.extend_from_slice(&[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82]);
    data
}

/// ID3v2.4 tag with the four text fields and optional cover art
pub fn id3_tag(title: &str, artist: &str, album: &str, year: i32, art: Option<(&str, Vec<u8>)>) -> Vec<u8> {
    let mut tag = Tag::new();
    tag.set_title(title);
    tag.set_artist(artist);
    tag.set_album(album);
    tag.set_date_recorded(Timestamp {
        year,
        month: None,
        day: None,
        hour: None,
        minute: None,
        second: None,
    });
    if let Some((mime, data)) = art {
        tag.add_picture(Picture {
            mime_type: mime.to_string(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data,
        });
    }

    let mut out = Vec::new();
    tag.write_to(&mut out, Version::Id3v24).unwrap();
    out
}

/// Fake MPEG frame data following a tag
pub fn audio_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn flac_block(block_type: u8, last: bool, content: &[u8]) -> Vec<u8> {
    let len = content.len() as u32;
    let mut out = vec![
        if last { 0x80 | block_type } else { block_type },
        (len >> 16) as u8,
        (len >> 8) as u8,
        len as u8,
    ];
    out.extend_from_slice(content);
    out
}

pub fn flac_streaminfo() -> Vec<u8> {
    let mut info = vec![0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0];
    info.extend_from_slice(&[0u8; 16]);
    info
}

pub fn vorbis_comment_content(comments: &[(&str, &str)]) -> Vec<u8> {
    let vendor = b"tuneline tests";
    let mut out = Vec::new();
    out.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    out.extend_from_slice(vendor);
    out.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for (key, value) in comments {
        let entry = format!("{}={}", key, value);
        out.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        out.extend_from_slice(entry.as_bytes());
    }
    out
}

pub fn flac_picture_content(mime: &str, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&3u32.to_be_bytes());
    out.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    out.extend_from_slice(mime.as_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    for value in [1u32, 1, 24, 0] {
        out.extend_from_slice(&value.to_be_bytes());
    }
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// FLAC metadata: STREAMINFO, VORBIS_COMMENT, optional PICTURE, PADDING (last)
pub fn flac_metadata(comments: &[(&str, &str)], picture: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut out = b"fLaC".to_vec();
    out.extend(flac_block(FLAC_BLOCK_STREAMINFO, false, &flac_streaminfo()));
    out.extend(flac_block(FLAC_BLOCK_VORBIS_COMMENT, false, &vorbis_comment_content(comments)));
    if let Some((mime, data)) = picture {
        out.extend(flac_block(FLAC_BLOCK_PICTURE, false, &flac_picture_content(mime, data)));
    }
    out.extend(flac_block(FLAC_BLOCK_PADDING, true, &[0u8; 8]));
    out
}

#[derive(Clone)]
enum Scripted {
    Body(Vec<u8>),
    Status(u16),
}

/// In-memory `AudioSource` keyed by URL
#[derive(Clone, Default)]
pub struct ScriptedSource {
    scripts: Arc<Mutex<HashMap<String, Scripted>>>,
    opens: Arc<Mutex<HashMap<String, usize>>>,
    chunks_read: Arc<Mutex<HashMap<String, Arc<AtomicUsize>>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, body: Vec<u8>) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), Scripted::Body(body));
        self
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), Scripted::Status(status));
        self
    }

    /// Number of times `url` was opened
    pub fn opens(&self, url: &str) -> usize {
        self.opens.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Number of chunks handed out for `url`, across all opens
    pub fn chunks_read(&self, url: &str) -> usize {
        self.chunks_read
            .lock()
            .unwrap()
            .get(url)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl AudioSource for ScriptedSource {
    async fn open(&self, url: &str, chunk_size: usize) -> Result<Box<dyn ChunkStream>, DownloadError> {
        *self.opens.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

        let script = self.scripts.lock().unwrap().get(url).cloned();
        match script {
            Some(Scripted::Body(body)) => {
                let counter = self
                    .chunks_read
                    .lock()
                    .unwrap()
                    .entry(url.to_string())
                    .or_default()
                    .clone();
                Ok(Box::new(ScriptedStream {
                    body: Bytes::from(body),
                    position: 0,
                    chunk_size,
                    counter,
                }))
            }
            Some(Scripted::Status(status)) => Err(DownloadError::Status(status)),
            None => Err(DownloadError::Status(404)),
        }
    }
}

struct ScriptedStream {
    body: Bytes,
    position: usize,
    chunk_size: usize,
    counter: Arc<AtomicUsize>,
}

#[async_trait]
impl ChunkStream for ScriptedStream {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, DownloadError> {
        if self.position >= self.body.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk_size).min(self.body.len());
        let chunk = self.body.slice(self.position..end);
        self.position = end;
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(Some(chunk))
    }
}
