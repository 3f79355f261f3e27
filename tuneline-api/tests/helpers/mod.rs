//! Shared fixtures for tuneline-api integration tests
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Timestamp, Version};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use tuneline_api::cache::TagCache;
use tuneline_api::extractors::ExtractorRegistry;
use tuneline_api::services::{AudioSource, HttpSource, PlaylistResolver, StreamingTagResolver};
use tuneline_api::{build_router, AppState};
use tuneline_common::config::InvalidArtPolicy;

pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9]
}

/// ID3v2.4-tagged MP3 body: tag with cover art, then filler frames
pub fn tagged_mp3(title: &str, artist: &str, album: &str, year: i32) -> Vec<u8> {
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
    tag.add_picture(Picture {
        mime_type: "image/jpeg".to_string(),
        picture_type: PictureType::CoverFront,
        description: String::new(),
        data: jpeg_bytes(),
    });

    let mut out = Vec::new();
    tag.write_to(&mut out, Version::Id3v24).unwrap();
    out.extend(filler(2048));
    out
}

/// FLAC body: STREAMINFO, VORBIS_COMMENT and a closing PADDING block
pub fn tagged_flac(comments: &[(&str, &str)]) -> Vec<u8> {
    let mut streaminfo = vec![0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0];
    streaminfo.extend_from_slice(&[0u8; 16]);

    let vendor = b"tuneline tests";
    let mut vorbis = Vec::new();
    vorbis.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    vorbis.extend_from_slice(vendor);
    vorbis.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for (key, value) in comments {
        let entry = format!("{}={}", key, value);
        vorbis.extend_from_slice(&(entry.len() as u32).to_le_bytes());
        vorbis.extend_from_slice(entry.as_bytes());
    }

    let mut out = b"fLaC".to_vec();
    out.extend(flac_block(0, false, &streaminfo));
    out.extend(flac_block(4, false, &vorbis));
    out.extend(flac_block(1, true, &[0u8; 8]));
    out.extend(filler(2048));
    out
}

fn flac_block(block_type: u8, last: bool, content: &[u8]) -> Vec<u8> {
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

pub fn filler(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn http_source() -> HttpSource {
    HttpSource::new(Duration::from_secs(2), Duration::from_secs(5)).unwrap()
}

/// Router over a real HTTP source with small chunks
pub fn build_app(cache: Option<Arc<dyn TagCache>>, cache_playlists: bool) -> Router {
    let source: Arc<dyn AudioSource> = Arc::new(http_source());
    let tags = StreamingTagResolver::new(
        Arc::clone(&source),
        Arc::new(ExtractorRegistry::with_defaults(InvalidArtPolicy::Drop)),
        256,
    );
    let playlists = PlaylistResolver::new(source, tags, cache, 1);
    build_router(AppState::new(playlists, cache_playlists))
}

/// Issue a GET and decode the JSON body
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).expect("Should parse JSON"))
}

/// Percent-encode a URL for use as a query parameter value
pub fn encode_query(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}
