//! Embedded cover art validation
//!
//! Structural check only: the claimed MIME type must agree with the image's
//! leading signature and trailing end marker. A cover image truncated by a
//! partial download fails the trailer check.

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
/// PNG file signature
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// IEND chunk type and CRC, always the last 8 bytes of a PNG
const PNG_IEND_TRAILER: [u8; 8] = [0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82];

/// Check that `data` is a structurally complete image of type `claimed_mime`
///
/// Only `image/jpeg` and `image/png` are accepted; any other MIME type, or a
/// buffer too short to hold the signature and trailer, is not a match.
pub fn validate_image(data: &[u8], claimed_mime: &str) -> bool {
    match claimed_mime {
        "image/jpeg" => data.starts_with(&JPEG_SOI) && data.ends_with(&JPEG_EOI),
        "image/png" => data.starts_with(&PNG_SIGNATURE) && data.ends_with(&PNG_IEND_TRAILER),
        _ => false,
    }
}
