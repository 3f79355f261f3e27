//! Tag record model
//!
//! `TagRecord` is both the HTTP response element and the cache value, so
//! its serde shape is the wire format: text fields serialize as strings or
//! `null`, cover art as standard base64 under `album_art`, and the source
//! URL under `url`.

use serde::{Deserialize, Serialize};

/// Metadata extracted from one audio file's tag, before the source URL is known
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub album: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    /// Raw bytes of the first embedded image
    pub album_art: Option<Vec<u8>>,
}

impl TagFields {
    /// Attach the URL the tag was read from
    pub fn into_record(self, source_url: impl Into<String>) -> TagRecord {
        TagRecord {
            album: self.album,
            artist: self.artist,
            title: self.title,
            year: self.year,
            album_art: self.album_art,
            source_url: source_url.into(),
        }
    }
}

/// Resolved metadata for one playlist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub album: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
    #[serde(default, with = "base64_art")]
    pub album_art: Option<Vec<u8>>,
    #[serde(rename = "url")]
    pub source_url: String,
}

/// Normalize a raw tag text value: blank strings count as absent
pub fn non_empty(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

mod base64_art {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(art: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match art {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
            .transpose()
    }
}
