use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::{MediaId, OwnerId};

/// Standard alphabet, padding optional. Uploads from older clients were not
/// always padded.
const INLINE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Coarse classification of a MIME type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn of(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// Base64 encoded bytes stored directly on the media document.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlinePayload(String);

impl InlinePayload {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn encode(bytes: &[u8]) -> Self {
        Self(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        let compact: String =
            self.0.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(INLINE_ENGINE.decode(compact.as_bytes())?)
    }
}

// Payloads can be megabytes; never dump them into logs.
impl fmt::Debug for InlinePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InlinePayload")
            .field(&format_args!("{} chars", self.0.len()))
            .finish()
    }
}

/// Where the bytes of a media item live. Exactly one source per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Inline(InlinePayload),
    Remote(String),
}

impl ContentSource {
    pub fn remote_reference(&self) -> Option<&str> {
        match self {
            ContentSource::Remote(url) => Some(url.as_str()),
            ContentSource::Inline(_) => None,
        }
    }
}

/// Authoritative metadata of one uploaded photo or video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: MediaId,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub source: ContentSource,
    pub owner_id: OwnerId,
}

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        MediaKind::of(&self.mime_type)
    }

    pub fn is_image(&self) -> bool {
        self.kind() == MediaKind::Image
    }

    pub fn is_video(&self) -> bool {
        self.kind() == MediaKind::Video
    }
}

/// JSON shape of a media document as served by the remote library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemWire {
    pub id: MediaId,
    pub file_name: String,
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlinePayload>,
    pub user_id: OwnerId,
}

impl TryFrom<MediaItemWire> for MediaItem {
    type Error = ModelError;

    fn try_from(wire: MediaItemWire) -> Result<Self> {
        let remote = wire.download_url.filter(|url| !url.trim().is_empty());
        let source = match (wire.inline_data, remote) {
            (Some(inline), None) => ContentSource::Inline(inline),
            (None, Some(url)) => ContentSource::Remote(url),
            (Some(_), Some(_)) => {
                return Err(ModelError::AmbiguousContentSource { id: wire.id });
            }
            (None, None) => {
                return Err(ModelError::MissingContentSource { id: wire.id });
            }
        };

        Ok(MediaItem {
            id: wire.id,
            file_name: wire.file_name,
            mime_type: wire.file_type,
            byte_size: wire.file_size,
            uploaded_at: wire.uploaded_at,
            source,
            owner_id: wire.user_id,
        })
    }
}

impl From<MediaItem> for MediaItemWire {
    fn from(item: MediaItem) -> Self {
        let (download_url, inline_data) = match item.source {
            ContentSource::Inline(inline) => (None, Some(inline)),
            ContentSource::Remote(url) => (Some(url), None),
        };
        MediaItemWire {
            id: item.id,
            file_name: item.file_name,
            file_type: item.mime_type,
            file_size: item.byte_size,
            uploaded_at: item.uploaded_at,
            download_url,
            inline_data,
            user_id: item.owner_id,
        }
    }
}
