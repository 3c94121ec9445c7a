use std::{fmt, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::ids::MediaId;
use crate::media::{ContentSource, InlinePayload, MediaItem};
use crate::units::ByteSize;

/// A media item materialized into the local cache.
///
/// The payload is written once and never mutated; the next caching cycle
/// replaces the whole generation instead.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedMemory {
    pub id: MediaId,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: u64,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
    /// Remote reference of the originating item, empty for inline sources.
    pub remote_ref: String,
    pub payload: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

impl CachedMemory {
    pub fn from_item(
        item: &MediaItem,
        payload: Vec<u8>,
        cached_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: item.id.clone(),
            file_name: item.file_name.clone(),
            mime_type: item.mime_type.clone(),
            byte_size: item.byte_size,
            uploaded_at: item
                .uploaded_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            remote_ref: item
                .source
                .remote_reference()
                .unwrap_or_default()
                .to_string(),
            payload,
            cached_at,
        }
    }

    pub fn payload_len(&self) -> ByteSize {
        ByteSize::from_usize(self.payload.len())
    }
}

impl fmt::Debug for CachedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedMemory")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("byte_size", &self.byte_size)
            .field("uploaded_at", &self.uploaded_at)
            .field("remote_ref", &self.remote_ref)
            .field("payload_len", &self.payload.len())
            .field("cached_at", &self.cached_at)
            .finish()
    }
}

/// Where the presentation layer gets the bytes of a memory from.
#[derive(Clone, PartialEq, Eq)]
pub enum MemorySource {
    Inline(InlinePayload),
    Remote(String),
    Cached(Arc<[u8]>),
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemorySource::Inline(payload) => {
                f.debug_tuple("Inline").field(payload).finish()
            }
            MemorySource::Remote(url) => {
                f.debug_tuple("Remote").field(url).finish()
            }
            MemorySource::Cached(bytes) => f
                .debug_tuple("Cached")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
        }
    }
}

/// One resurfaced item as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub id: MediaId,
    pub file_name: String,
    pub mime_type: String,
    pub byte_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub source: MemorySource,
}

impl Memory {
    pub fn is_cached(&self) -> bool {
        matches!(self.source, MemorySource::Cached(_))
    }
}

impl From<&MediaItem> for Memory {
    fn from(item: &MediaItem) -> Self {
        let source = match &item.source {
            ContentSource::Inline(payload) => {
                MemorySource::Inline(payload.clone())
            }
            ContentSource::Remote(url) => MemorySource::Remote(url.clone()),
        };
        Memory {
            id: item.id.clone(),
            file_name: item.file_name.clone(),
            mime_type: item.mime_type.clone(),
            byte_size: item.byte_size,
            uploaded_at: item.uploaded_at,
            source,
        }
    }
}

impl From<CachedMemory> for Memory {
    fn from(cached: CachedMemory) -> Self {
        // Records written by older builds may carry a malformed timestamp.
        let uploaded_at = DateTime::parse_from_rfc3339(&cached.uploaded_at)
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(cached.cached_at);
        Memory {
            id: cached.id,
            file_name: cached.file_name,
            mime_type: cached.mime_type,
            byte_size: cached.byte_size,
            uploaded_at,
            source: MemorySource::Cached(Arc::from(cached.payload)),
        }
    }
}

/// Storage report for the local memory cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheInfo {
    pub bytes: ByteSize,
    pub item_count: usize,
}
