use chrono::{DateTime, TimeZone, Utc};
use keepsake_model::{
    CachedMemory, ContentSource, InlinePayload, MediaId, MediaItem, OwnerId,
};

pub fn owner() -> OwnerId {
    OwnerId::new("owner-1").unwrap()
}

pub fn media_id(id: &str) -> MediaId {
    MediaId::new(id).unwrap()
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn remote_item(id: &str, mime: &str) -> MediaItem {
    MediaItem {
        id: media_id(id),
        file_name: format!("{id}.bin"),
        mime_type: mime.to_string(),
        byte_size: 64,
        uploaded_at: epoch(),
        source: ContentSource::Remote(format!("mem://{id}")),
        owner_id: owner(),
    }
}

pub fn inline_item(id: &str, bytes: &[u8]) -> MediaItem {
    MediaItem {
        source: ContentSource::Inline(InlinePayload::encode(bytes)),
        ..remote_item(id, "image/png")
    }
}

pub fn images(prefix: &str, count: usize) -> Vec<MediaItem> {
    (0..count)
        .map(|i| remote_item(&format!("{prefix}-{i}"), "image/jpeg"))
        .collect()
}

pub fn videos(prefix: &str, count: usize) -> Vec<MediaItem> {
    (0..count)
        .map(|i| remote_item(&format!("{prefix}-{i}"), "video/mp4"))
        .collect()
}

/// Bytes the fake library serves for a remote item.
pub fn payload_for(id: &MediaId) -> Vec<u8> {
    format!("bytes-of-{id}").into_bytes()
}

pub fn cached(id: &str) -> CachedMemory {
    let item = remote_item(id, "image/jpeg");
    CachedMemory::from_item(&item, payload_for(&item.id), epoch())
}

pub fn cached_many(prefix: &str, count: usize) -> Vec<CachedMemory> {
    (0..count).map(|i| cached(&format!("{prefix}-{i}"))).collect()
}

pub fn ids_of<'a>(ids: impl IntoIterator<Item = &'a MediaId>) -> Vec<String> {
    let mut out: Vec<String> =
        ids.into_iter().map(|id| id.to_string()).collect();
    out.sort();
    out
}
