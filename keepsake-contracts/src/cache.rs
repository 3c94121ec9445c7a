use async_trait::async_trait;
use keepsake_model::{ByteSize, CacheInfo, CachedMemory, MediaId};

use crate::error::CacheError;

/// Outcome of [`MemoryCacheStore::put_all`].
///
/// Each record is written independently; a failed record never blocks its
/// siblings, so the report lists what landed and what did not.
#[derive(Debug, Default)]
pub struct PutAllReport {
    pub written: Vec<MediaId>,
    pub failed: Vec<(MediaId, CacheError)>,
}

impl PutAllReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Durable local store of cached memories, keyed by media id.
///
/// Implementations do not coordinate writers; the orchestrator is the only
/// component that mutates the store.
#[async_trait]
pub trait MemoryCacheStore: Send + Sync {
    /// Upsert every record. `Err` means the store as a whole failed; per
    /// record failures are reported in the returned [`PutAllReport`].
    async fn put_all(
        &self,
        items: Vec<CachedMemory>,
    ) -> Result<PutAllReport, CacheError>;

    /// Every stored record, order unspecified.
    async fn get_all(&self) -> Result<Vec<CachedMemory>, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    async fn remove(&self, id: &MediaId) -> Result<(), CacheError>;

    /// Sum of payload sizes across all records.
    async fn size_bytes(&self) -> Result<ByteSize, CacheError>;

    async fn info(&self) -> Result<CacheInfo, CacheError> {
        let records = self.get_all().await?;
        Ok(CacheInfo {
            bytes: records.iter().map(CachedMemory::payload_len).sum(),
            item_count: records.len(),
        })
    }
}
