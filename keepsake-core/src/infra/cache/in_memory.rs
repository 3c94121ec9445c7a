use std::collections::HashMap;

use async_trait::async_trait;
use keepsake_contracts::{CacheError, MemoryCacheStore, PutAllReport};
use keepsake_model::{ByteSize, CachedMemory, MediaId};
use tokio::sync::RwLock;

/// Process-local memory cache for sessions that must not touch the disk.
#[derive(Debug, Default)]
pub struct InMemoryMemoryCache {
    records: RwLock<HashMap<MediaId, CachedMemory>>,
}

impl InMemoryMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(
        records: impl IntoIterator<Item = CachedMemory>,
    ) -> Self {
        Self {
            records: RwLock::new(
                records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            ),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MemoryCacheStore for InMemoryMemoryCache {
    async fn put_all(
        &self,
        items: Vec<CachedMemory>,
    ) -> Result<PutAllReport, CacheError> {
        let mut records = self.records.write().await;
        let mut report = PutAllReport::default();
        for item in items {
            report.written.push(item.id.clone());
            records.insert(item.id.clone(), item);
        }
        Ok(report)
    }

    async fn get_all(&self) -> Result<Vec<CachedMemory>, CacheError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn remove(&self, id: &MediaId) -> Result<(), CacheError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn size_bytes(&self) -> Result<ByteSize, CacheError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .map(CachedMemory::payload_len)
            .sum())
    }
}
