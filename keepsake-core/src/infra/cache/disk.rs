use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use cacache::Integrity;
use chrono::{DateTime, Utc};
use keepsake_contracts::{CacheError, MemoryCacheStore, PutAllReport};
use keepsake_model::{ByteSize, CacheInfo, CachedMemory, MediaId, OwnerId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::blob_store::{MemoryBlobStore, MemoryCacheRoot};
use crate::infra::{dirs, fs::write_atomic};

const INDEX_FILE_NAME: &str = "memories-index-v1.json";
const BLOBS_DIR_NAME: &str = "blobs";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone)]
struct IndexEntry {
    file_name: String,
    mime_type: String,
    byte_size: u64,
    uploaded_at: String,
    remote_ref: String,
    cached_at: DateTime<Utc>,
    integrity: Integrity,
    payload_len: u64,
}

impl IndexEntry {
    fn into_record(self, id: MediaId, payload: Vec<u8>) -> CachedMemory {
        CachedMemory {
            id,
            file_name: self.file_name,
            mime_type: self.mime_type,
            byte_size: self.byte_size,
            uploaded_at: self.uploaded_at,
            remote_ref: self.remote_ref,
            payload,
            cached_at: self.cached_at,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryIndex {
    entries: HashMap<MediaId, IndexEntry>,
    /// Set when the index file exists but could not be understood.
    unreadable: Option<String>,
}

impl MemoryIndex {
    fn ensure_readable(&self) -> Result<(), CacheError> {
        match &self.unreadable {
            Some(reason) => Err(CacheError::Read(format!(
                "memory index is unreadable: {reason}"
            ))),
            None => Ok(()),
        }
    }

    fn references(&self, integrity: &Integrity) -> bool {
        self.entries.values().any(|e| &e.integrity == integrity)
    }

    fn total_bytes(&self) -> ByteSize {
        self.entries
            .values()
            .map(|e| ByteSize::from_bytes(e.payload_len))
            .sum()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryIndexFile {
    schema_version: u32,
    #[serde(default)]
    entries: Vec<MemoryIndexEntryFile>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryIndexEntryFile {
    id: MediaId,
    file_name: String,
    mime_type: String,
    byte_size: u64,
    uploaded_at: String,
    #[serde(default)]
    remote_ref: String,
    cached_at: DateTime<Utc>,
    integrity: String,
    payload_len: u64,
}

/// Memory cache persisted under a single directory.
///
/// Payloads are content-addressed blobs in a `cacache` store at
/// `<root>/blobs`; metadata and integrity hashes live in
/// `<root>/memories-index-v1.json`, rewritten atomically after every change.
#[derive(Debug)]
pub struct DiskMemoryCache {
    blob_store: MemoryBlobStore,
    index_path: PathBuf,
    index: Mutex<MemoryIndex>,
}

impl DiskMemoryCache {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            CacheError::Unavailable(format!(
                "cannot create memory cache at {}: {e}",
                root.display()
            ))
        })?;

        let index_path = root.join(INDEX_FILE_NAME);
        let index = load_index_file(&index_path).await;
        if let Some(reason) = &index.unreadable {
            warn!(
                path = %index_path.display(),
                reason,
                "memory index unreadable"
            );
        } else {
            debug!(
                path = %index_path.display(),
                entries = index.entries.len(),
                "memory cache opened"
            );
        }

        Ok(Self {
            blob_store: MemoryBlobStore::new(MemoryCacheRoot::new(
                root.join(BLOBS_DIR_NAME),
            )),
            index_path,
            index: Mutex::new(index),
        })
    }

    /// Open the cache in the platform cache directory, namespaced per owner.
    pub async fn open_for_owner(owner: &OwnerId) -> Result<Self, CacheError> {
        let root = dirs::default_cache_root(owner).ok_or_else(|| {
            CacheError::Unavailable(
                "no platform cache directory available".to_string(),
            )
        })?;
        Self::open(root).await
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn blob_root(&self) -> &MemoryCacheRoot {
        self.blob_store.root()
    }

    async fn persist(&self, index: &MemoryIndex) -> Result<(), CacheError> {
        let snapshot = snapshot_index(index);
        let bytes = serde_json::to_vec(&snapshot).map_err(|e| {
            CacheError::Write(format!("memory index serialization failed: {e}"))
        })?;
        write_atomic(&self.index_path, &bytes).await.map_err(|e| {
            CacheError::Write(format!(
                "memory index write to {} failed: {e}",
                self.index_path.display()
            ))
        })
    }

    async fn release_blob(&self, index: &MemoryIndex, integrity: &Integrity) {
        if index.references(integrity) {
            return;
        }
        if let Err(err) = self.blob_store.remove_hash(integrity).await {
            debug!(error = %err, "orphaned memory blob not removed");
        }
    }
}

#[async_trait]
impl MemoryCacheStore for DiskMemoryCache {
    async fn put_all(
        &self,
        items: Vec<CachedMemory>,
    ) -> Result<PutAllReport, CacheError> {
        let mut index = self.index.lock().await;
        let unreadable = index.unreadable.take();
        if let Some(reason) = &unreadable {
            warn!(reason, "replacing unreadable memory index");
            index.entries.clear();
            if let Err(err) = self.blob_store.clear().await {
                warn!(error = %err, "could not drop blobs of unreadable index");
            }
        }
        let previous = index.entries.clone();

        let mut report = PutAllReport::default();
        let mut replaced = Vec::new();
        let mut fresh = Vec::new();
        for record in items {
            let written = self.blob_store.write_hash(&record.payload).await;
            let stored = match written {
                Ok(stored) => stored,
                Err(err) => {
                    report.failed.push((record.id, err));
                    continue;
                }
            };
            let entry = IndexEntry {
                file_name: record.file_name,
                mime_type: record.mime_type,
                byte_size: record.byte_size,
                uploaded_at: record.uploaded_at,
                remote_ref: record.remote_ref,
                cached_at: record.cached_at,
                integrity: stored.integrity.clone(),
                payload_len: stored.byte_len as u64,
            };
            if let Some(old) = index.entries.insert(record.id.clone(), entry)
                && old.integrity != stored.integrity
            {
                replaced.push(old.integrity);
            }
            fresh.push(stored.integrity);
            report.written.push(record.id);
        }

        if report.written.is_empty() {
            index.unreadable = unreadable;
            return Ok(report);
        }

        // The in-memory index must never get ahead of the file.
        if let Err(err) = self.persist(&index).await {
            index.entries = previous;
            index.unreadable = unreadable;
            for integrity in &fresh {
                self.release_blob(&index, integrity).await;
            }
            return Err(err);
        }
        for integrity in &replaced {
            self.release_blob(&index, integrity).await;
        }
        Ok(report)
    }

    async fn get_all(&self) -> Result<Vec<CachedMemory>, CacheError> {
        let mut index = self.index.lock().await;
        index.ensure_readable()?;

        let entries: Vec<(MediaId, IndexEntry)> = index
            .entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut records = Vec::with_capacity(entries.len());
        let mut dropped = Vec::new();
        for (id, entry) in entries {
            match self.blob_store.read_hash(&entry.integrity).await {
                Ok(payload) => records.push(entry.into_record(id, payload)),
                Err(err) if err.is_unrecoverable() => {
                    warn!(
                        media_id = %id,
                        error = %err,
                        "dropping corrupt cached memory"
                    );
                    dropped.push(id);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if !dropped.is_empty() {
            let mut released = Vec::new();
            for id in &dropped {
                if let Some(entry) = index.entries.remove(id) {
                    released.push(entry.integrity);
                }
            }
            if let Err(err) = self.persist(&index).await {
                warn!(
                    error = %err,
                    "memory index not updated after dropping corrupt entries"
                );
            }
            for integrity in &released {
                self.release_blob(&index, integrity).await;
            }
        }

        Ok(records)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        let had = index.entries.len();
        let previous = std::mem::take(&mut index.entries);
        let unreadable = index.unreadable.take();
        if let Err(err) = self.persist(&index).await {
            index.entries = previous;
            index.unreadable = unreadable;
            return Err(err);
        }
        self.blob_store.clear().await?;
        info!(removed = had, "memory cache cleared");
        Ok(())
    }

    async fn remove(&self, id: &MediaId) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        index.ensure_readable()?;
        let Some(entry) = index.entries.remove(id) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&index).await {
            index.entries.insert(id.clone(), entry);
            return Err(err);
        }
        self.release_blob(&index, &entry.integrity).await;
        debug!(media_id = %id, "cached memory removed");
        Ok(())
    }

    async fn size_bytes(&self) -> Result<ByteSize, CacheError> {
        let index = self.index.lock().await;
        index.ensure_readable()?;
        Ok(index.total_bytes())
    }

    async fn info(&self) -> Result<CacheInfo, CacheError> {
        let index = self.index.lock().await;
        index.ensure_readable()?;
        Ok(CacheInfo {
            bytes: index.total_bytes(),
            item_count: index.entries.len(),
        })
    }
}

fn snapshot_index(index: &MemoryIndex) -> MemoryIndexFile {
    let mut entries: Vec<MemoryIndexEntryFile> = index
        .entries
        .iter()
        .map(|(id, entry)| MemoryIndexEntryFile {
            id: id.clone(),
            file_name: entry.file_name.clone(),
            mime_type: entry.mime_type.clone(),
            byte_size: entry.byte_size,
            uploaded_at: entry.uploaded_at.clone(),
            remote_ref: entry.remote_ref.clone(),
            cached_at: entry.cached_at,
            integrity: entry.integrity.to_string(),
            payload_len: entry.payload_len,
        })
        .collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));

    MemoryIndexFile {
        schema_version: SCHEMA_VERSION,
        entries,
    }
}

async fn load_index_file(path: &Path) -> MemoryIndex {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return MemoryIndex::default();
        }
        Err(err) => {
            return MemoryIndex {
                unreadable: Some(err.to_string()),
                ..MemoryIndex::default()
            };
        }
    };
    parse_index(&bytes)
}

fn parse_index(bytes: &[u8]) -> MemoryIndex {
    let parsed: MemoryIndexFile = match serde_json::from_slice(bytes) {
        Ok(parsed) => parsed,
        Err(err) => {
            return MemoryIndex {
                unreadable: Some(err.to_string()),
                ..MemoryIndex::default()
            };
        }
    };

    if parsed.schema_version != SCHEMA_VERSION {
        return MemoryIndex {
            unreadable: Some(format!(
                "unsupported schema version {}",
                parsed.schema_version
            )),
            ..MemoryIndex::default()
        };
    }

    let mut index = MemoryIndex::default();
    for entry in parsed.entries {
        let Ok(integrity) = entry.integrity.parse::<Integrity>() else {
            continue;
        };
        index.entries.insert(
            entry.id,
            IndexEntry {
                file_name: entry.file_name,
                mime_type: entry.mime_type,
                byte_size: entry.byte_size,
                uploaded_at: entry.uploaded_at,
                remote_ref: entry.remote_ref,
                cached_at: entry.cached_at,
                integrity,
                payload_len: entry.payload_len,
            },
        );
    }
    index
}
