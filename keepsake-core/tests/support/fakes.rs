use std::{
    collections::HashSet,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use keepsake_contracts::{
    CacheError, LibraryError, MemoryCacheStore, PutAllReport, RemoteLibrary,
    SettingsError, SettingsStore,
};
use keepsake_model::{
    ByteSize, CachedMemory, MediaId, MediaItem, OwnerId, RefetchSettings,
    RefetchSettingsPatch,
};
use tokio::sync::watch;

use super::fixtures::payload_for;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable remote library.
///
/// Items listed in `gated` block in `fetch_reference` until [`Self::open_gate`]
/// is called, which lets tests hold a write-through in flight.
#[derive(Debug)]
pub struct FakeLibrary {
    items: Mutex<Vec<MediaItem>>,
    list_error: Mutex<Option<LibraryError>>,
    unresolvable: Mutex<HashSet<MediaId>>,
    gated: Mutex<HashSet<MediaId>>,
    gate: watch::Sender<bool>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeLibrary {
    pub fn new(items: Vec<MediaItem>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            items: Mutex::new(items),
            list_error: Mutex::new(None),
            unresolvable: Mutex::new(HashSet::new()),
            gated: Mutex::new(HashSet::new()),
            gate,
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn set_items(&self, items: Vec<MediaItem>) {
        *lock(&self.items) = items;
    }

    pub fn fail_listing(&self, error: Option<LibraryError>) {
        *lock(&self.list_error) = error;
    }

    pub fn make_unresolvable(&self, id: &MediaId) {
        lock(&self.unresolvable).insert(id.clone());
    }

    pub fn gate_items<'a>(&self, ids: impl IntoIterator<Item = &'a MediaId>) {
        lock(&self.gated).extend(ids.into_iter().cloned());
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteLibrary for FakeLibrary {
    async fn list_media(
        &self,
        _owner: &OwnerId,
    ) -> Result<Vec<MediaItem>, LibraryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.list_error).clone() {
            return Err(err);
        }
        Ok(lock(&self.items).clone())
    }

    async fn fetch_reference(
        &self,
        item: &MediaItem,
        _reference: &str,
    ) -> Result<Vec<u8>, LibraryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let gated = lock(&self.gated).contains(&item.id);
        if gated {
            let mut rx = self.gate.subscribe();
            let _ = rx.wait_for(|open| *open).await;
        }

        if lock(&self.unresolvable).contains(&item.id) {
            return Err(LibraryError::Resolution {
                id: item.id.clone(),
                reason: "object missing".to_string(),
            });
        }
        Ok(payload_for(&item.id))
    }
}

/// Cache whose reads or writes can be switched to fail, as a whole or for
/// single records.
#[derive(Debug, Default)]
pub struct FlakyCache {
    inner: keepsake_core::infra::cache::InMemoryMemoryCache,
    fail_reads: std::sync::atomic::AtomicBool,
    fail_writes: std::sync::atomic::AtomicBool,
    refused: Mutex<HashSet<MediaId>>,
    clear_calls: AtomicUsize,
}

impl FlakyCache {
    /// Make `put_all` report a per-record failure for `id`.
    pub fn refuse_record(&self, id: &MediaId) {
        lock(&self.refused).insert(id.clone());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<(), CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Read("disk on fire".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Write("quota exceeded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryCacheStore for FlakyCache {
    async fn put_all(
        &self,
        items: Vec<CachedMemory>,
    ) -> Result<PutAllReport, CacheError> {
        self.check_write()?;
        let (refused, accepted): (Vec<_>, Vec<_>) = {
            let refused = lock(&self.refused);
            items.into_iter().partition(|item| refused.contains(&item.id))
        };
        let mut report = self.inner.put_all(accepted).await?;
        for item in refused {
            report.failed.push((
                item.id,
                CacheError::Write("record rejected".to_string()),
            ));
        }
        Ok(report)
    }

    async fn get_all(&self) -> Result<Vec<CachedMemory>, CacheError> {
        self.check_read()?;
        self.inner.get_all().await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        self.inner.clear().await
    }

    async fn remove(&self, id: &MediaId) -> Result<(), CacheError> {
        self.check_write()?;
        self.inner.remove(id).await
    }

    async fn size_bytes(&self) -> Result<ByteSize, CacheError> {
        self.check_read()?;
        self.inner.size_bytes().await
    }
}

/// Settings store that cannot be read or written.
#[derive(Debug, Default)]
pub struct BrokenSettings;

#[async_trait]
impl SettingsStore for BrokenSettings {
    async fn read(&self) -> Result<RefetchSettings, SettingsError> {
        Err(SettingsError::Read("permission denied".to_string()))
    }

    async fn write(
        &self,
        _patch: RefetchSettingsPatch,
    ) -> Result<RefetchSettings, SettingsError> {
        Err(SettingsError::Write("read-only filesystem".to_string()))
    }
}
