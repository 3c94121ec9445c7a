mod support;

use std::path::{Path, PathBuf};

use keepsake_contracts::{CacheError, MemoryCacheStore};
use keepsake_core::infra::cache::DiskMemoryCache;
use keepsake_model::CachedMemory;

use support::fixtures::{cached, epoch, ids_of, media_id};

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return out;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.extend(files_under(&path));
        } else {
            out.push(path);
        }
    }
    out
}

fn blob_file_with(root: &Path, payload: &[u8]) -> PathBuf {
    files_under(&root.join("blobs"))
        .into_iter()
        .find(|p| std::fs::read(p).map(|b| b == payload).unwrap_or(false))
        .expect("blob file for payload")
}

fn overwrite(path: &Path, bytes: &[u8]) {
    let mut perms = std::fs::metadata(path).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    std::fs::set_permissions(path, perms).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Occupy the index path with a directory so every index rewrite fails.
fn block_index_writes(root: &Path) {
    let index = root.join("memories-index-v1.json");
    let _ = std::fs::remove_file(&index);
    std::fs::create_dir(&index).unwrap();
    std::fs::write(index.join("occupied"), b"").unwrap();
}

fn with_payload(id: &str, payload: &[u8]) -> CachedMemory {
    CachedMemory {
        payload: payload.to_vec(),
        ..cached(id)
    }
}

#[tokio::test]
async fn records_survive_reopen_with_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let original = cached("beach");

    {
        let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
        let report = cache
            .put_all(vec![original.clone(), cached("hike")])
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.written.len(), 2);
    }

    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    let records = cache.get_all().await.unwrap();
    assert_eq!(ids_of(records.iter().map(|r| &r.id)), ["beach", "hike"]);

    let beach = records.iter().find(|r| r.id == original.id).unwrap();
    assert_eq!(beach, &original);
    assert_eq!(beach.cached_at, epoch());
    assert!(cache.index_path().ends_with("memories-index-v1.json"));
}

#[tokio::test]
async fn upsert_and_size_accounting() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();

    cache
        .put_all(vec![with_payload("a", b"12345"), with_payload("b", b"123")])
        .await
        .unwrap();
    cache.put_all(vec![with_payload("a", b"1")]).await.unwrap();

    assert_eq!(cache.size_bytes().await.unwrap().as_bytes(), 4);
    let info = cache.info().await.unwrap();
    assert_eq!(info.item_count, 2);
    assert_eq!(info.bytes.as_bytes(), 4);

    let a = cache
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.id.as_str() == "a")
        .unwrap();
    assert_eq!(a.payload, b"1");
}

#[tokio::test]
async fn shared_payload_survives_removal_of_one_owner() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    cache
        .put_all(vec![with_payload("x", b"same"), with_payload("y", b"same")])
        .await
        .unwrap();

    cache.remove(&media_id("x")).await.unwrap();
    cache.remove(&media_id("missing")).await.unwrap();

    let records = cache.get_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, media_id("y"));
    assert_eq!(records[0].payload, b"same");
}

#[tokio::test]
async fn corrupt_and_missing_blobs_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    cache
        .put_all(vec![
            with_payload("intact", b"intact-bytes"),
            with_payload("tampered", b"tampered-bytes"),
            with_payload("deleted", b"deleted-bytes"),
        ])
        .await
        .unwrap();

    overwrite(
        &blob_file_with(dir.path(), b"tampered-bytes"),
        b"TAMPERED-BYTES",
    );
    std::fs::remove_file(blob_file_with(dir.path(), b"deleted-bytes")).unwrap();

    let records = cache.get_all().await.unwrap();
    assert_eq!(ids_of(records.iter().map(|r| &r.id)), ["intact"]);

    let reopened = DiskMemoryCache::open(dir.path()).await.unwrap();
    assert_eq!(reopened.info().await.unwrap().item_count, 1);
}

#[tokio::test]
async fn unreadable_index_fails_reads_until_cleared() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("memories-index-v1.json"), b"{ broken")
        .unwrap();

    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    assert!(matches!(cache.get_all().await, Err(CacheError::Read(_))));
    assert!(matches!(cache.size_bytes().await, Err(CacheError::Read(_))));

    cache.clear().await.unwrap();
    assert!(cache.get_all().await.unwrap().is_empty());

    cache.put_all(vec![cached("fresh")]).await.unwrap();
    assert_eq!(cache.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn put_all_replaces_an_unreadable_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("memories-index-v1.json"), b"[]").unwrap();

    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    cache.put_all(vec![cached("a"), cached("b")]).await.unwrap();

    let reopened = DiskMemoryCache::open(dir.path()).await.unwrap();
    assert_eq!(reopened.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn clear_removes_records_and_blobs() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    cache.put_all(vec![cached("a"), cached("b")]).await.unwrap();
    assert!(!files_under(&dir.path().join("blobs")).is_empty());

    cache.clear().await.unwrap();

    assert!(cache.get_all().await.unwrap().is_empty());
    assert!(cache.size_bytes().await.unwrap().is_zero());
    let leftover: Vec<_> = files_under(&dir.path().join("blobs"))
        .into_iter()
        .filter(|p| p.to_string_lossy().contains("content-v2"))
        .collect();
    assert!(leftover.is_empty(), "{leftover:?}");
}

#[tokio::test]
async fn failed_index_write_leaves_cache_state_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskMemoryCache::open(dir.path()).await.unwrap();
    cache
        .put_all(vec![with_payload("kept", b"kept-bytes")])
        .await
        .unwrap();
    block_index_writes(dir.path());

    let err = cache
        .put_all(vec![
            with_payload("lost", b"lost-bytes"),
            with_payload("kept", b"changed"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Write(_)), "{err:?}");

    let info = cache.info().await.unwrap();
    assert_eq!(info.item_count, 1);
    assert_eq!(info.bytes.as_bytes(), 10);
    let records = cache.get_all().await.unwrap();
    assert_eq!(ids_of(records.iter().map(|r| &r.id)), ["kept"]);
    assert_eq!(records[0].payload, b"kept-bytes");

    let blobs = files_under(&dir.path().join("blobs"));
    let orphaned = blobs.iter().filter(|p| {
        std::fs::read(p)
            .map(|b| b == b"lost-bytes" || b == b"changed")
            .unwrap_or(false)
    });
    assert_eq!(orphaned.count(), 0);

    assert!(cache.remove(&media_id("kept")).await.is_err());
    assert_eq!(cache.info().await.unwrap().item_count, 1);
    assert!(cache.clear().await.is_err());
    assert_eq!(cache.get_all().await.unwrap().len(), 1);
}
