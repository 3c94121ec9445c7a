use std::{
    fmt,
    path::{Path, PathBuf},
};

use cacache::Integrity;
use keepsake_contracts::CacheError;
use thiserror::Error;

/// Directory holding the content-addressed memory payloads.
///
/// The store is used in hash-only mode (`cacache::write_hash` /
/// `cacache::read_hash`); the returned [`Integrity`] is persisted by the
/// caller next to the memory metadata.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MemoryCacheRoot(PathBuf);

impl MemoryCacheRoot {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Debug for MemoryCacheRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MemoryCacheRoot").field(&self.0).finish()
    }
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub integrity: Integrity,
    pub byte_len: usize,
}

/// Why a payload could not be read back.
#[derive(Debug, Error)]
pub enum BlobReadError {
    #[error("blob not found: {0}")]
    Missing(String),

    /// The bytes on disk no longer match their integrity hash.
    #[error("blob corrupt: {0}")]
    Corrupt(String),

    #[error("blob store I/O error: {0}")]
    Io(String),
}

impl BlobReadError {
    /// The record referencing this blob can never be served again.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, BlobReadError::Missing(_) | BlobReadError::Corrupt(_))
    }
}

impl From<BlobReadError> for CacheError {
    fn from(err: BlobReadError) -> Self {
        CacheError::Read(err.to_string())
    }
}

/// Typed wrapper over `cacache` for memory payloads.
#[derive(Clone, Debug)]
pub struct MemoryBlobStore {
    root: MemoryCacheRoot,
}

impl MemoryBlobStore {
    pub fn new(root: MemoryCacheRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &MemoryCacheRoot {
        &self.root
    }

    pub async fn read_hash(
        &self,
        hash: &Integrity,
    ) -> Result<Vec<u8>, BlobReadError> {
        cacache::read_hash(self.root.as_path(), hash)
            .await
            .map_err(|e| match e {
                cacache::Error::EntryNotFound(_, _) => {
                    BlobReadError::Missing(hash.to_string())
                }
                cacache::Error::IntegrityError(err) => BlobReadError::Corrupt(
                    format!("integrity check failed for {hash} ({err})"),
                ),
                cacache::Error::SizeMismatch(wanted, actual) => {
                    BlobReadError::Corrupt(format!(
                        "size mismatch for {hash}: \
                         wanted={wanted}, actual={actual}"
                    ))
                }
                cacache::Error::IoError(err, _)
                    if err.kind() == std::io::ErrorKind::NotFound =>
                {
                    BlobReadError::Missing(hash.to_string())
                }
                cacache::Error::IoError(_, msg) => BlobReadError::Io(msg),
                cacache::Error::SerdeError(_, msg) => {
                    BlobReadError::Corrupt(msg)
                }
            })
    }

    pub async fn write_hash(
        &self,
        bytes: &[u8],
    ) -> Result<StoredBlob, CacheError> {
        let integrity = cacache::write_hash(self.root.as_path(), bytes)
            .await
            .map_err(|e| {
                CacheError::Write(format!("cacache write_hash failed: {e}"))
            })?;

        Ok(StoredBlob {
            integrity,
            byte_len: bytes.len(),
        })
    }

    pub async fn remove_hash(
        &self,
        hash: &Integrity,
    ) -> Result<(), CacheError> {
        cacache::remove_hash(self.root.as_path(), hash)
            .await
            .map_err(|e| {
                CacheError::Write(format!("cacache remove_hash failed: {e}"))
            })
    }

    /// Drop every blob in the store.
    pub async fn clear(&self) -> Result<(), CacheError> {
        if !tokio::fs::try_exists(self.root.as_path())
            .await
            .unwrap_or(false)
        {
            return Ok(());
        }
        cacache::clear(self.root.as_path())
            .await
            .map_err(|e| {
                CacheError::Write(format!("cacache clear failed: {e}"))
            })
    }
}
