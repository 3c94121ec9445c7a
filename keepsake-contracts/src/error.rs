use keepsake_model::MediaId;
use thiserror::Error;

/// Failures of the remote library accessor.
#[derive(Debug, Clone, Error)]
pub enum LibraryError {
    /// The library could not be reached (offline, DNS, timeout, 5xx).
    #[error("remote library unreachable: {0}")]
    Connectivity(String),

    /// The library answered but refused access to the owner's media.
    #[error("access to remote library denied: {0}")]
    PermissionDenied(String),

    /// The library answered with something the accessor could not use.
    #[error("remote library error: {0}")]
    Remote(String),

    /// The bytes of a single item could not be decoded or retrieved.
    #[error("could not resolve bytes for {id}: {reason}")]
    Resolution { id: MediaId, reason: String },
}

impl LibraryError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, LibraryError::PermissionDenied(_))
    }
}

/// Failures of the local durable memory cache.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The store rejected a write (quota, I/O, serialization).
    #[error("cache write failed: {0}")]
    Write(String),

    /// The store could not be read or its contents are corrupt.
    #[error("cache read failed: {0}")]
    Read(String),

    /// The store is not available at all.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the settings store.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("settings could not be read: {0}")]
    Read(String),

    #[error("settings could not be written: {0}")]
    Write(String),
}
