use keepsake_contracts::{CacheError, LibraryError, SettingsError};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MemoryError {
    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MemoryError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, MemoryError::Library(err) if err.is_permission_denied())
    }
}

pub type Result<T> = std::result::Result<T, MemoryError>;
