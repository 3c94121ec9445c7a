//! Trait surfaces the memory engine consumes.
//!
//! The engine never talks to a concrete document store, blob host or local
//! database directly. Everything it needs from the outside world is expressed
//! here so sessions (and tests) can plug in their own collaborators.

pub mod cache;
pub mod error;
pub mod library;
pub mod settings;

pub use cache::{MemoryCacheStore, PutAllReport};
pub use error::{CacheError, LibraryError, SettingsError};
pub use library::RemoteLibrary;
pub use settings::SettingsStore;

/// Frequently used imports for adapter crates.
pub mod prelude {
    pub use super::cache::{MemoryCacheStore, PutAllReport};
    pub use super::error::{CacheError, LibraryError, SettingsError};
    pub use super::library::RemoteLibrary;
    pub use super::settings::SettingsStore;
}
