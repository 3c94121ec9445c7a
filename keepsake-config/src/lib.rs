//! Configuration for hosts of the memory engine.
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file, and `KEEPSAKE_*` environment variables (optionally seeded from a
//! `.env` file).

pub mod loader;
pub mod models;
pub mod sources;
pub mod units;
pub mod validation;

pub use loader::{
    ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions,
};
pub use models::{
    CacheConfig, Config, ConfigMetadata, MemoriesConfig, RemoteConfig,
    SettingsConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigWarning, ConfigWarnings};
