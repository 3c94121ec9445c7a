use std::{path::PathBuf, time::Duration};

use keepsake_model::{
    ByteSize, MemoryCount, OwnerId, RefetchFrequency, RefetchSettings,
};
use url::Url;

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub owner: Option<OwnerId>,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub memories: MemoriesConfig,
    pub settings: SettingsConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// `None` runs the host offline-only.
    pub url: Option<Url>,
    pub request_timeout: Duration,
    /// `None` disables the connectivity probe.
    pub probe_interval: Option<Duration>,
}

impl RemoteConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            probe_interval: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// `None` uses the platform cache directory.
    pub root: Option<PathBuf>,
    pub budget: ByteSize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            budget: RefetchSettings::DEFAULT_CACHE_BUDGET,
        }
    }
}

/// Defaults seeded into an owner's settings the first time they are created.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoriesConfig {
    pub count: MemoryCount,
    pub frequency: RefetchFrequency,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsConfig {
    /// `None` uses the platform data directory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Config {
    /// Initial settings for an owner that has none persisted yet.
    pub fn initial_settings(&self) -> RefetchSettings {
        RefetchSettings {
            frequency: self.memories.frequency,
            memory_count: self.memories.count,
            cache_budget: self.cache.budget,
            ..RefetchSettings::default()
        }
    }
}
