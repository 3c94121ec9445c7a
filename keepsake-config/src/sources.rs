use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw configuration as written in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub remote: FileRemoteConfig,
    #[serde(default)]
    pub cache: FileCacheConfig,
    #[serde(default)]
    pub memories: FileMemoriesConfig,
    #[serde(default)]
    pub settings: FileSettingsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileRemoteConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// humantime duration, e.g. `"10s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_interval: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileCacheConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Byte size, e.g. `"100MiB"`; `"0"` disables the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileMemoriesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettingsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Environment-derived configuration values, kept as raw strings until the
/// loader validates them.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub owner: Option<String>,
    pub remote_url: Option<String>,
    pub request_timeout: Option<String>,
    pub probe_interval: Option<String>,
    pub cache_root: Option<PathBuf>,
    pub cache_budget: Option<String>,
    pub memory_count: Option<String>,
    pub refetch_frequency: Option<String>,
    pub settings_path: Option<PathBuf>,
}

impl EnvConfig {
    /// Read from the process environment.
    pub fn gather() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            config_path: var("KEEPSAKE_CONFIG").map(PathBuf::from),
            owner: var("KEEPSAKE_OWNER"),
            remote_url: var("KEEPSAKE_REMOTE_URL"),
            request_timeout: var("KEEPSAKE_REQUEST_TIMEOUT"),
            probe_interval: var("KEEPSAKE_PROBE_INTERVAL"),
            cache_root: var("KEEPSAKE_CACHE_ROOT").map(PathBuf::from),
            cache_budget: var("KEEPSAKE_CACHE_BUDGET"),
            memory_count: var("KEEPSAKE_MEMORY_COUNT"),
            refetch_frequency: var("KEEPSAKE_REFETCH_FREQUENCY"),
            settings_path: var("KEEPSAKE_SETTINGS_PATH").map(PathBuf::from),
        }
    }
}
