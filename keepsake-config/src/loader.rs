use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use keepsake_model::{ByteSize, MemoryCount, OwnerId, RefetchFrequency};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    models::{
        CacheConfig, Config, ConfigMetadata, MemoriesConfig, RemoteConfig,
        SettingsConfig,
    },
    sources::{EnvConfig, FileConfig},
    units::parse_byte_size,
    validation::{self, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["keepsake.toml", "config/keepsake.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Use these values instead of the process environment; `.env` files
    /// are not read either.
    pub env: Option<EnvConfig>,
    /// Directory the default config locations are resolved against.
    pub search_dir: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_env(mut self, env: EnvConfig) -> Self {
        self.options.env = Some(env);
        self
    }

    pub fn with_search_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.search_dir = Some(dir.into());
        self
    }

    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let (env_config, env_file_loaded) = match &self.options.env {
            Some(env) => (env.clone(), false),
            None => {
                let loaded = self.load_env_file()?;
                (EnvConfig::gather(), loaded)
            }
        };

        let (file_config, config_path) = self.load_file_config(&env_config)?;

        let mut warnings = ConfigWarnings::default();
        if config_path.is_none() {
            warnings.push_with_hint(
                "No keepsake.toml detected; \
                 using environment variables and defaults",
                "Create keepsake.toml or point KEEPSAKE_CONFIG at one",
            );
        }

        let config = compose_config(
            file_config.unwrap_or_default(),
            env_config,
            ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        )?;
        warnings.extend(validation::check(&config));

        debug!(
            config_path = ?config.metadata.config_path,
            warnings = warnings.len(),
            "configuration loaded"
        );
        Ok(ConfigLoad { config, warnings })
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let result = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        result.or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(ConfigLoadError::EnvFile(err)),
        })
    }

    fn load_file_config(
        &self,
        env_config: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env_config.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => {
                let base = self.options.search_dir.clone().unwrap_or_default();
                match DEFAULT_CONFIG_LOCATIONS
                    .iter()
                    .map(|candidate| base.join(candidate))
                    .find(|candidate| candidate.exists())
                {
                    Some(path) => path,
                    None => return Ok((None, None)),
                }
            }
        };

        let contents = fs::read_to_string(&path).map_err(|source| {
            ConfigLoadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        let mut file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        if let Some(dir) = path.parent() {
            resolve_relative(&mut file_config.cache.root, dir);
            resolve_relative(&mut file_config.settings.path, dir);
        }

        Ok((Some(file_config), Some(path)))
    }
}

/// Paths in a config file are relative to the file itself.
fn resolve_relative(path: &mut Option<PathBuf>, base: &Path) {
    if let Some(p) = path.as_mut()
        && p.is_relative()
    {
        *p = base.join(&*p);
    }
}

fn compose_config(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
) -> Result<Config, ConfigLoadError> {
    let FileConfig {
        owner: file_owner,
        remote: file_remote,
        cache: file_cache,
        memories: file_memories,
        settings: file_settings,
    } = file;

    let owner = env
        .owner
        .or(file_owner)
        .map(|raw| {
            OwnerId::new(raw.clone())
                .map_err(|err| ConfigLoadError::invalid("owner", raw, err))
        })
        .transpose()?;

    let remote = RemoteConfig {
        url: env
            .remote_url
            .or(file_remote.url)
            .map(|raw| parse_url(&raw))
            .transpose()?,
        request_timeout: env
            .request_timeout
            .or(file_remote.request_timeout)
            .map(|raw| parse_duration("request_timeout", &raw))
            .transpose()?
            .unwrap_or(RemoteConfig::DEFAULT_REQUEST_TIMEOUT),
        probe_interval: env
            .probe_interval
            .or(file_remote.probe_interval)
            .map(|raw| parse_duration("probe_interval", &raw))
            .transpose()?,
    };

    let cache = CacheConfig {
        root: env.cache_root.or(file_cache.root),
        budget: match env.cache_budget.or(file_cache.budget) {
            Some(raw) => parse_budget(&raw)?,
            None => CacheConfig::default().budget,
        },
    };

    let memories = MemoriesConfig {
        count: match env.memory_count {
            Some(raw) => {
                let parsed: u32 = raw.trim().parse().map_err(|_| {
                    ConfigLoadError::invalid(
                        "memory_count",
                        raw.clone(),
                        "not a number",
                    )
                })?;
                MemoryCount::new(parsed)
            }
            None => file_memories
                .count
                .map(MemoryCount::new)
                .unwrap_or_default(),
        },
        frequency: env
            .refetch_frequency
            .or(file_memories.frequency)
            .map(|raw| {
                raw.parse::<RefetchFrequency>().map_err(|reason| {
                    ConfigLoadError::invalid("frequency", raw.clone(), reason)
                })
            })
            .transpose()?
            .unwrap_or_default(),
    };

    let settings = SettingsConfig {
        path: env.settings_path.or(file_settings.path),
    };

    Ok(Config {
        owner,
        remote,
        cache,
        memories,
        settings,
        metadata,
    })
}

fn parse_url(raw: &str) -> Result<Url, ConfigLoadError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ConfigLoadError::invalid("remote.url", raw, err))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigLoadError::invalid(
            "remote.url",
            raw,
            "scheme must be http or https",
        ));
    }
    Ok(url)
}

fn parse_duration(
    key: &'static str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim())
        .map_err(|err| ConfigLoadError::invalid(key, raw, err))
}

fn parse_budget(raw: &str) -> Result<ByteSize, ConfigLoadError> {
    parse_byte_size(raw).map_err(|reason| {
        ConfigLoadError::invalid("cache.budget", raw, reason)
    })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

impl ConfigLoadError {
    fn invalid(
        key: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        ConfigLoadError::InvalidValue {
            key,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}
