use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use keepsake_config::Config;
use keepsake_contracts::SettingsStore;
use keepsake_core::infra::{
    cache::DiskMemoryCache, dirs, settings::FileSettingsStore,
};
use keepsake_model::{OwnerId, RefetchSettingsPatch};
use tracing::info;

/// Stores bound to one owner for the duration of a command.
#[derive(Debug)]
pub(crate) struct Session {
    pub config: Config,
    pub owner: OwnerId,
    pub cache: Arc<DiskMemoryCache>,
    pub settings: Arc<FileSettingsStore>,
}

impl Session {
    pub async fn open(
        config: Config,
        owner_override: Option<String>,
    ) -> Result<Self> {
        let owner = match owner_override {
            Some(raw) => OwnerId::new(raw)?,
            None => config.owner.clone().ok_or_else(|| {
                anyhow!(
                    "no owner configured; pass --owner or set KEEPSAKE_OWNER"
                )
            })?,
        };

        let cache = match &config.cache.root {
            Some(root) => {
                DiskMemoryCache::open(root.join(dirs::owner_namespace(&owner)))
                    .await
            }
            None => DiskMemoryCache::open_for_owner(&owner).await,
        }
        .context("opening memory cache")?;

        let settings = match &config.settings.path {
            Some(path) => FileSettingsStore::new(path),
            None => FileSettingsStore::for_owner(&owner)?,
        };
        if !tokio::fs::try_exists(settings.path()).await.unwrap_or(false) {
            let initial = config.initial_settings();
            settings
                .write(RefetchSettingsPatch {
                    frequency: Some(initial.frequency),
                    memory_count: Some(initial.memory_count),
                    cache_budget: Some(initial.cache_budget),
                    ..RefetchSettingsPatch::default()
                })
                .await
                .context("seeding refetch settings")?;
            info!(
                path = %settings.path().display(),
                "refetch settings created"
            );
        }

        Ok(Self {
            config,
            owner,
            cache: Arc::new(cache),
            settings: Arc::new(settings),
        })
    }
}
