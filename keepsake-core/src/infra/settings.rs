use std::path::{Path, PathBuf};

use async_trait::async_trait;
use keepsake_contracts::{SettingsError, SettingsStore};
use keepsake_model::{OwnerId, RefetchSettings, RefetchSettingsPatch};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::infra::{dirs, fs::write_atomic};

/// Settings persisted as a JSON document.
///
/// A missing file reads as the defaults. Writes are serialized through an
/// async lock and land atomically.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store in the platform data directory, namespaced per owner.
    pub fn for_owner(owner: &OwnerId) -> Result<Self, SettingsError> {
        dirs::default_settings_path(owner)
            .map(Self::new)
            .ok_or_else(|| {
                SettingsError::Read(
                    "no platform data directory available".to_string(),
                )
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RefetchSettings, SettingsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(RefetchSettings::default());
            }
            Err(err) => {
                return Err(SettingsError::Read(format!(
                    "{}: {err}",
                    self.path.display()
                )));
            }
        };
        serde_json::from_slice(&bytes).map_err(|err| {
            SettingsError::Read(format!("{}: {err}", self.path.display()))
        })
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn read(&self) -> Result<RefetchSettings, SettingsError> {
        self.load().await
    }

    async fn write(
        &self,
        patch: RefetchSettingsPatch,
    ) -> Result<RefetchSettings, SettingsError> {
        let _guard = self.write_lock.lock().await;

        let current = match self.load().await {
            Ok(current) => current,
            Err(err) => {
                warn!(
                    error = %err,
                    "settings file unreadable; rewriting from defaults"
                );
                RefetchSettings::default()
            }
        };
        let updated = current.apply(patch);

        let bytes = serde_json::to_vec_pretty(&updated)
            .map_err(|err| SettingsError::Write(err.to_string()))?;
        write_atomic(&self.path, &bytes).await.map_err(|err| {
            SettingsError::Write(format!("{}: {err}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "refetch settings saved");
        Ok(updated)
    }
}

/// Settings held only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    settings: Mutex<RefetchSettings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: RefetchSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn read(&self) -> Result<RefetchSettings, SettingsError> {
        Ok(self.settings.lock().await.clone())
    }

    async fn write(
        &self,
        patch: RefetchSettingsPatch,
    ) -> Result<RefetchSettings, SettingsError> {
        let mut settings = self.settings.lock().await;
        *settings = settings.clone().apply(patch);
        Ok(settings.clone())
    }
}
