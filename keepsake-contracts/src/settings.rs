use async_trait::async_trait;
use keepsake_model::{RefetchSettings, RefetchSettingsPatch};

use crate::error::SettingsError;

/// Persistence of an owner's [`RefetchSettings`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings; a store with nothing persisted yields the defaults.
    async fn read(&self) -> Result<RefetchSettings, SettingsError>;

    /// Merge `patch` into the stored settings and return the result.
    async fn write(
        &self,
        patch: RefetchSettingsPatch,
    ) -> Result<RefetchSettings, SettingsError>;
}
