use std::time::Duration;

use crate::models::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.items.iter().any(|w| w.message.contains(needle))
    }
}

const MIN_PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Non-fatal observations about a resolved configuration.
pub fn check(config: &Config) -> ConfigWarnings {
    let mut warnings = ConfigWarnings::default();

    if config.owner.is_none() {
        warnings.push_with_hint(
            "No owner configured; refetches stay idle",
            "Set KEEPSAKE_OWNER or `owner` in keepsake.toml",
        );
    }

    if config.remote.url.is_none() {
        warnings.push_with_hint(
            "No remote library URL configured; \
             only cached memories are available",
            "Set KEEPSAKE_REMOTE_URL or [remote].url",
        );
    }

    if let Some(interval) = config.remote.probe_interval
        && interval < MIN_PROBE_INTERVAL
    {
        warnings.push(format!(
            "Connectivity probe interval {} is very short",
            humantime::format_duration(interval)
        ));
    }

    if config.cache.budget.is_zero() {
        warnings.push(
            "Cache budget is 0; cached memories are not size limited",
        );
    }

    warnings
}
