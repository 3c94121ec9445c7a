use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::units::ByteSize;

/// How often a new batch of memories is selected.
///
/// Values this build does not recognise deserialize to `Unknown`, which the
/// refetch policy treats as always due.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RefetchFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    #[serde(other)]
    Unknown,
}

impl RefetchFrequency {
    /// Hours that must elapse between refetches, `None` when unknown.
    pub const fn threshold_hours(self) -> Option<i64> {
        match self {
            RefetchFrequency::Daily => Some(24),
            RefetchFrequency::Weekly => Some(24 * 7),
            RefetchFrequency::Monthly => Some(24 * 30),
            RefetchFrequency::Unknown => None,
        }
    }

    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];
}

impl fmt::Display for RefetchFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefetchFrequency::Daily => write!(f, "daily"),
            RefetchFrequency::Weekly => write!(f, "weekly"),
            RefetchFrequency::Monthly => write!(f, "monthly"),
            RefetchFrequency::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for RefetchFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(RefetchFrequency::Daily),
            "weekly" => Ok(RefetchFrequency::Weekly),
            "monthly" => Ok(RefetchFrequency::Monthly),
            other => Err(format!(
                "unknown refetch frequency '{other}' \
                 (expected daily, weekly or monthly)"
            )),
        }
    }
}

/// Target size of a memory batch, clamped to `MIN..=MAX`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(from = "u32", into = "u32")]
pub struct MemoryCount(u8);

impl MemoryCount {
    pub const MIN: u8 = 5;
    pub const MAX: u8 = 10;
    pub const DEFAULT: Self = Self(8);

    pub fn new(count: u32) -> Self {
        let clamped = count.clamp(u32::from(Self::MIN), u32::from(Self::MAX));
        Self(clamped as u8)
    }

    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for MemoryCount {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for MemoryCount {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<MemoryCount> for u32 {
    fn from(value: MemoryCount) -> Self {
        u32::from(value.0)
    }
}

impl fmt::Display for MemoryCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user resurfacing preferences plus refetch bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefetchSettings {
    pub frequency: RefetchFrequency,
    /// `None` means never refetched; the next refetch is due immediately.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_refetch_time: Option<DateTime<Utc>>,
    pub memory_count: MemoryCount,
    pub cache_budget: ByteSize,
}

impl RefetchSettings {
    pub const DEFAULT_CACHE_BUDGET: ByteSize = ByteSize::from_mib(100);

    pub fn apply(mut self, patch: RefetchSettingsPatch) -> Self {
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(last) = patch.last_refetch_time {
            self.last_refetch_time = last;
        }
        if let Some(count) = patch.memory_count {
            self.memory_count = count;
        }
        if let Some(budget) = patch.cache_budget {
            self.cache_budget = budget;
        }
        self
    }
}

impl Default for RefetchSettings {
    fn default() -> Self {
        Self {
            frequency: RefetchFrequency::Daily,
            last_refetch_time: None,
            memory_count: MemoryCount::DEFAULT,
            cache_budget: Self::DEFAULT_CACHE_BUDGET,
        }
    }
}

/// Partial update of [`RefetchSettings`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefetchSettingsPatch {
    pub frequency: Option<RefetchFrequency>,
    /// `Some(None)` resets the schedule so the next refetch is due at once.
    pub last_refetch_time: Option<Option<DateTime<Utc>>>,
    pub memory_count: Option<MemoryCount>,
    pub cache_budget: Option<ByteSize>,
}

impl RefetchSettingsPatch {
    pub fn refetched_at(at: DateTime<Utc>) -> Self {
        Self {
            last_refetch_time: Some(Some(at)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
