//! Refetch timing and cache budget admission.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use keepsake_model::{ByteSize, CachedMemory, MediaId, RefetchSettings};

use crate::time::{Clock, SystemClock};

/// Decide whether a refetch is due at `now`.
///
/// Never-refetched settings and unknown frequencies are always due. A last
/// refetch time in the future counts as zero elapsed time.
pub fn is_due_at(settings: &RefetchSettings, now: DateTime<Utc>) -> bool {
    let Some(last) = settings.last_refetch_time else {
        return true;
    };
    let Some(threshold_hours) = settings.frequency.threshold_hours() else {
        return true;
    };
    let elapsed = now.signed_duration_since(last).max(Duration::zero());
    elapsed >= Duration::hours(threshold_hours)
}

/// Clock-bound refetch policy.
#[derive(Debug, Clone)]
pub struct RefetchPolicy {
    clock: Arc<dyn Clock>,
}

impl Default for RefetchPolicy {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RefetchPolicy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn is_due(&self, settings: &RefetchSettings) -> bool {
        is_due_at(settings, self.clock.now())
    }

    /// Record a successful refetch at the current instant.
    pub fn mark_refetched(&self, settings: RefetchSettings) -> RefetchSettings {
        RefetchSettings {
            last_refetch_time: Some(self.clock.now()),
            ..settings
        }
    }
}

/// Result of running a batch through a [`CacheBudget`].
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: Vec<CachedMemory>,
    pub rejected: Vec<MediaId>,
    pub admitted_bytes: ByteSize,
}

/// Upper bound on the payload bytes a single cache generation may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheBudget {
    max: ByteSize,
}

impl CacheBudget {
    /// A zero budget disables the limit.
    pub fn new(max: ByteSize) -> Self {
        Self { max }
    }

    pub fn unlimited() -> Self {
        Self { max: ByteSize::ZERO }
    }

    pub fn max(&self) -> ByteSize {
        self.max
    }

    /// Keep records in order while the running total fits; records that
    /// would overflow are rejected and later, smaller ones may still fit.
    pub fn admit(&self, batch: Vec<CachedMemory>) -> Admission {
        let mut admission = Admission::default();
        for record in batch {
            let next = admission
                .admitted_bytes
                .saturating_add(record.payload_len());
            if !self.max.is_zero() && next > self.max {
                admission.rejected.push(record.id.clone());
                continue;
            }
            admission.admitted_bytes = next;
            admission.admitted.push(record);
        }
        admission
    }
}
