//! Background materialization of a freshly selected batch into the cache.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use keepsake_contracts::{CacheError, MemoryCacheStore, RemoteLibrary};
use keepsake_model::{CachedMemory, MediaId, MediaItem};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::policy::CacheBudget;
use crate::time::Clock;

/// Monotonic refetch generations.
///
/// Every refetch takes a new generation when it starts. A write-through only
/// commits if no newer generation has committed before it; the commit lock is
/// held across `clear` + `put_all` so two generations never interleave.
#[derive(Debug, Default)]
pub(crate) struct Generations {
    issued: AtomicU64,
    committed: Mutex<u64>,
}

impl Generations {
    pub(crate) fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Mark everything issued so far as superseded.
    pub(crate) async fn fence(&self) {
        let mut committed = self.committed.lock().await;
        *committed = (*committed).max(self.latest_issued());
    }
}

/// What happened to one write-through run.
#[derive(Debug, Clone, Default)]
pub struct WriteThroughReport {
    pub generation: u64,
    pub attempted: usize,
    pub cached: Vec<MediaId>,
    /// Items whose bytes could not be decoded or retrieved.
    pub unresolved: Vec<MediaId>,
    /// Items dropped because they did not fit the cache budget.
    pub over_budget: Vec<MediaId>,
    /// Items the cache refused to store.
    pub write_failures: Vec<MediaId>,
    /// A newer generation committed first; nothing was written.
    pub superseded: bool,
    /// The cache failed as a whole. A failed `clear` keeps the previous
    /// batch; a failed write after a successful `clear` leaves the cache
    /// empty.
    pub error: Option<CacheError>,
}

impl WriteThroughReport {
    pub fn is_committed(&self) -> bool {
        !self.superseded && self.error.is_none()
    }
}

pub(crate) struct WriteThrough {
    pub(crate) library: Arc<dyn RemoteLibrary>,
    pub(crate) cache: Arc<dyn MemoryCacheStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) generations: Arc<Generations>,
}

impl WriteThrough {
    pub(crate) async fn run(
        self,
        generation: u64,
        items: Vec<MediaItem>,
        budget: CacheBudget,
    ) -> WriteThroughReport {
        let mut report = WriteThroughReport {
            generation,
            attempted: items.len(),
            ..WriteThroughReport::default()
        };

        let mut batch = Vec::with_capacity(items.len());
        for item in &items {
            match self.library.resolve_bytes(item).await {
                Ok(bytes) => batch.push(CachedMemory::from_item(
                    item,
                    bytes,
                    self.clock.now(),
                )),
                Err(err) => {
                    warn!(
                        media_id = %item.id,
                        file_name = %item.file_name,
                        error = %err,
                        "skipping memory that could not be resolved"
                    );
                    report.unresolved.push(item.id.clone());
                }
            }
        }

        let admission = budget.admit(batch);
        if !admission.rejected.is_empty() {
            warn!(
                dropped = admission.rejected.len(),
                budget = %budget.max(),
                "memories exceed the cache budget; caching a partial batch"
            );
        }
        report.over_budget = admission.rejected;

        let mut committed = self.generations.committed.lock().await;
        if *committed >= generation {
            debug!(
                generation,
                committed = *committed,
                "discarding stale memory write-through"
            );
            report.superseded = true;
            return report;
        }

        if let Err(err) = self.cache.clear().await {
            warn!(
                generation,
                error = %err,
                "memory cache clear failed; keeping previous batch"
            );
            report.error = Some(err);
            return report;
        }

        match self.cache.put_all(admission.admitted).await {
            Ok(put) => {
                for (id, err) in &put.failed {
                    warn!(
                        media_id = %id,
                        error = %err,
                        "memory could not be cached"
                    );
                }
                report.write_failures =
                    put.failed.into_iter().map(|(id, _)| id).collect();
                report.cached = put.written;
            }
            Err(err) => {
                warn!(generation, error = %err, "memory cache write failed");
                report.error = Some(err);
                *committed = generation;
                return report;
            }
        }

        *committed = generation;
        info!(
            generation,
            cached = report.cached.len(),
            unresolved = report.unresolved.len(),
            over_budget = report.over_budget.len(),
            bytes = %admission.admitted_bytes,
            "memory batch cached"
        );
        report
    }
}
