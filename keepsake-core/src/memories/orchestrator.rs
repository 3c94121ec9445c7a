//! The refetch state machine.
//!
//! One [`MemoryOrchestrator`] exists per active user session. It owns the
//! in-memory memory set shown to the user and is the only writer of the local
//! memory cache.
//!
//! A refetch runs as a single cooperative task:
//!
//! 1. no owner: `Idle`
//! 2. `Loading`
//! 3. not forced and not due: serve the cache if it has anything
//! 4. offline: serve the cache, possibly empty, with an advisory
//! 5. fetch the remote list and select a batch
//! 6. `Ready` with the fresh batch
//! 7. spawn the write-through of that batch
//! 8. record the refetch time
//!
//! A failed remote fetch falls back to the cache and only becomes `Failed`
//! when the cache has nothing to show.

use std::sync::{Arc, PoisonError, RwLock};

use keepsake_contracts::{MemoryCacheStore, RemoteLibrary, SettingsStore};
use keepsake_model::{
    CacheInfo, MediaId, Memory, OwnerId, RefetchSettings, RefetchSettingsPatch,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{
    policy::{CacheBudget, RefetchPolicy},
    selection::{MemorySelector, MixedMediaSelector},
    state::{Advisory, FailedState, MemorySet, MemoryState},
    write_through::{Generations, WriteThrough, WriteThroughReport},
};
use crate::{
    error::{MemoryError, Result},
    infra::connectivity::ConnectivityWatch,
    time::{Clock, SystemClock},
};

/// Behavioural switches of the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Surface permission errors as `Failed` instead of serving the cache.
    pub fail_fast_on_permission_denied: bool,
}

/// Result of one awaited refetch.
#[derive(Debug)]
pub struct RefetchOutcome {
    pub generation: u64,
    pub state: MemoryState,
    /// Present when a fresh batch is being written through to the cache.
    pub write_through: Option<JoinHandle<WriteThroughReport>>,
}

impl RefetchOutcome {
    fn settled(generation: u64, state: MemoryState) -> Self {
        Self {
            generation,
            state,
            write_through: None,
        }
    }

    /// Wait for the write-through (if any) to finish.
    pub async fn write_through_report(self) -> Option<WriteThroughReport> {
        let handle = self.write_through?;
        match handle.await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(
                    error = %err,
                    "memory write-through task did not complete"
                );
                None
            }
        }
    }
}

pub struct MemoryOrchestratorBuilder {
    library: Arc<dyn RemoteLibrary>,
    cache: Arc<dyn MemoryCacheStore>,
    settings: Arc<dyn SettingsStore>,
    owner: Option<OwnerId>,
    selector: Option<Arc<dyn MemorySelector>>,
    clock: Option<Arc<dyn Clock>>,
    connectivity: Option<ConnectivityWatch>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for MemoryOrchestratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOrchestratorBuilder")
            .field("owner", &self.owner)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MemoryOrchestratorBuilder {
    pub fn owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn maybe_owner(mut self, owner: Option<OwnerId>) -> Self {
        self.owner = owner;
        self
    }

    pub fn selector(mut self, selector: Arc<dyn MemorySelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn connectivity(mut self, connectivity: ConnectivityWatch) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Arc<MemoryOrchestrator> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let (state, _) = watch::channel(MemoryState::Idle);
        Arc::new(MemoryOrchestrator {
            owner: RwLock::new(self.owner),
            library: self.library,
            cache: self.cache,
            settings: self.settings,
            selector: self
                .selector
                .unwrap_or_else(|| Arc::new(MixedMediaSelector::from_os_rng())),
            policy: RefetchPolicy::new(clock),
            connectivity: self
                .connectivity
                .unwrap_or_else(ConnectivityWatch::always_online),
            state,
            generations: Arc::new(Generations::default()),
            options: self.options,
        })
    }
}

pub struct MemoryOrchestrator {
    owner: RwLock<Option<OwnerId>>,
    library: Arc<dyn RemoteLibrary>,
    cache: Arc<dyn MemoryCacheStore>,
    settings: Arc<dyn SettingsStore>,
    selector: Arc<dyn MemorySelector>,
    policy: RefetchPolicy,
    connectivity: ConnectivityWatch,
    state: watch::Sender<MemoryState>,
    generations: Arc<Generations>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for MemoryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryOrchestrator")
            .field("owner", &self.owner())
            .field("state", &self.state.borrow().name())
            .field("online", &self.connectivity.is_online())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MemoryOrchestrator {
    pub fn builder(
        library: Arc<dyn RemoteLibrary>,
        cache: Arc<dyn MemoryCacheStore>,
        settings: Arc<dyn SettingsStore>,
    ) -> MemoryOrchestratorBuilder {
        MemoryOrchestratorBuilder {
            library,
            cache,
            settings,
            owner: None,
            selector: None,
            clock: None,
            connectivity: None,
            options: OrchestratorOptions::default(),
        }
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bind the session to another owner, or to none after sign-out.
    pub fn set_owner(&self, owner: Option<OwnerId>) {
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = owner;
    }

    pub fn state(&self) -> MemoryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MemoryState> {
        self.state.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Fire-and-forget refetch; observe the result through [`Self::subscribe`].
    pub fn refetch(self: &Arc<Self>, force: bool) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _ = this.refetch_now(force).await;
        })
    }

    /// Run one refetch to its settled state.
    ///
    /// The returned state has already been published. A fresh batch is still
    /// being cached in the background when this returns.
    pub async fn refetch_now(&self, force: bool) -> RefetchOutcome {
        let generation = self.generations.begin();

        let Some(owner) = self.owner() else {
            debug!("no owner bound to memory session; staying idle");
            return self.settle(generation, MemoryState::Idle);
        };

        self.publish(MemoryState::Loading);

        let settings = self.read_settings().await;

        if !force && !self.policy.is_due(&settings) {
            let cached = self.load_cached().await;
            if !cached.is_empty() {
                debug!(
                    count = cached.len(),
                    "refetch not due; serving cached memories"
                );
                return self.settle(
                    generation,
                    MemoryState::Ready(MemorySet::cached(cached)),
                );
            }
            debug!("refetch not due but memory cache is empty; fetching");
        }

        if !self.connectivity.is_online() {
            let cached = self.load_cached().await;
            let advisory =
                cached.is_empty().then_some(Advisory::NoCachedMemories);
            info!(count = cached.len(), "offline; serving cached memories");
            return self.settle(
                generation,
                MemoryState::Ready(
                    MemorySet::cached(cached).with_advisory(advisory),
                ),
            );
        }

        let library = match self.library.list_media(&owner).await {
            Ok(items) => items,
            Err(err) => return self.recover(generation, err.into()).await,
        };

        if library.is_empty() {
            info!(owner = %owner, "remote library is empty");
            return self.settle(
                generation,
                MemoryState::Ready(MemorySet::fresh(Vec::new())),
            );
        }

        let selected = self
            .selector
            .select(&library, settings.memory_count.get());
        let memories: Vec<Memory> = selected.iter().map(Memory::from).collect();
        let advisory = force.then_some(Advisory::Refreshed {
            count: memories.len(),
        });
        info!(
            library = library.len(),
            selected = memories.len(),
            forced = force,
            "selected new memories"
        );
        self.publish(MemoryState::Ready(
            MemorySet::fresh(memories).with_advisory(advisory),
        ));

        let write_through = if selected.is_empty() {
            None
        } else {
            let task = WriteThrough {
                library: Arc::clone(&self.library),
                cache: Arc::clone(&self.cache),
                clock: Arc::clone(self.policy.clock()),
                generations: Arc::clone(&self.generations),
            };
            let budget = CacheBudget::new(settings.cache_budget);
            Some(tokio::spawn(task.run(generation, selected, budget)))
        };

        self.record_refetch(settings).await;

        RefetchOutcome {
            generation,
            state: self.state(),
            write_through,
        }
    }

    /// Drop a media item that was deleted elsewhere from the cache and from
    /// the memories currently shown.
    pub async fn forget(&self, id: &MediaId) -> Result<()> {
        self.cache.remove(id).await?;
        self.state.send_if_modified(|state| match state {
            MemoryState::Ready(set) if set.contains(id) => {
                set.memories.retain(|m| &m.id != id);
                true
            }
            _ => false,
        });
        Ok(())
    }

    /// Remove every cached memory and return to `Idle`.
    ///
    /// Write-throughs still in flight are fenced off and will not repopulate
    /// the cache.
    pub async fn purge(&self) -> Result<()> {
        self.generations.fence().await;
        self.cache.clear().await?;
        self.publish(MemoryState::Idle);
        info!("memory cache purged");
        Ok(())
    }

    pub async fn cache_info(&self) -> Result<CacheInfo> {
        Ok(self.cache.info().await?)
    }

    async fn recover(
        &self,
        generation: u64,
        error: MemoryError,
    ) -> RefetchOutcome {
        if self.options.fail_fast_on_permission_denied
            && error.is_permission_denied()
        {
            warn!(error = %error, "memory refetch denied by remote library");
            return self.settle(
                generation,
                MemoryState::Failed(FailedState { error }),
            );
        }

        warn!(error = %error, "memory refetch failed; falling back to cache");
        let cached = self.load_cached().await;
        if cached.is_empty() {
            return self.settle(
                generation,
                MemoryState::Failed(FailedState { error }),
            );
        }
        self.settle(
            generation,
            MemoryState::Ready(
                MemorySet::cached(cached)
                    .with_advisory(Some(Advisory::ShowingCached)),
            ),
        )
    }

    async fn read_settings(&self) -> RefetchSettings {
        match self.settings.read().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    error = %err,
                    "refetch settings unavailable; using defaults"
                );
                RefetchSettings::default()
            }
        }
    }

    async fn record_refetch(&self, settings: RefetchSettings) {
        let marked = self.policy.mark_refetched(settings);
        let patch = RefetchSettingsPatch {
            last_refetch_time: Some(marked.last_refetch_time),
            ..RefetchSettingsPatch::default()
        };
        if let Err(err) = self.settings.write(patch).await {
            warn!(error = %err, "failed to record refetch time");
        }
    }

    async fn load_cached(&self) -> Vec<Memory> {
        match self.cache.get_all().await {
            Ok(records) => records.into_iter().map(Memory::from).collect(),
            Err(err) => {
                warn!(
                    error = %err,
                    "memory cache unreadable; treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn publish(&self, state: MemoryState) {
        debug!(state = state.name(), "memory state transition");
        self.state.send_replace(state);
    }

    fn settle(&self, generation: u64, state: MemoryState) -> RefetchOutcome {
        self.publish(state.clone());
        RefetchOutcome::settled(generation, state)
    }
}
