use std::fmt;

use keepsake_model::{MediaId, Memory};

use crate::error::MemoryError;

/// Where the memories of a [`MemorySet`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrigin {
    /// Freshly selected from the remote library.
    Fresh,
    /// Loaded from the local cache.
    Cache,
}

/// User-visible notice attached to a settled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Offline and nothing has been cached yet.
    NoCachedMemories,
    /// The remote fetch failed; the previous cached batch is shown instead.
    ShowingCached,
    /// A forced refetch produced a new batch.
    Refreshed { count: usize },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::NoCachedMemories => f.write_str(
                "You're offline. No cached memories available; \
                 connect to the internet to load new memories.",
            ),
            Advisory::ShowingCached => f.write_str(
                "Could not load new memories. Showing cached memories.",
            ),
            Advisory::Refreshed { count } => {
                write!(f, "Memories refreshed: {count} new memories loaded.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySet {
    pub memories: Vec<Memory>,
    pub origin: MemoryOrigin,
    pub advisory: Option<Advisory>,
}

impl MemorySet {
    pub fn fresh(memories: Vec<Memory>) -> Self {
        Self {
            memories,
            origin: MemoryOrigin::Fresh,
            advisory: None,
        }
    }

    pub fn cached(memories: Vec<Memory>) -> Self {
        Self {
            memories,
            origin: MemoryOrigin::Cache,
            advisory: None,
        }
    }

    pub fn with_advisory(mut self, advisory: Option<Advisory>) -> Self {
        self.advisory = advisory;
        self
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.memories.iter().any(|m| &m.id == id)
    }
}

/// Terminal failure of a refetch; the presentation layer may retry.
#[derive(Debug, Clone)]
pub struct FailedState {
    pub error: MemoryError,
}

impl FailedState {
    pub fn advisory(&self) -> &'static str {
        "Failed to load memories. Please try again."
    }
}

/// Presentation-facing state of the memory orchestrator.
#[derive(Debug, Clone, Default)]
pub enum MemoryState {
    #[default]
    Idle,
    Loading,
    Ready(MemorySet),
    Failed(FailedState),
}

impl MemoryState {
    pub fn memories(&self) -> &[Memory] {
        match self {
            MemoryState::Ready(set) => &set.memories,
            _ => &[],
        }
    }

    pub fn as_ready(&self) -> Option<&MemorySet> {
        match self {
            MemoryState::Ready(set) => Some(set),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, MemoryState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MemoryState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            MemoryState::Idle => "idle",
            MemoryState::Loading => "loading",
            MemoryState::Ready(_) => "ready",
            MemoryState::Failed(_) => "failed",
        }
    }
}
