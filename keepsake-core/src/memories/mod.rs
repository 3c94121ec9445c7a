//! Memory resurfacing: when to refetch, what to pick, and how the batch is
//! kept around for offline viewing.

pub mod orchestrator;
pub mod policy;
pub mod selection;
pub mod state;
pub mod write_through;

pub use orchestrator::{
    MemoryOrchestrator, MemoryOrchestratorBuilder, OrchestratorOptions,
    RefetchOutcome,
};
pub use policy::{Admission, CacheBudget, RefetchPolicy, is_due_at};
pub use selection::{
    MemorySelector, MixedMediaSelector, max_videos_for, select_mixed,
};
pub use state::{Advisory, FailedState, MemoryOrigin, MemorySet, MemoryState};
pub use write_through::WriteThroughReport;
