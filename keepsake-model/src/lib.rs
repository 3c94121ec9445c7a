//! Core data model definitions shared across Keepsake crates.

pub mod error;
pub mod ids;
pub mod media;
pub mod memory;
pub mod settings;
pub mod units;

pub use error::{ModelError, Result as ModelResult};
pub use ids::{MediaId, OwnerId};
pub use media::{
    ContentSource, InlinePayload, MediaItem, MediaItemWire, MediaKind,
};
pub use memory::{CacheInfo, CachedMemory, Memory, MemorySource};
pub use settings::{
    MemoryCount, RefetchFrequency, RefetchSettings, RefetchSettingsPatch,
};
pub use units::ByteSize;
