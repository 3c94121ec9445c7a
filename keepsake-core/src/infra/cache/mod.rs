//! Local durable caches of materialized memories.

pub mod blob_store;
pub mod disk;
pub mod in_memory;

pub use blob_store::{
    BlobReadError, MemoryBlobStore, MemoryCacheRoot, StoredBlob,
};
pub use disk::DiskMemoryCache;
pub use in_memory::InMemoryMemoryCache;
