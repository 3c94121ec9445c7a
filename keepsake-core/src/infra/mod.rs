//! Concrete adapters behind the contracts: disk and in-memory caches, the
//! HTTP remote library, settings persistence and the connectivity signal.

pub mod cache;
pub mod connectivity;
pub mod dirs;
pub mod fs;
pub mod remote;
pub mod settings;
