//! # Keepsake Core
//!
//! The memory resurfacing and offline cache engine.
//!
//! ## Overview
//!
//! Once per configured period a user is shown a small, randomly chosen batch of
//! their own photos and videos ("memories"). This crate decides when a new
//! batch is due, picks it, keeps it viewable offline and degrades gracefully
//! when the network or individual items misbehave.
//!
//! - [`memories::policy`]: refetch timing and cache budget admission
//! - [`memories::selection`]: mixed-media random selection with a video cap
//! - [`memories::orchestrator`]: the refetch state machine and write-through
//! - [`infra::cache`]: durable local cache of materialized memories
//! - [`infra::remote`]: HTTP accessor for the remote library
//! - [`infra::settings`]: persisted refetch settings
//! - [`infra::connectivity`]: online/offline signal and probe
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use keepsake_core::{
//!     infra::{
//!         cache::InMemoryMemoryCache, connectivity::ConnectivitySignal,
//!         remote::HttpRemoteLibrary, settings::InMemorySettingsStore,
//!     },
//!     memories::MemoryOrchestrator,
//! };
//! use keepsake_model::OwnerId;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let library = HttpRemoteLibrary::new(
//!     "https://vault.example".parse()?,
//!     std::time::Duration::from_secs(10),
//! )?;
//! let connectivity = ConnectivitySignal::new(true);
//! let orchestrator = MemoryOrchestrator::builder(
//!     Arc::new(library),
//!     Arc::new(InMemoryMemoryCache::default()),
//!     Arc::new(InMemorySettingsStore::default()),
//! )
//! .owner(OwnerId::new("alice")?)
//! .connectivity(connectivity.watch())
//! .build();
//!
//! let outcome = orchestrator.refetch_now(false).await;
//! println!("{:?}", outcome.state);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod infra;
pub mod memories;
pub mod time;

pub use error::{MemoryError, Result};
