//! Mixed-media random selection.
//!
//! Videos are capped at half of the target count so a batch of large files
//! cannot dominate the local cache; the remaining slots go to images. Items
//! that are neither images nor videos are never selected.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use keepsake_model::{MediaItem, MediaKind};
use rand::{
    Rng, SeedableRng,
    rngs::StdRng,
    seq::{IndexedRandom, SliceRandom},
};

/// Strategy used by the orchestrator to pick a batch of memories.
pub trait MemorySelector: Send + Sync + fmt::Debug {
    fn select(&self, items: &[MediaItem], target: usize) -> Vec<MediaItem>;
}

/// Largest number of videos a batch of `target` items may contain.
pub const fn max_videos_for(target: usize) -> usize {
    target / 2
}

/// Select up to `target` items with at most `target / 2` videos.
///
/// Both groups are sampled uniformly without replacement and the combined
/// batch is shuffled once more so videos and images interleave.
pub fn select_mixed<R: Rng + ?Sized>(
    items: &[MediaItem],
    target: usize,
    rng: &mut R,
) -> Vec<MediaItem> {
    if target == 0 || items.is_empty() {
        return Vec::new();
    }

    let mut images: Vec<&MediaItem> = Vec::new();
    let mut videos: Vec<&MediaItem> = Vec::new();
    for item in items {
        match item.kind() {
            MediaKind::Image => images.push(item),
            MediaKind::Video => videos.push(item),
            MediaKind::Other => {}
        }
    }

    let video_take = max_videos_for(target).min(videos.len());
    let mut selected: Vec<&MediaItem> = videos
        .choose_multiple(rng, video_take)
        .copied()
        .collect();

    let image_take = (target - selected.len()).min(images.len());
    selected.extend(images.choose_multiple(rng, image_take).copied());

    selected.shuffle(rng);
    selected.into_iter().cloned().collect()
}

/// [`select_mixed`] over an owned random source.
pub struct MixedMediaSelector<R = StdRng> {
    rng: Mutex<R>,
}

impl MixedMediaSelector<StdRng> {
    /// Selector seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible selector for tests and debugging.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for MixedMediaSelector<StdRng> {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

impl<R> MixedMediaSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl<R> fmt::Debug for MixedMediaSelector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixedMediaSelector").finish_non_exhaustive()
    }
}

impl<R: Rng + Send> MemorySelector for MixedMediaSelector<R> {
    fn select(&self, items: &[MediaItem], target: usize) -> Vec<MediaItem> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        select_mixed(items, target, &mut *rng)
    }
}
