use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use rayon::prelude::*;

use crate::{
    backend::texture::ContextId,
    foundation::error::{ResurfaceError, ResurfaceResult},
    image::store::{ImageStore, RestoreOutcome},
    restore::opts::RestoreOpts,
};

/// Counters from one [`ImageRegistry::restore_all`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RestoreStats {
    /// Images that received a new texture (rebuilt, re-allocated, or re-bound).
    pub restored: u64,
    /// History records replayed across all images.
    pub replayed: u64,
    /// Disposed images that were skipped.
    pub skipped_disposed: u64,
}

impl RestoreStats {
    fn record(&mut self, outcome: RestoreOutcome) {
        match outcome {
            RestoreOutcome::Skipped => self.skipped_disposed += 1,
            RestoreOutcome::Current => {}
            RestoreOutcome::Rebound | RestoreOutcome::Reallocated => self.restored += 1,
            RestoreOutcome::Rebuilt { replayed } => {
                self.restored += 1;
                self.replayed += replayed as u64;
            }
        }
    }
}

/// Weak set of every live image; drives restore, volatile clears, and history flattening.
///
/// Entries do not keep images alive. Dropped images are pruned whenever the set is walked.
#[derive(Default)]
pub struct ImageRegistry {
    images: Mutex<Vec<Weak<ImageStore>>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, image: &Arc<ImageStore>) {
        self.lock().push(Arc::downgrade(image));
    }

    /// Number of images still alive.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when any registered image lost its texture under `context`.
    pub fn any_invalidated(&self, context: ContextId) -> bool {
        self.snapshot()
            .iter()
            .any(|img| img.is_invalidated(context))
    }

    /// Rebuild every registered image under `context`.
    ///
    /// Images without pending history go first; images with history follow, so replays usually
    /// find their sources already rebuilt. Restores inside one pass run on a rayon pool when
    /// `opts.parallel` is set.
    #[tracing::instrument(skip(self, opts))]
    pub fn restore_all(
        &self,
        context: ContextId,
        opts: &RestoreOpts,
    ) -> ResurfaceResult<RestoreStats> {
        opts.validate()?;
        let (with_history, without_history): (Vec<_>, Vec<_>) = self
            .snapshot()
            .into_iter()
            .partition(|img| img.has_history());

        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };

        let mut stats = RestoreStats::default();
        for pass in [without_history, with_history] {
            let outcomes = match &pool {
                Some(pool) => pool.install(|| {
                    pass.par_iter()
                        .map(|img| img.restore(context))
                        .collect::<Vec<_>>()
                }),
                None => pass.iter().map(|img| img.restore(context)).collect(),
            };
            for outcome in outcomes {
                stats.record(outcome?);
            }
        }

        tracing::debug!(?stats, "restore pass finished");
        Ok(stats)
    }

    /// Frame boundary: reset every volatile image to transparent.
    ///
    /// Images whose history draws from a volatile image are flattened first, since the volatile
    /// content is about to go away.
    pub fn clear_volatile_images(&self) -> ResurfaceResult<()> {
        let images = self.snapshot();
        for img in images
            .iter()
            .filter(|img| img.is_volatile() && !img.is_disposed())
        {
            flatten_dependents(&images, img);
            img.clear_if_volatile()?;
        }
        Ok(())
    }

    /// Flatten every image whose history draws from `target`. Returns how many were flattened.
    pub fn reset_history_if_needed(&self, target: &ImageStore) -> usize {
        flatten_dependents(&self.snapshot(), target)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Weak<ImageStore>>> {
        self.images.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<ImageStore>> {
        let mut images = self.lock();
        images.retain(|w| w.strong_count() > 0);
        images.iter().filter_map(Weak::upgrade).collect()
    }
}

impl std::fmt::Debug for ImageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRegistry")
            .field("entries", &self.lock().len())
            .finish()
    }
}

fn flatten_dependents(images: &[Arc<ImageStore>], target: &ImageStore) -> usize {
    images
        .iter()
        .filter(|img| !std::ptr::eq(Arc::as_ptr(img), target))
        .filter(|img| img.reset_history_if_needed(target))
        .count()
}

fn build_thread_pool(threads: Option<usize>) -> ResurfaceResult<rayon::ThreadPool> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ResurfaceError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/restore/coordinator.rs"]
mod tests;
