//! Generation-scoped entity tag memoization.
//!
//! Each `DocumentStore` owns one cache. Entries are valid only for the
//! commit generation they were computed from; `invalidate` is called on
//! every successful commit.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::versioning::tag::EntityTag;

/// Per-store tag cache.
#[derive(Debug, Default)]
pub struct TagCache {
    generation: AtomicU64,
    /// Each tag carries the generation it was computed at; a racing insert
    /// from an older generation is never served.
    tags: DashMap<String, (u64, EntityTag)>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached tag for `key` at `generation`, computing it with
    /// `compute` on a miss. A result computed for a generation other than
    /// the current one is returned but not stored.
    pub fn get_or_compute<F>(&self, generation: u64, key: &str, compute: F) -> EntityTag
    where
        F: FnOnce() -> EntityTag,
    {
        if let Some(entry) = self.tags.get(key) {
            let (cached_at, tag) = entry.value();
            if *cached_at == generation && self.current() == generation {
                return tag.clone();
            }
        }

        let tag = compute();
        if self.current() == generation {
            self.tags.insert(key.to_string(), (generation, tag.clone()));
        }
        tag
    }

    /// Drop every entry and move to `generation`.
    pub fn invalidate(&self, generation: u64) {
        self.generation.fetch_max(generation, Ordering::AcqRel);
        let current = self.current();
        self.tags.retain(|_, (cached_at, _)| *cached_at == current);
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
