//! Memoized dispatch outcomes.
//!
//! Keyed by generic name, then by the exact tuple of concrete classes. Only
//! successful resolutions are stored; a failed lookup leaves the cache as it
//! was. Entries for a generic are dropped whenever its method set changes,
//! and the whole cache is dropped whenever the class hierarchy changes.
//!
//! Reads take a shared lock and writes an exclusive one, so concurrent
//! dispatches only contend with registrations.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::class::ClassName;
use crate::resolve::Resolution;

/// Hit/miss counters and current size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Default)]
pub struct DispatchCache {
    entries: RwLock<FxHashMap<String, FxHashMap<Vec<ClassName>, Resolution>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DispatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previous outcome, counting the hit or miss.
    pub fn get(&self, generic: &str, classes: &[ClassName]) -> Option<Resolution> {
        let found = self
            .entries
            .read()
            .get(generic)
            .and_then(|by_classes| by_classes.get(classes))
            .cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn insert(&self, classes: Vec<ClassName>, resolution: Resolution) {
        self.entries
            .write()
            .entry(resolution.generic.clone())
            .or_default()
            .insert(classes, resolution);
    }

    /// Drop every entry for one generic.
    pub fn invalidate_generic(&self, generic: &str) {
        if let Some(dropped) = self.entries.write().remove(generic) {
            tracing::debug!(generic, entries = dropped.len(), "invalidated dispatch cache");
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            tracing::debug!(generics = entries.len(), "cleared dispatch cache");
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
