//! Kernel cache implementation
//!
//! Provides an LRU cache of kernel matrix rows to avoid redundant computations
//! in the SMO solver. Decomposition methods read whole rows, so rows are the
//! unit of caching and eviction.

pub mod cached;

pub use self::cached::*;

use crate::core::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// LRU cache for kernel matrix rows
///
/// Rows are shared as `Arc<[f64]>`, so the lock is held only for the
/// lookup or insertion itself; readers keep using a row after it has been
/// evicted.
pub struct KernelCache {
    rows: Mutex<LruCache<usize, Arc<[f64]>>>,
    row_len: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl KernelCache {
    /// Create a new kernel cache holding up to `capacity` rows of `row_len` values
    pub fn new(capacity: usize, row_len: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            rows: Mutex::new(LruCache::new(capacity)),
            row_len,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // Every insertion is a single `put`, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, LruCache<usize, Arc<[f64]>>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a cached row, marking it most recently used
    pub fn get(&self, i: usize) -> Option<Arc<[f64]>> {
        let row = self.lock().get(&i).cloned();
        let counter = if row.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        row
    }

    /// Put a row into the cache, evicting the least recently used row if full
    pub fn put(&self, i: usize, row: Arc<[f64]>) {
        debug_assert_eq!(row.len(), self.row_len);
        self.lock().put(i, row);
    }

    /// Cached row `i`, or compute it with `compute` and store it.
    ///
    /// `compute` runs without holding the lock. Two threads missing on the
    /// same row may both compute it; the values are identical and the second
    /// insertion just refreshes the entry.
    pub fn get_or_insert_with<F>(&self, i: usize, compute: F) -> Result<Arc<[f64]>>
    where
        F: FnOnce() -> Result<Vec<f64>>,
    {
        if let Some(row) = self.get(i) {
            return Ok(row);
        }
        let row: Arc<[f64]> = compute()?.into();
        self.put(i, Arc::clone(&row));
        Ok(row)
    }

    /// Whether row `i` is cached, without touching recency or counters
    pub fn contains(&self, i: usize) -> bool {
        self.lock().contains(&i)
    }

    /// Length of every cached row
    pub fn row_len(&self) -> usize {
        self.row_len
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let rows = self.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            capacity: rows.cap().get(),
            size: rows.len(),
        }
    }

    /// Drop every cached row and reset the counters
    pub fn invalidate(&self) {
        self.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Capacity in rows
    pub capacity: usize,
    /// Rows currently cached
    pub size: usize,
}
