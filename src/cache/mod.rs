//! Kernel column cache
//!
//! Each SMO step needs the full kernel column of both working-set variables.
//! Columns are kept in an LRU cache whose capacity is derived from the
//! `cache_size` hyperparameter, as libsvm does.

use lru::LruCache;
use std::mem::size_of;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// LRU cache of kernel columns, keyed by solver variable
pub struct KernelCache {
    columns: LruCache<usize, Rc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` columns
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            columns: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache bounded by `memory_bytes` for columns of `column_len`
    /// values; at least two columns always fit
    pub fn with_memory_limit(memory_bytes: usize, column_len: usize) -> Self {
        let column_bytes = (column_len * size_of::<f64>()).max(1);
        Self::new((memory_bytes / column_bytes).max(2))
    }

    /// Fetch column `i`, computing and inserting it on a miss
    pub fn column(&mut self, i: usize, compute: impl FnOnce() -> Vec<f64>) -> Rc<[f64]> {
        if let Some(column) = self.columns.get(&i) {
            self.hits += 1;
            return Rc::clone(column);
        }

        self.misses += 1;
        let column: Rc<[f64]> = compute().into();
        self.columns.put(i, Rc::clone(&column));
        column
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.columns.cap().get(),
            size: self.columns.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
