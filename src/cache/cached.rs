//! A kernel paired with its row cache

use crate::cache::{CacheStats, KernelCache};
use crate::core::{CacheSize, Result, SVMError};
use crate::features::FeatureSet;
use crate::kernel::Kernel;
use rayon::prelude::*;
use std::sync::Arc;

/// Rows at least this long are evaluated across rayon workers
const PARALLEL_ROW_THRESHOLD: usize = 256;

/// Kernel with a row cache that never outlives the kernel's binding
///
/// The wrapped kernel can only be rebound through [`CachedKernel::init`],
/// which clears the cache first, so every cached row was computed under
/// the current (left, right) pairing.
pub struct CachedKernel<K: Kernel> {
    kernel: K,
    cache: KernelCache,
    cache_size: CacheSize,
}

impl<K: Kernel> CachedKernel<K> {
    /// Wrap `kernel` (bound or not) with a cache of the given budget
    pub fn new(kernel: K, cache_size: CacheSize) -> Self {
        Self {
            cache: Self::cache_for(&kernel, cache_size),
            kernel,
            cache_size,
        }
    }

    // Never more rows than the binding has; a single slot while unbound
    fn cache_for(kernel: &K, cache_size: CacheSize) -> KernelCache {
        if !kernel.is_initialized() {
            return KernelCache::new(1, 0);
        }
        let row_len = kernel.num_rhs();
        let rows = cache_size.rows_for(row_len).min(kernel.num_lhs().max(1));
        KernelCache::new(rows, row_len)
    }

    /// Rebind the kernel; the cache is invalidated even if binding fails
    pub fn init(&mut self, left: Arc<FeatureSet>, right: Arc<FeatureSet>) -> Result<()> {
        self.cache.invalidate();
        let bound = self.kernel.init(left, right);
        self.cache = Self::cache_for(&self.kernel, self.cache_size);
        bound
    }

    /// Kernel row `i`: K(i, j) for every right-hand element `j`
    pub fn row(&self, i: usize) -> Result<Arc<[f64]>> {
        self.cache.get_or_insert_with(i, || self.compute_row(i))
    }

    /// K(i, j) through the row cache
    pub fn get_or_compute(&self, i: usize, j: usize) -> Result<f64> {
        let row = self.row(i)?;
        match row.get(j) {
            Some(&value) => Ok(value),
            None => self.kernel.compute(i, j),
        }
    }

    /// K(i, j) straight from the kernel, bypassing the cache
    pub fn compute(&self, i: usize, j: usize) -> Result<f64> {
        self.kernel.compute(i, j)
    }

    /// K(i, i) for every left-hand element
    pub fn diagonal(&self) -> Result<Vec<f64>> {
        (0..self.kernel.num_lhs())
            .map(|i| self.kernel.compute(i, i))
            .collect()
    }

    fn compute_row(&self, i: usize) -> Result<Vec<f64>> {
        if !self.kernel.is_initialized() {
            // Surfaces the kernel's own unbound error
            self.kernel.compute(i, 0)?;
        }
        let n = self.kernel.num_rhs();
        if i >= self.kernel.num_lhs() {
            return Err(SVMError::IndexOutOfBounds {
                i,
                j: 0,
                lhs: self.kernel.num_lhs(),
                rhs: n,
            });
        }
        if n >= PARALLEL_ROW_THRESHOLD {
            (0..n)
                .into_par_iter()
                .map(|j| self.kernel.compute(i, j))
                .collect()
        } else {
            let mut row = vec![0.0; n];
            self.kernel.compute_row(i, &mut row)?;
            Ok(row)
        }
    }

    /// Drop every cached row
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn into_inner(self) -> K {
        self.kernel
    }
}
