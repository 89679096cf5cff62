//! Signed kernel matrix `Q_ij = y_i y_j K(x_i, x_j)`

use crate::cache::KernelCache;
use crate::core::SvmNode;
use crate::kernel::{Kernel, KernelFunction};
use std::rc::Rc;

/// Lazily evaluated `Q` over the solver variables
///
/// A variable refers to a training row through `index`; epsilon-SVR maps
/// two variables onto every row.
pub struct QMatrix<'a> {
    rows: Vec<&'a [SvmNode]>,
    index: Vec<usize>,
    y: Vec<f64>,
    kernel: KernelFunction,
    cache: KernelCache,
    diag: Vec<f64>,
}

impl<'a> QMatrix<'a> {
    /// # Panics
    /// Panics if `index` and `y` differ in length or `index` points past `rows`
    pub fn new(
        rows: Vec<&'a [SvmNode]>,
        index: Vec<usize>,
        y: Vec<f64>,
        kernel: KernelFunction,
        cache_bytes: usize,
    ) -> Self {
        assert_eq!(index.len(), y.len(), "every variable needs a sign");

        let diag = index
            .iter()
            .map(|&r| kernel.compute(rows[r], rows[r]))
            .collect();
        let cache = KernelCache::with_memory_limit(cache_bytes, index.len());

        Self {
            rows,
            index,
            y,
            kernel,
            cache,
            diag,
        }
    }

    /// One variable per row, the common case
    pub fn for_rows(
        rows: Vec<&'a [SvmNode]>,
        y: Vec<f64>,
        kernel: KernelFunction,
        cache_bytes: usize,
    ) -> Self {
        let index = (0..rows.len()).collect();
        Self::new(rows, index, y, kernel, cache_bytes)
    }

    /// Number of solver variables
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// `Q_ii`
    pub fn diag(&self, i: usize) -> f64 {
        self.diag[i]
    }

    /// Column `i` of `Q` over all variables
    pub fn column(&mut self, i: usize) -> Rc<[f64]> {
        let Self {
            rows,
            index,
            y,
            kernel,
            cache,
            ..
        } = self;

        cache.column(i, || {
            let x_i = rows[index[i]];
            index
                .iter()
                .zip(y.iter())
                .map(|(&r, &y_k)| y[i] * y_k * kernel.compute(x_i, rows[r]))
                .collect()
        })
    }
}
