//! Linear kernel implementation

use crate::core::SvmNode;
use crate::kernel::Kernel;
use std::cmp::Ordering;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two sparse node sequences
///
/// Both sequences have increasing indices, so a merge walk visits each node
/// at most once.
pub(crate) fn dot(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() && !x[i].is_sentinel() && !y[j].is_sentinel() {
        match x[i].index.cmp(&y[j].index) {
            Ordering::Equal => {
                result += x[i].value * y[j].value;
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }

    result
}

#[cfg(test)]
pub(crate) fn nodes(pairs: &[(i32, f64)]) -> Vec<SvmNode> {
    pairs
        .iter()
        .map(|&(index, value)| SvmNode::new(index, value))
        .chain(Some(SvmNode::sentinel()))
        .collect()
}
