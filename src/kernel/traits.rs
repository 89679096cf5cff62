//! Kernel trait definition

use crate::core::SvmNode;

/// Kernel function trait
///
/// Operands are sentinel-terminated node sequences exactly as they sit in a
/// training arena or a marshaled feature vector; evaluation stops at the
/// first `-1` index.
pub trait Kernel {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64;
}
