//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! where γ (gamma) is a hyperparameter that controls the kernel width.

use crate::core::SvmNode;
use crate::kernel::Kernel;
use std::cmp::Ordering;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfKernel {
    pub gamma: f64,
}

impl RbfKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl Kernel for RbfKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }
}

/// Squared Euclidean distance between two sparse node sequences
///
/// Indices present in only one operand contribute their squared value.
fn squared_distance(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let features = |v: &[SvmNode]| v.iter().take_while(|node| !node.is_sentinel()).count();
    let (x, y) = (&x[..features(x)], &y[..features(y)]);

    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() {
        match x[i].index.cmp(&y[j].index) {
            Ordering::Equal => {
                let diff = x[i].value - y[j].value;
                distance_sq += diff * diff;
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                distance_sq += x[i].value * x[i].value;
                i += 1;
            }
            Ordering::Greater => {
                distance_sq += y[j].value * y[j].value;
                j += 1;
            }
        }
    }

    distance_sq += x[i..].iter().map(|node| node.value * node.value).sum::<f64>();
    distance_sq += y[j..].iter().map(|node| node.value * node.value).sum::<f64>();

    distance_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::linear::nodes;
    use approx::assert_relative_eq;

    #[test]
    fn test_rbf_kernel_identical_vectors() {
        let kernel = RbfKernel::new(1.0);
        let x = nodes(&[(1, 1.0), (2, 2.0), (3, 3.0)]);

        assert_relative_eq!(kernel.compute(&x, &x), 1.0);
    }

    #[test]
    fn test_rbf_kernel_disjoint_indices() {
        let kernel = RbfKernel::new(1.0);
        let x = nodes(&[(1, 1.0), (3, 1.0)]);
        let y = nodes(&[(2, 1.0), (4, 1.0)]);

        // ||x - y||² = 4
        assert_relative_eq!(kernel.compute(&x, &y), (-4.0_f64).exp());
    }

    #[test]
    fn test_rbf_kernel_symmetry() {
        let kernel = RbfKernel::new(0.5);
        let x = nodes(&[(1, 1.0), (3, 2.0), (5, 3.0)]);
        let y = nodes(&[(2, 1.0), (3, 2.0), (4, 3.0)]);

        assert_eq!(kernel.compute(&x, &y), kernel.compute(&y, &x));
    }

    #[test]
    fn test_squared_distance_tails() {
        let x = nodes(&[(1, 1.0)]);
        let y = nodes(&[(1, 1.0), (2, 3.0), (7, 4.0)]);

        assert_relative_eq!(squared_distance(&x, &y), 25.0);
    }
}
