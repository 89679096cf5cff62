//! Sigmoid (Tanh) Kernel Implementation
//!
//! K(x, y) = tanh(γ * <x, y> + r)
//!
//! The kernel is not positive semi-definite for every parameter choice;
//! the solver guards against non-positive curvature.

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// Sigmoid (Hyperbolic Tangent) kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidKernel {
    pub gamma: f64,
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::linear::nodes;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_value() {
        let kernel = SigmoidKernel::new(0.1, -1.0);
        let x = nodes(&[(1, 1.0), (2, 2.0)]);
        let y = nodes(&[(1, 3.0), (2, 4.0)]);

        assert_relative_eq!(kernel.compute(&x, &y), (0.1_f64 * 11.0 - 1.0).tanh());
    }

    #[test]
    fn test_sigmoid_bounded() {
        let kernel = SigmoidKernel::new(10.0, 0.0);
        let x = nodes(&[(1, 100.0)]);
        let y = nodes(&[(1, -100.0)]);

        let value = kernel.compute(&x, &y);
        assert!((-1.0..=1.0).contains(&value));
    }
}
