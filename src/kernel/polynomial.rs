//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): independent term in the polynomial
//! - d (degree): degree of the polynomial

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialKernel {
    pub degree: i32,
    pub gamma: f64,
    pub coef0: f64,
}

impl PolynomialKernel {
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            degree,
            gamma,
            coef0,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).powi(self.degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::linear::nodes;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_value() {
        let kernel = PolynomialKernel::new(2, 1.0, 1.0);
        let x = nodes(&[(1, 1.0), (2, 2.0)]);
        let y = nodes(&[(1, 3.0), (2, 4.0)]);

        // (1*3 + 2*4 + 1)^2 = 144
        assert_relative_eq!(kernel.compute(&x, &y), 144.0);
    }

    #[test]
    fn test_negative_base_keeps_sign_for_odd_degree() {
        let kernel = PolynomialKernel::new(3, 1.0, 0.0);
        let x = nodes(&[(1, -1.0)]);
        let y = nodes(&[(1, 2.0)]);

        assert_relative_eq!(kernel.compute(&x, &y), -8.0);
    }

    #[test]
    fn test_degree_one_matches_scaled_dot() {
        let kernel = PolynomialKernel::new(1, 0.5, 2.0);
        let x = nodes(&[(1, 2.0), (4, 1.0)]);
        let y = nodes(&[(1, 3.0), (2, 7.0)]);

        assert_relative_eq!(kernel.compute(&x, &y), 0.5 * 6.0 + 2.0);
    }
}
