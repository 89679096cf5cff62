//! SVM dual solver
//!
//! Solves the libsvm dual formulation
//!
//! ```text
//! min  ½ αᵀQα + pᵀα
//! s.t. yᵀα = Δ,  0 ≤ αᵢ ≤ Cᵢ
//! ```
//!
//! with Sequential Minimal Optimization. One formulation covers C-SVC,
//! one-class SVM and epsilon-SVR; the engine only varies `p`, `y`, `C` and
//! the starting point.

pub mod matrix;
pub mod shrinking;
pub mod smo;

pub use self::matrix::QMatrix;
pub use self::shrinking::ActiveSet;
pub use self::smo::{Solution, SmoSolver, SolverConfig, SolverProblem};

/// Position of a variable relative to its box constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

impl AlphaStatus {
    pub fn of(alpha: f64, upper_bound: f64) -> Self {
        if alpha >= upper_bound {
            AlphaStatus::UpperBound
        } else if alpha <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        }
    }
}
