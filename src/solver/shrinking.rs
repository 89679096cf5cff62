//! Shrinking heuristic implementation
//!
//! Variables sitting at a bound whose gradient says they will stay there
//! are dropped from working-set selection. The gradient of every variable
//! is still maintained, so restoring the full set before the final
//! optimality check needs no reconstruction.

use crate::solver::AlphaStatus;

/// Variables currently eligible for working-set selection
#[derive(Debug, Clone)]
pub struct ActiveSet {
    total: usize,
    active: Vec<usize>,
}

impl ActiveSet {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            active: (0..total).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.active
    }

    pub fn is_shrunk(&self) -> bool {
        self.active.len() < self.total
    }

    /// Reactivate every variable
    pub fn restore(&mut self) {
        self.active = (0..self.total).collect();
    }

    /// Drop bounded variables that cannot join a violating pair
    ///
    /// Returns the number of variables removed.
    pub fn shrink(&mut self, y: &[f64], grad: &[f64], status: &[AlphaStatus]) -> usize {
        let mut gmax1 = f64::NEG_INFINITY;
        let mut gmax2 = f64::NEG_INFINITY;

        for &t in &self.active {
            let not_upper = status[t] != AlphaStatus::UpperBound;
            let not_lower = status[t] != AlphaStatus::LowerBound;
            if y[t] > 0.0 {
                if not_upper {
                    gmax1 = gmax1.max(-grad[t]);
                }
                if not_lower {
                    gmax2 = gmax2.max(grad[t]);
                }
            } else {
                if not_upper {
                    gmax2 = gmax2.max(-grad[t]);
                }
                if not_lower {
                    gmax1 = gmax1.max(grad[t]);
                }
            }
        }

        let before = self.active.len();
        self.active
            .retain(|&t| !be_shrunk(y[t], grad[t], status[t], gmax1, gmax2));
        before - self.active.len()
    }
}

fn be_shrunk(y: f64, grad: f64, status: AlphaStatus, gmax1: f64, gmax2: f64) -> bool {
    match status {
        AlphaStatus::UpperBound => {
            if y > 0.0 {
                -grad > gmax1
            } else {
                -grad > gmax2
            }
        }
        AlphaStatus::LowerBound => {
            if y > 0.0 {
                grad > gmax2
            } else {
                grad > gmax1
            }
        }
        AlphaStatus::Free => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_set_is_full() {
        let set = ActiveSet::new(4);
        assert_eq!(set.indices(), &[0, 1, 2, 3]);
        assert!(!set.is_shrunk());
    }

    #[test]
    fn test_shrink_and_restore() {
        // variable 2 sits at its lower bound with a large positive gradient
        let y = [1.0, -1.0, 1.0];
        let grad = [-0.5, -0.5, 5.0];
        let status = [
            AlphaStatus::Free,
            AlphaStatus::Free,
            AlphaStatus::LowerBound,
        ];

        let mut set = ActiveSet::new(3);
        let removed = set.shrink(&y, &grad, &status);

        assert_eq!(removed, 1);
        assert_eq!(set.indices(), &[0, 1]);
        assert!(set.is_shrunk());

        set.restore();
        assert_eq!(set.indices(), &[0, 1, 2]);
    }

    #[test]
    fn test_free_variables_never_shrink() {
        let y = [1.0, -1.0];
        let grad = [100.0, -100.0];
        let status = [AlphaStatus::Free, AlphaStatus::Free];

        let mut set = ActiveSet::new(2);
        assert_eq!(set.shrink(&y, &grad, &status), 0);
    }
}
