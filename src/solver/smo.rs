//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Pairs are chosen with the second-order working-set selection of Fan,
//! Chen and Lin (2005), the rule libsvm uses. The gradient `G = Qα + p` is
//! kept for every variable, so the stopping test `m(α) - M(α) < eps` is
//! exact once shrunk variables are restored.

use crate::core::LogSink;
use crate::solver::{ActiveSet, AlphaStatus, QMatrix};
use log::{debug, warn};

const TAU: f64 = 1e-12;

/// Solver tuning knobs taken from the training parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Stopping tolerance on the maximal violating pair
    pub eps: f64,
    pub shrinking: bool,
    /// Defaults to `max(10_000_000, 100 * l)` when unset
    pub max_iterations: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            eps: 1e-3,
            shrinking: false,
            max_iterations: None,
        }
    }
}

/// One dual problem ready to solve
pub struct SolverProblem<'a> {
    pub q: QMatrix<'a>,
    /// Linear term
    pub p: Vec<f64>,
    /// Per-variable box bound `C_i`
    pub upper_bound: Vec<f64>,
    /// Feasible starting point
    pub alpha: Vec<f64>,
}

/// Result of the dual optimization
#[derive(Debug, Clone)]
pub struct Solution {
    pub alpha: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub rho: f64,
    pub obj: f64,
    pub iterations: usize,
}

impl Solution {
    /// Number of variables with a non-zero multiplier
    pub fn support_count(&self) -> usize {
        self.alpha.iter().filter(|a| a.abs() > 0.0).count()
    }

    /// Number of variables pinned at their upper bound
    pub fn bounded_count(&self) -> usize {
        self.alpha
            .iter()
            .zip(&self.upper_bound)
            .filter(|(a, c)| a.abs() >= **c)
            .count()
    }
}

/// SMO solver for the libsvm dual
pub struct SmoSolver {
    config: SolverConfig,
}

impl SmoSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solve the dual problem
    ///
    /// Progress is reported through `sink` the way libsvm reports it: a
    /// `.` per shrinking round, a `*` when shrunk variables are restored
    /// and a summary line on exit.
    pub fn solve(&self, problem: SolverProblem<'_>, sink: &dyn LogSink) -> Solution {
        let SolverProblem {
            mut q,
            p,
            upper_bound,
            mut alpha,
        } = problem;
        let l = q.len();
        let y = q.y().to_vec();

        let mut status: Vec<AlphaStatus> = alpha
            .iter()
            .zip(&upper_bound)
            .map(|(&a, &c)| AlphaStatus::of(a, c))
            .collect();

        let mut grad = p.clone();
        for i in 0..l {
            if status[i] != AlphaStatus::LowerBound {
                let q_i = q.column(i);
                for (g, q_ik) in grad.iter_mut().zip(q_i.iter()) {
                    *g += alpha[i] * q_ik;
                }
            }
        }

        let max_iterations = self
            .config
            .max_iterations
            .unwrap_or_else(|| l.saturating_mul(100).max(10_000_000));
        let mut active = ActiveSet::new(l);
        let mut counter = l.min(1000) + 1;
        let mut iterations = 0;

        while iterations < max_iterations {
            counter -= 1;
            if counter == 0 {
                counter = l.min(1000);
                if self.config.shrinking {
                    let removed = active.shrink(&y, &grad, &status);
                    debug!("shrinking removed {removed} variables");
                }
                sink.print(".");
            }

            let (i, j) = match self.select_working_set(&mut q, &y, &grad, &status, &active) {
                Some(pair) => pair,
                None if active.is_shrunk() => {
                    active.restore();
                    sink.print("*");
                    match self.select_working_set(&mut q, &y, &grad, &status, &active) {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => break,
                    }
                }
                None => break,
            };

            iterations += 1;

            let q_i = q.column(i);
            let q_j = q.column(j);
            let (c_i, c_j) = (upper_bound[i], upper_bound[j]);
            let (old_i, old_j) = (alpha[i], alpha[j]);

            if y[i] != y[j] {
                let quad = positive_or_tau(q.diag(i) + q.diag(j) + 2.0 * q_i[j]);
                let delta = (-grad[i] - grad[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;

                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > c_i - c_j {
                    if alpha[i] > c_i {
                        alpha[i] = c_i;
                        alpha[j] = c_i - diff;
                    }
                } else if alpha[j] > c_j {
                    alpha[j] = c_j;
                    alpha[i] = c_j + diff;
                }
            } else {
                let quad = positive_or_tau(q.diag(i) + q.diag(j) - 2.0 * q_i[j]);
                let delta = (grad[i] - grad[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;

                if sum > c_i {
                    if alpha[i] > c_i {
                        alpha[i] = c_i;
                        alpha[j] = sum - c_i;
                    }
                } else if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if sum > c_j {
                    if alpha[j] > c_j {
                        alpha[j] = c_j;
                        alpha[i] = sum - c_j;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }

            let delta_i = alpha[i] - old_i;
            let delta_j = alpha[j] - old_j;
            for (k, g) in grad.iter_mut().enumerate() {
                *g += q_i[k] * delta_i + q_j[k] * delta_j;
            }
            status[i] = AlphaStatus::of(alpha[i], c_i);
            status[j] = AlphaStatus::of(alpha[j], c_j);
        }

        if iterations >= max_iterations {
            warn!("SMO stopped after reaching the iteration cap of {max_iterations}");
            sink.print("\nWARNING: reaching max number of iterations\n");
        }

        let rho = calculate_rho(&y, &grad, &status);
        let obj = alpha
            .iter()
            .zip(grad.iter().zip(&p))
            .map(|(a, (g, p))| a * (g + p))
            .sum::<f64>()
            / 2.0;

        sink.print(&format!("\noptimization finished, #iter = {iterations}\n"));

        Solution {
            alpha,
            upper_bound,
            rho,
            obj,
            iterations,
        }
    }

    /// Second-order working-set selection
    ///
    /// Returns `None` when the active variables satisfy the stopping
    /// condition.
    fn select_working_set(
        &self,
        q: &mut QMatrix<'_>,
        y: &[f64],
        grad: &[f64],
        status: &[AlphaStatus],
        active: &ActiveSet,
    ) -> Option<(usize, usize)> {
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for &t in active.indices() {
            if y[t] > 0.0 {
                if status[t] != AlphaStatus::UpperBound && -grad[t] >= gmax {
                    gmax = -grad[t];
                    gmax_idx = Some(t);
                }
            } else if status[t] != AlphaStatus::LowerBound && grad[t] >= gmax {
                gmax = grad[t];
                gmax_idx = Some(t);
            }
        }

        let i = gmax_idx?;
        let q_i = q.column(i);

        let mut gmax2 = f64::NEG_INFINITY;
        let mut gmin_idx = None;
        let mut obj_diff_min = f64::INFINITY;

        for &j in active.indices() {
            if y[j] > 0.0 {
                if status[j] == AlphaStatus::LowerBound {
                    continue;
                }
                gmax2 = gmax2.max(grad[j]);
                let grad_diff = gmax + grad[j];
                if grad_diff > 0.0 {
                    let quad = q.diag(i) + q.diag(j) - 2.0 * y[i] * q_i[j];
                    let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            } else {
                if status[j] == AlphaStatus::UpperBound {
                    continue;
                }
                gmax2 = gmax2.max(-grad[j]);
                let grad_diff = gmax - grad[j];
                if grad_diff > 0.0 {
                    let quad = q.diag(i) + q.diag(j) + 2.0 * y[i] * q_i[j];
                    let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if gmax + gmax2 < self.config.eps {
            return None;
        }
        gmin_idx.map(|j| (i, j))
    }
}

fn positive_or_tau(quad: f64) -> f64 {
    if quad > 0.0 {
        quad
    } else {
        TAU
    }
}

/// Offset of the decision function
///
/// Averages `y_i G_i` over free variables; without any, takes the middle
/// of the feasible interval.
fn calculate_rho(y: &[f64], grad: &[f64], status: &[AlphaStatus]) -> f64 {
    let mut ub = f64::INFINITY;
    let mut lb = f64::NEG_INFINITY;
    let mut sum_free = 0.0;
    let mut nr_free = 0usize;

    for ((&y_i, &g_i), &s) in y.iter().zip(grad).zip(status) {
        let yg = y_i * g_i;
        match s {
            AlphaStatus::UpperBound => {
                if y_i < 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            }
            AlphaStatus::LowerBound => {
                if y_i > 0.0 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            }
            AlphaStatus::Free => {
                nr_free += 1;
                sum_free += yg;
            }
        }
    }

    if nr_free > 0 {
        sum_free / nr_free as f64
    } else if ub.is_finite() && lb.is_finite() {
        (ub + lb) / 2.0
    } else if ub.is_finite() {
        ub
    } else if lb.is_finite() {
        lb
    } else {
        0.0
    }
}
