//! Probability estimates for classification
//!
//! Binary outputs are calibrated with Platt scaling, fitted on decision
//! values from an internal 5-fold split. Multi-class estimates couple the
//! pairwise probabilities with the second method of Wu, Lin and Weng (2004).

use crate::core::{LogSink, SvmNode};
use crate::engine::model::{DecisionFunction, PlattSigmoid};
use crate::engine::{solve_c_svc, TrainingConfig};
use log::debug;

const INTERNAL_FOLDS: usize = 5;

/// `1 / (1 + exp(A f + B))`, evaluated without overflow
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Fit Platt's sigmoid by Newton's method with backtracking
///
/// Follows Lin, Lin and Weng's numerically stable variant.
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64], sink: &dyn LogSink) -> PlattSigmoid {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (1.0 + (-f_apb).exp()).ln()
                } else {
                    (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    let mut iter = 0;
    while iter < MAX_ITER {
        // gradient and Hessian, with H' = H + sigma I
        let (mut h11, mut h22, mut h21) = (SIGMA, SIGMA, 0.0);
        let (mut g1, mut g2) = (0.0, 0.0);
        for (&f, &t) in dec_values.iter().zip(&targets) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < MIN_STEP {
            sink.print("Line search fails in two-class probability estimates\n");
            break;
        }
        iter += 1;
    }

    if iter >= MAX_ITER {
        sink.print("Reaching maximal iterations in two-class probability estimates\n");
    }

    PlattSigmoid { a, b }
}

/// Couple pairwise probabilities `r[i][j] ≈ P(i | i or j)` into class
/// probabilities
pub fn multiclass_probability(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    let max_iter = k.max(100);
    let eps = 0.005 / k as f64;

    let mut p = vec![1.0 / k as f64; k];
    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in t + 1..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut qp = vec![0.0; k];
    let mut iter = 0;
    while iter < max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = q[t].iter().zip(&p).map(|(a, b)| a * b).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iter += 1;
    }

    if iter >= max_iter {
        debug!("multi-class probability coupling stopped at {max_iter} iterations");
    }
    p
}

/// Fit a sigmoid for one binary subproblem
///
/// Decision values come from models trained on the other folds of a
/// strided 5-fold split, so every value is out-of-sample.
pub(crate) fn binary_svc_probability(
    rows: &[&[SvmNode]],
    y: &[f64],
    config: &TrainingConfig,
    cp: f64,
    cn: f64,
    sink: &dyn LogSink,
) -> PlattSigmoid {
    let l = rows.len();
    let mut dec_values = vec![0.0; l];

    for fold in 0..INTERNAL_FOLDS {
        let held: Vec<usize> = (fold..l).step_by(INTERNAL_FOLDS).collect();
        if held.is_empty() {
            continue;
        }
        let train: Vec<usize> = (0..l).filter(|k| k % INTERNAL_FOLDS != fold).collect();
        let positives = train.iter().filter(|&&k| y[k] > 0.0).count();
        let negatives = train.len() - positives;

        let fixed = match (positives, negatives) {
            (0, 0) => Some(0.0),
            (_, 0) => Some(1.0),
            (0, _) => Some(-1.0),
            _ => None,
        };

        if let Some(value) = fixed {
            for &k in &held {
                dec_values[k] = value;
            }
            continue;
        }

        let sub_rows: Vec<&[SvmNode]> = train.iter().map(|&k| rows[k]).collect();
        let sub_y: Vec<f64> = train.iter().map(|&k| y[k]).collect();
        let solution = solve_c_svc(&sub_rows, &sub_y, config, cp, cn, sink);
        let coef: Vec<f64> = solution
            .alpha
            .iter()
            .zip(&sub_y)
            .map(|(a, y)| a * y)
            .collect();
        let decision = DecisionFunction::new(&sub_rows, &coef, solution.rho, 0, 1);

        for &k in &held {
            dec_values[k] = decision.evaluate(&config.kernel, rows[k]);
        }
    }

    sigmoid_train(&dec_values, y, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SilentSink;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid_predict_is_stable() {
        assert_relative_eq!(sigmoid_predict(0.0, 1.0, 0.0), 0.5);
        assert!(sigmoid_predict(1000.0, 1.0, 0.0) >= 0.0);
        assert!(sigmoid_predict(-1000.0, 1.0, 0.0) <= 1.0);
        // negative slope: large decision values mean high probability
        assert!(sigmoid_predict(5.0, -1.0, 0.0) > 0.99);
    }

    #[test]
    fn test_sigmoid_train_orders_probabilities() {
        let dec_values = [2.0, 1.5, 1.0, 0.3, -0.2, -1.0, -1.5, -2.0];
        let labels = [1.0, 1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0];

        let sigmoid = sigmoid_train(&dec_values, &labels, &SilentSink);

        assert!(sigmoid.a < 0.0);
        assert!(sigmoid.probability(2.0) > 0.5);
        assert!(sigmoid.probability(-2.0) < 0.5);
    }

    #[test]
    fn test_binary_coupling_keeps_pairwise_value() {
        let r = vec![vec![0.0, 0.8], vec![0.2, 0.0]];
        let p = multiclass_probability(&r);

        assert_relative_eq!(p[0], 0.8, epsilon = 1e-2);
        assert_relative_eq!(p[0] + p[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_multiclass_coupling_sums_to_one() {
        let r = vec![
            vec![0.0, 0.7, 0.9],
            vec![0.3, 0.0, 0.6],
            vec![0.1, 0.4, 0.0],
        ];
        let p = multiclass_probability(&r);

        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(p[0] > p[1] && p[1] > p[2]);
    }
}
