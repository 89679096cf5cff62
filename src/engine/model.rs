//! Trained native models

use crate::core::{EngineModel, SvmNode, SvmType};
use crate::engine::probability::{multiclass_probability, sigmoid_predict};
use crate::engine::TrainingConfig;
use crate::kernel::{Kernel, KernelFunction};
use libc::c_int;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pairwise probabilities are kept away from 0 and 1
const MIN_PAIRWISE_PROB: f64 = 1e-7;

/// Platt scaling parameters: `P(y=1|f) = 1 / (1 + exp(A f + B))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattSigmoid {
    pub a: f64,
    pub b: f64,
}

impl PlattSigmoid {
    pub fn probability(&self, decision_value: f64) -> f64 {
        sigmoid_predict(decision_value, self.a, self.b)
    }
}

/// `f(x) = Σ coef_i K(sv_i, x) - rho` for one binary subproblem
///
/// Support vectors are copied out of the training rows, so a model never
/// refers back to the training set it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionFunction {
    support_vectors: Vec<Vec<SvmNode>>,
    coef: Vec<f64>,
    rho: f64,
    /// Class index voted for when `f(x) > 0`
    positive: usize,
    negative: usize,
    sigmoid: Option<PlattSigmoid>,
}

impl DecisionFunction {
    /// Keep the rows whose coefficient is non-zero
    pub(crate) fn new(
        rows: &[&[SvmNode]],
        coef: &[f64],
        rho: f64,
        positive: usize,
        negative: usize,
    ) -> Self {
        let (support_vectors, coef) = rows
            .iter()
            .zip(coef)
            .filter(|(_, c)| **c != 0.0)
            .map(|(row, &c)| (row.to_vec(), c))
            .unzip();

        Self {
            support_vectors,
            coef,
            rho,
            positive,
            negative,
            sigmoid: None,
        }
    }

    pub(crate) fn with_sigmoid(mut self, sigmoid: Option<PlattSigmoid>) -> Self {
        self.sigmoid = sigmoid;
        self
    }

    pub fn evaluate(&self, kernel: &KernelFunction, x: &[SvmNode]) -> f64 {
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.coef)
            .map(|(sv, c)| c * kernel.compute(sv, x))
            .sum();
        sum - self.rho
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coef
    }

    pub fn support_vector_count(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn sigmoid(&self) -> Option<PlattSigmoid> {
        self.sigmoid
    }
}

/// A model produced by [`crate::engine::NativeEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeModel {
    svm_type: SvmType,
    kernel: KernelFunction,
    /// Class labels; empty for one-class and regression models
    labels: Vec<i32>,
    /// `k(k-1)/2` pairwise functions for classification, one otherwise
    decisions: Vec<DecisionFunction>,
    probability: bool,
}

impl NativeModel {
    pub(crate) fn classifier(
        config: &TrainingConfig,
        labels: Vec<i32>,
        decisions: Vec<DecisionFunction>,
    ) -> Self {
        Self {
            svm_type: config.svm_type,
            kernel: config.kernel,
            labels,
            decisions,
            probability: config.probability,
        }
    }

    pub(crate) fn single(config: &TrainingConfig, decision: DecisionFunction) -> Self {
        Self {
            svm_type: config.svm_type,
            kernel: config.kernel,
            labels: Vec::new(),
            decisions: vec![decision],
            probability: false,
        }
    }

    pub fn svm_type(&self) -> SvmType {
        self.svm_type
    }

    pub fn kernel(&self) -> KernelFunction {
        self.kernel
    }

    pub fn decisions(&self) -> &[DecisionFunction] {
        &self.decisions
    }

    /// Support vectors summed over all decision functions
    pub fn support_vector_count(&self) -> usize {
        self.decisions
            .iter()
            .map(DecisionFunction::support_vector_count)
            .sum()
    }

    /// Raw decision values in decision-function order
    pub fn decision_values(&self, x: &[SvmNode]) -> Vec<f64> {
        self.decisions
            .iter()
            .map(|d| d.evaluate(&self.kernel, x))
            .collect()
    }

    fn label_at(&self, class: usize) -> f64 {
        self.labels.get(class).map_or(0.0, |&l| f64::from(l))
    }

    /// One-vs-one voting; ties go to the class seen first
    fn vote(&self, x: &[SvmNode]) -> f64 {
        let mut votes = vec![0usize; self.labels.len()];
        for decision in &self.decisions {
            if decision.evaluate(&self.kernel, x) > 0.0 {
                votes[decision.positive] += 1;
            } else {
                votes[decision.negative] += 1;
            }
        }
        self.label_at(argmax(votes.iter().map(|&v| v as f64)))
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (k, v) in values.enumerate() {
        if v > best_value {
            best = k;
            best_value = v;
        }
    }
    best
}

impl EngineModel for NativeModel {
    fn predict(&self, x: &[SvmNode]) -> f64 {
        let first = || {
            self.decisions
                .first()
                .map_or(0.0, |d| d.evaluate(&self.kernel, x))
        };
        match self.svm_type {
            SvmType::OneClass => {
                if first() > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            SvmType::EpsilonSvr | SvmType::NuSvr => first(),
            SvmType::CSvc | SvmType::NuSvc => self.vote(x),
        }
    }

    fn predict_probability(&self, x: &[SvmNode], prob_estimates: &mut [f64]) -> f64 {
        if !self.probability || !self.svm_type.is_classification() {
            return self.predict(x);
        }

        let k = self.labels.len();
        if k == 1 {
            if let Some(slot) = prob_estimates.first_mut() {
                *slot = 1.0;
            }
            return self.label_at(0);
        }

        let mut pairwise = vec![vec![0.0; k]; k];
        for decision in &self.decisions {
            let p = decision
                .sigmoid
                .map_or(0.5, |s| s.probability(decision.evaluate(&self.kernel, x)))
                .clamp(MIN_PAIRWISE_PROB, 1.0 - MIN_PAIRWISE_PROB);
            pairwise[decision.positive][decision.negative] = p;
            pairwise[decision.negative][decision.positive] = 1.0 - p;
        }

        let estimates = if k == 2 {
            vec![pairwise[0][1], pairwise[1][0]]
        } else {
            multiclass_probability(&pairwise)
        };
        for (slot, &estimate) in prob_estimates.iter_mut().zip(&estimates) {
            *slot = estimate;
        }
        self.label_at(argmax(estimates.into_iter()))
    }

    fn nr_class(&self) -> usize {
        if self.svm_type.is_classification() {
            self.labels.len()
        } else {
            2
        }
    }

    fn labels(&self) -> &[i32] {
        &self.labels
    }

    fn has_probability(&self) -> bool {
        self.probability
    }

    fn save(&self, path: &Path) -> c_int {
        match crate::persistence::save_model(self, path) {
            Ok(()) => 0,
            Err(e) => {
                debug!("model save to {} failed: {e}", path.display());
                -1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::linear::nodes;
    use crate::marshal::Parameters;
    use approx::assert_relative_eq;

    fn config(svm_type: SvmType, probability: bool) -> TrainingConfig {
        let params = Parameters::builder()
            .with_svm_type(svm_type)
            .linear()
            .build()
            .unwrap();
        let mut config = TrainingConfig::from_parameter(params.raw()).unwrap();
        config.probability = probability;
        config
    }

    /// Three classes on a line: 1 on the left, 2 around 0, 3 on the right
    fn three_class_model() -> NativeModel {
        let left = nodes(&[(1, -2.0)]);
        let right = nodes(&[(1, 2.0)]);
        let decisions = vec![
            // 1 vs 2: -2x - 2, positive left of -1
            DecisionFunction::new(&[left.as_slice()], &[1.0], 2.0, 0, 1),
            // 1 vs 3: -x, positive left of 0
            DecisionFunction::new(&[left.as_slice()], &[0.5], 0.0, 0, 2),
            // 2 vs 3: -2x + 2, positive left of +1
            DecisionFunction::new(&[right.as_slice()], &[-1.0], -2.0, 1, 2),
        ];
        NativeModel::classifier(&config(SvmType::CSvc, false), vec![1, 2, 3], decisions)
    }

    #[test]
    fn test_zero_coefficients_are_dropped() {
        let a = nodes(&[(1, 1.0)]);
        let b = nodes(&[(1, 2.0)]);
        let rows = [a.as_slice(), b.as_slice()];
        let decision = DecisionFunction::new(&rows, &[0.0, 0.5], 0.25, 0, 1);

        assert_eq!(decision.support_vector_count(), 1);
        assert_eq!(decision.coefficients(), &[0.5]);
        // 0.5 * (2 * 3) - 0.25
        assert_relative_eq!(decision.evaluate(&KernelFunction::Linear, &nodes(&[(1, 3.0)])), 2.75);
    }

    #[test]
    fn test_one_vs_one_voting() {
        let model = three_class_model();

        assert_eq!(model.nr_class(), 3);
        assert_eq!(model.predict(&nodes(&[(1, -3.0)])), 1.0);
        assert_eq!(model.predict(&nodes(&[(1, 0.0)])), 2.0);
        assert_eq!(model.predict(&nodes(&[(1, 3.0)])), 3.0);
    }

    #[test]
    fn test_one_class_and_regression_outputs() {
        let sv = nodes(&[(1, 1.0)]);
        let decision = DecisionFunction::new(&[sv.as_slice()], &[1.0], 0.5, 0, 0);

        let one_class = NativeModel::single(&config(SvmType::OneClass, false), decision.clone());
        assert_eq!(one_class.predict(&nodes(&[(1, 1.0)])), 1.0);
        assert_eq!(one_class.predict(&nodes(&[(1, 0.1)])), -1.0);
        assert_eq!(one_class.nr_class(), 2);
        assert!(one_class.labels().is_empty());

        let svr = NativeModel::single(&config(SvmType::EpsilonSvr, false), decision);
        assert_relative_eq!(svr.predict(&nodes(&[(1, 3.0)])), 2.5);
    }

    #[test]
    fn test_probability_sums_to_one() {
        let sv = nodes(&[(1, 1.0)]);
        let decision = DecisionFunction::new(&[sv.as_slice()], &[1.0], 0.0, 0, 1)
            .with_sigmoid(Some(PlattSigmoid { a: -2.0, b: 0.0 }));
        let model = NativeModel::classifier(&config(SvmType::CSvc, true), vec![1, -1], vec![decision]);

        let mut prob = [0.0; 2];
        let label = model.predict_probability(&nodes(&[(1, 1.0)]), &mut prob);

        assert_eq!(label, 1.0);
        assert_relative_eq!(prob[0] + prob[1], 1.0, epsilon = 1e-9);
        assert!(prob[0] > prob[1]);
    }

    #[test]
    fn test_binary_probability_is_platt_output() {
        let sigmoid = PlattSigmoid { a: -1.5, b: 0.25 };
        let sv = nodes(&[(1, 1.0)]);
        let decision = DecisionFunction::new(&[sv.as_slice()], &[1.0], 0.0, 0, 1)
            .with_sigmoid(Some(sigmoid));
        let model = NativeModel::classifier(&config(SvmType::CSvc, true), vec![1, -1], vec![decision]);

        let mut prob = [0.0; 2];
        model.predict_probability(&nodes(&[(1, 0.5)]), &mut prob);

        let expected = sigmoid.probability(0.5);
        assert_eq!(prob[0], expected);
        assert_eq!(prob[1], 1.0 - expected);
    }

    #[test]
    fn test_probability_without_estimates_falls_back() {
        let model = three_class_model();
        let mut prob = [-1.0; 3];

        assert!(!model.has_probability());
        assert_eq!(model.predict_probability(&nodes(&[(1, 3.0)]), &mut prob), 3.0);
        assert_eq!(prob, [-1.0; 3]);
    }
}
