//! Native SVM engine
//!
//! Trains and evaluates libsvm-compatible models directly from the
//! layout-exact views the marshalling layer builds. Supported formulations
//! are C-SVC (one-vs-one for more than two classes, optional Platt
//! probability estimates), one-class SVM and epsilon-SVR.

pub mod cross_validation;
pub mod model;
pub mod probability;

pub use self::model::{DecisionFunction, NativeModel, PlattSigmoid};

use crate::core::{
    BridgeError, Engine, KernelType, LogSink, Result, SvmNode, SvmParameter, SvmProblem, SvmType,
};
use crate::kernel::KernelFunction;
use crate::solver::{QMatrix, Solution, SmoSolver, SolverConfig, SolverProblem};
use log::{debug, warn};
use std::iter;
use std::path::Path;

/// The engine shipped with the crate
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEngine;

impl Engine for NativeEngine {
    type Model = NativeModel;

    fn train(
        &self,
        problem: &SvmProblem,
        param: &SvmParameter,
        sink: &dyn LogSink,
    ) -> Result<NativeModel> {
        let config = TrainingConfig::from_parameter(param)?;
        let rows: Vec<&[SvmNode]> = problem.rows().collect();
        debug!(
            "training {:?} with {:?} on {} rows",
            config.svm_type,
            config.kernel,
            rows.len()
        );
        train_rows(&rows, problem.labels(), &config, sink)
    }

    fn cross_validation(
        &self,
        problem: &SvmProblem,
        param: &SvmParameter,
        nr_fold: usize,
        target: &mut [f64],
        sink: &dyn LogSink,
    ) -> Result<()> {
        let config = TrainingConfig::from_parameter(param)?;
        let rows: Vec<&[SvmNode]> = problem.rows().collect();
        cross_validation::cross_validate(&rows, problem.labels(), &config, nr_fold, target, sink)
    }

    fn load_model(&self, path: &Path) -> Result<NativeModel> {
        crate::persistence::load_model(path)
    }
}

/// Hyperparameters resolved and checked from an `svm_parameter` record
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub svm_type: SvmType,
    pub kernel: KernelFunction,
    pub c: f64,
    pub nu: f64,
    pub p: f64,
    pub eps: f64,
    /// Kernel cache budget in megabytes
    pub cache_size: f64,
    pub shrinking: bool,
    pub probability: bool,
    pub weights: Vec<(i32, f64)>,
}

impl TrainingConfig {
    /// Apply libsvm's parameter checks and select the kernel
    pub fn from_parameter(param: &SvmParameter) -> Result<Self> {
        let svm_type = param.svm_type()?;
        if matches!(svm_type, SvmType::NuSvc | SvmType::NuSvr) {
            return Err(BridgeError::Unsupported(format!("{svm_type:?} training")));
        }

        let kernel_type = param.kernel_type()?;
        if param.gamma() < 0.0 {
            return Err(invalid("gamma < 0"));
        }
        if kernel_type == KernelType::Poly && param.degree() < 0 {
            return Err(invalid("degree of polynomial kernel < 0"));
        }
        let kernel = KernelFunction::from_parameter(param)?;

        if param.cache_size() <= 0.0 {
            return Err(invalid("cache_size <= 0"));
        }
        if param.eps() <= 0.0 {
            return Err(invalid("eps <= 0"));
        }
        if matches!(svm_type, SvmType::CSvc | SvmType::EpsilonSvr) && param.c() <= 0.0 {
            return Err(invalid("C <= 0"));
        }
        if svm_type == SvmType::OneClass && (param.nu() <= 0.0 || param.nu() > 1.0) {
            return Err(invalid("nu <= 0 or nu > 1"));
        }
        if svm_type == SvmType::EpsilonSvr && param.p() < 0.0 {
            return Err(invalid("p < 0"));
        }
        if svm_type == SvmType::OneClass && param.probability() {
            return Err(BridgeError::Unsupported(
                "probability output for one-class SVM".to_string(),
            ));
        }

        let weights = param
            .weight_labels()
            .iter()
            .copied()
            .zip(param.weights().iter().copied())
            .collect();

        Ok(Self {
            svm_type,
            kernel,
            c: param.c(),
            nu: param.nu(),
            p: param.p(),
            eps: param.eps(),
            cache_size: param.cache_size(),
            shrinking: param.shrinking(),
            probability: param.probability(),
            weights,
        })
    }

    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            eps: self.eps,
            shrinking: self.shrinking,
            max_iterations: None,
        }
    }

    pub fn cache_bytes(&self) -> usize {
        (self.cache_size * 1024.0 * 1024.0) as usize
    }

    /// Whether held-out predictions go through probability estimates
    pub fn wants_probability(&self) -> bool {
        self.probability && self.svm_type.is_classification()
    }
}

fn invalid(reason: &str) -> BridgeError {
    BridgeError::InvalidArgument(reason.to_string())
}

/// Train on a set of borrowed rows
pub(crate) fn train_rows(
    rows: &[&[SvmNode]],
    labels: &[f64],
    config: &TrainingConfig,
    sink: &dyn LogSink,
) -> Result<NativeModel> {
    if rows.is_empty() {
        return Err(invalid("training set has no rows"));
    }
    if rows.len() != labels.len() {
        return Err(BridgeError::DimensionMismatch {
            expected: rows.len(),
            actual: labels.len(),
        });
    }

    match config.svm_type {
        SvmType::OneClass => Ok(train_one_class(rows, config, sink)),
        SvmType::EpsilonSvr => Ok(train_epsilon_svr(rows, labels, config, sink)),
        _ => Ok(train_classifier(rows, labels, config, sink)),
    }
}

/// Rows grouped by class label in order of first appearance
///
/// For a binary problem labelled `{-1, +1}` the `+1` class is placed first,
/// so decision values keep the sign convention of the labels.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClassGroups {
    pub labels: Vec<i32>,
    pub members: Vec<Vec<usize>>,
}

pub(crate) fn group_classes(labels: &[f64]) -> ClassGroups {
    let mut classes: Vec<i32> = Vec::new();
    let mut members: Vec<Vec<usize>> = Vec::new();

    for (row, &label) in labels.iter().enumerate() {
        let label = label as i32;
        match classes.iter().position(|&c| c == label) {
            Some(k) => members[k].push(row),
            None => {
                classes.push(label);
                members.push(vec![row]);
            }
        }
    }

    if classes == [-1, 1] {
        classes.swap(0, 1);
        members.swap(0, 1);
    }

    ClassGroups {
        labels: classes,
        members,
    }
}

/// Per-class penalty `C * weight`
fn class_penalties(labels: &[i32], config: &TrainingConfig, sink: &dyn LogSink) -> Vec<f64> {
    let mut penalties = vec![config.c; labels.len()];
    for &(label, weight) in &config.weights {
        match labels.iter().position(|&l| l == label) {
            Some(k) => penalties[k] *= weight,
            None => {
                warn!("class weight given for unknown label {label}");
                sink.print(&format!(
                    "WARNING: class label {label} specified in weight is not found\n"
                ));
            }
        }
    }
    penalties
}

fn train_classifier(
    rows: &[&[SvmNode]],
    labels: &[f64],
    config: &TrainingConfig,
    sink: &dyn LogSink,
) -> NativeModel {
    let groups = group_classes(labels);
    let nr_class = groups.labels.len();
    let penalties = class_penalties(&groups.labels, config, sink);

    let mut decisions = Vec::with_capacity(nr_class * nr_class.saturating_sub(1) / 2);
    let mut is_support = vec![false; rows.len()];

    for i in 0..nr_class {
        for j in i + 1..nr_class {
            let (first, second) = (&groups.members[i], &groups.members[j]);
            let members: Vec<usize> = first.iter().chain(second).copied().collect();
            let sub_rows: Vec<&[SvmNode]> = members.iter().map(|&r| rows[r]).collect();
            let sub_y: Vec<f64> = iter::repeat(1.0)
                .take(first.len())
                .chain(iter::repeat(-1.0).take(second.len()))
                .collect();

            let sigmoid = config.probability.then(|| {
                probability::binary_svc_probability(
                    &sub_rows,
                    &sub_y,
                    config,
                    penalties[i],
                    penalties[j],
                    sink,
                )
            });

            let solution = solve_c_svc(&sub_rows, &sub_y, config, penalties[i], penalties[j], sink);
            for (&row, &alpha) in members.iter().zip(&solution.alpha) {
                if alpha > 0.0 {
                    is_support[row] = true;
                }
            }

            let coef: Vec<f64> = solution
                .alpha
                .iter()
                .zip(&sub_y)
                .map(|(a, y)| a * y)
                .collect();
            decisions.push(
                DecisionFunction::new(&sub_rows, &coef, solution.rho, i, j).with_sigmoid(sigmoid),
            );
        }
    }

    let total = is_support.iter().filter(|&&s| s).count();
    sink.print(&format!("Total nSV = {total}\n"));
    debug!("trained {nr_class}-class model with {total} support vectors");

    NativeModel::classifier(config, groups.labels, decisions)
}

/// Solve one binary C-SVC subproblem with labels in `{+1, -1}`
pub(crate) fn solve_c_svc(
    rows: &[&[SvmNode]],
    y: &[f64],
    config: &TrainingConfig,
    cp: f64,
    cn: f64,
    sink: &dyn LogSink,
) -> Solution {
    let l = rows.len();
    let problem = SolverProblem {
        q: QMatrix::for_rows(rows.to_vec(), y.to_vec(), config.kernel, config.cache_bytes()),
        p: vec![-1.0; l],
        upper_bound: y.iter().map(|&y| if y > 0.0 { cp } else { cn }).collect(),
        alpha: vec![0.0; l],
    };
    let solution = SmoSolver::new(config.solver_config()).solve(problem, sink);

    if cp == cn {
        let sum: f64 = solution.alpha.iter().sum();
        sink.print(&format!("nu = {:.6}\n", sum / (cp * l as f64)));
    }
    report(&solution, sink);
    solution
}

fn train_one_class(rows: &[&[SvmNode]], config: &TrainingConfig, sink: &dyn LogSink) -> NativeModel {
    let l = rows.len();
    let budget = config.nu * l as f64;
    let n = (budget as usize).min(l);

    let mut alpha = vec![0.0; l];
    alpha.iter_mut().take(n).for_each(|a| *a = 1.0);
    if n < l {
        alpha[n] = budget - n as f64;
    }

    let problem = SolverProblem {
        q: QMatrix::for_rows(rows.to_vec(), vec![1.0; l], config.kernel, config.cache_bytes()),
        p: vec![0.0; l],
        upper_bound: vec![1.0; l],
        alpha,
    };
    let solution = SmoSolver::new(config.solver_config()).solve(problem, sink);
    report(&solution, sink);

    let decision = DecisionFunction::new(rows, &solution.alpha, solution.rho, 0, 0);
    NativeModel::single(config, decision)
}

fn train_epsilon_svr(
    rows: &[&[SvmNode]],
    targets: &[f64],
    config: &TrainingConfig,
    sink: &dyn LogSink,
) -> NativeModel {
    let l = rows.len();

    let p = targets
        .iter()
        .map(|&t| config.p - t)
        .chain(targets.iter().map(|&t| config.p + t))
        .collect();
    let y = iter::repeat(1.0)
        .take(l)
        .chain(iter::repeat(-1.0).take(l))
        .collect();
    let index = (0..l).chain(0..l).collect();

    let problem = SolverProblem {
        q: QMatrix::new(rows.to_vec(), index, y, config.kernel, config.cache_bytes()),
        p,
        upper_bound: vec![config.c; 2 * l],
        alpha: vec![0.0; 2 * l],
    };
    let solution = SmoSolver::new(config.solver_config()).solve(problem, sink);

    let coef: Vec<f64> = (0..l)
        .map(|i| solution.alpha[i] - solution.alpha[i + l])
        .collect();
    let sum: f64 = coef.iter().map(|c| c.abs()).sum();
    sink.print(&format!("nu = {:.6}\n", sum / (config.c * l as f64)));
    report(&solution, sink);

    let decision = DecisionFunction::new(rows, &coef, solution.rho, 0, 0);
    NativeModel::single(config, decision)
}

fn report(solution: &Solution, sink: &dyn LogSink) {
    sink.print(&format!(
        "obj = {:.6}, rho = {:.6}\nnSV = {}, nBSV = {}\n",
        solution.obj,
        solution.rho,
        solution.support_count(),
        solution.bounded_count()
    ));
}
