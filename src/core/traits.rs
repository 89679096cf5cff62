//! Traits at the engine boundary

use crate::core::{Result, SvmNode, SvmParameter, SvmProblem};
use libc::c_int;
use std::path::Path;

/// Destination for the engine's progress and warning text
///
/// Passed explicitly into training and cross-validation instead of a global
/// print hook. Any `Fn(&str)` closure is a sink.
pub trait LogSink {
    fn print(&self, message: &str);
}

impl<F: Fn(&str)> LogSink for F {
    fn print(&self, message: &str) {
        self(message)
    }
}

/// An SVM engine following libsvm's calling convention
///
/// Implementations see only the layout-exact views produced by the
/// marshalling layer and never take ownership of them.
pub trait Engine {
    type Model: EngineModel;

    /// Train a model (`svm_train`)
    fn train(
        &self,
        problem: &SvmProblem,
        param: &SvmParameter,
        sink: &dyn LogSink,
    ) -> Result<Self::Model>;

    /// Run k-fold cross validation (`svm_cross_validation`)
    ///
    /// `target` has one slot per problem row and receives the held-out
    /// prediction for that row.
    fn cross_validation(
        &self,
        problem: &SvmProblem,
        param: &SvmParameter,
        nr_fold: usize,
        target: &mut [f64],
        sink: &dyn LogSink,
    ) -> Result<()>;

    /// Load a model previously written by [`EngineModel::save`]
    fn load_model(&self, path: &Path) -> Result<Self::Model>;
}

/// A trained engine model
pub trait EngineModel {
    /// Predict a sentinel-terminated vector (`svm_predict`)
    fn predict(&self, x: &[SvmNode]) -> f64;

    /// Predict and write per-class probabilities (`svm_predict_probability`)
    ///
    /// `prob_estimates` holds at least [`Self::nr_class`] slots.
    fn predict_probability(&self, x: &[SvmNode], prob_estimates: &mut [f64]) -> f64;

    /// Number of classes; 2 for one-class and regression models
    fn nr_class(&self) -> usize;

    /// Class labels in the order used for probability output
    fn labels(&self) -> &[i32];

    /// Whether the model carries probability information
    fn has_probability(&self) -> bool;

    /// Persist the model, returning a negative status on failure
    fn save(&self, path: &Path) -> c_int;
}
