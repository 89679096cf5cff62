//! High-level API for the SVM bridge
//!
//! Ties the marshalling layer to an [`Engine`]: training sets and parameter
//! records go in, owned models come out.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use svmbridge::{Bridge, Parameters, TrainingSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];
//! let labels = [-1.0, -1.0, 1.0, 1.0];
//! let set = TrainingSet::from_dense(&data, &labels, 4, 2)?;
//!
//! let bridge = Bridge::new();
//! let params = Parameters::builder().linear().build()?;
//! let model = bridge.train(&set, params)?;
//!
//! println!("prediction: {}", model.predict(&[1.0, 1.0])?);
//! model.save("model.json");
//! # Ok(())
//! # }
//! ```

use crate::core::{BridgeError, Engine, EngineModel, LogSink, Result};
use crate::engine::NativeEngine;
use crate::logging::SilentSink;
use crate::marshal::{marshal_vector, Parameters, TrainingSet};
use log::{debug, warn};
use std::path::Path;

/// Entry point for training, cross validation and model loading
#[derive(Debug, Clone, Default)]
pub struct Bridge<E: Engine = NativeEngine> {
    engine: E,
}

impl Bridge<NativeEngine> {
    /// Create a bridge over the native engine
    pub fn new() -> Self {
        Self {
            engine: NativeEngine,
        }
    }
}

impl<E: Engine> Bridge<E> {
    /// Create a bridge over a custom engine
    pub fn with_engine(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Train a model, discarding engine output
    ///
    /// `params` is consumed whether or not training succeeds.
    pub fn train(&self, set: &TrainingSet, params: Parameters) -> Result<Model<E::Model>> {
        self.train_with_sink(set, params, &SilentSink)
    }

    /// Train a model, sending engine output to `sink`
    pub fn train_with_sink(
        &self,
        set: &TrainingSet,
        params: Parameters,
        sink: &dyn LogSink,
    ) -> Result<Model<E::Model>> {
        debug!(
            "training on {} rows of dimension {}",
            set.len(),
            set.dim()
        );
        let result = self.engine.train(set.problem(), params.raw(), sink);
        drop(params);
        result.map(Model::new)
    }

    /// Run k-fold cross validation, discarding engine output
    ///
    /// `target` receives one held-out prediction per training row.
    pub fn cross_validate(
        &self,
        set: &TrainingSet,
        params: Parameters,
        nr_fold: usize,
        target: &mut [f64],
    ) -> Result<()> {
        self.cross_validate_with_sink(set, params, nr_fold, target, &SilentSink)
    }

    /// Run k-fold cross validation, sending engine output to `sink`
    pub fn cross_validate_with_sink(
        &self,
        set: &TrainingSet,
        params: Parameters,
        nr_fold: usize,
        target: &mut [f64],
        sink: &dyn LogSink,
    ) -> Result<()> {
        if nr_fold < 2 {
            return Err(BridgeError::InvalidArgument(format!(
                "cross validation needs at least 2 folds, got {nr_fold}"
            )));
        }
        if target.len() != set.len() {
            return Err(BridgeError::DimensionMismatch {
                expected: set.len(),
                actual: target.len(),
            });
        }

        debug!("{nr_fold}-fold cross validation on {} rows", set.len());
        let result = self
            .engine
            .cross_validation(set.problem(), params.raw(), nr_fold, target, sink);
        drop(params);
        result
    }

    /// Load a model previously written by [`Model::save`]
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<Model<E::Model>> {
        self.engine.load_model(path.as_ref()).map(Model::new)
    }
}

/// A trained model owned by the caller
///
/// Independent of the training set it came from; dropping or freeing the
/// set leaves the model usable.
#[derive(Debug)]
pub struct Model<M: EngineModel> {
    inner: M,
}

impl<M: EngineModel> Model<M> {
    pub(crate) fn new(inner: M) -> Self {
        Self { inner }
    }

    /// Predict a dense feature vector
    pub fn predict(&self, data: &[f64]) -> Result<f64> {
        let x = marshal_vector(data)?;
        Ok(self.inner.predict(x.nodes()))
    }

    /// Predict a dense feature vector and fill per-class probabilities
    ///
    /// `prob_estimates` must hold at least [`Self::nr_class`] slots; they
    /// follow the order of [`Self::labels`].
    pub fn predict_with_probabilities(
        &self,
        data: &[f64],
        prob_estimates: &mut [f64],
    ) -> Result<f64> {
        if !self.inner.has_probability() {
            return Err(BridgeError::ProbabilityUnavailable);
        }
        let nr_class = self.inner.nr_class();
        if prob_estimates.len() < nr_class {
            return Err(BridgeError::DimensionMismatch {
                expected: nr_class,
                actual: prob_estimates.len(),
            });
        }

        let x = marshal_vector(data)?;
        Ok(self.inner.predict_probability(x.nodes(), prob_estimates))
    }

    /// Save the model, returning whether the write succeeded
    pub fn save<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let status = self.inner.save(path);
        if status < 0 {
            warn!("saving model to {} failed with status {status}", path.display());
        }
        status >= 0
    }

    /// Release the model
    pub fn free(self) {
        debug!("releasing {}-class model", self.inner.nr_class());
    }

    pub fn nr_class(&self) -> usize {
        self.inner.nr_class()
    }

    pub fn labels(&self) -> &[i32] {
        self.inner.labels()
    }

    pub fn has_probability(&self) -> bool {
        self.inner.has_probability()
    }

    /// The engine model behind this handle
    pub fn inner(&self) -> &M {
        &self.inner
    }
}
