//! Hyperparameter record construction

use crate::core::{BridgeError, KernelType, Result, SvmParameter, SvmType};
use libc::c_int;
use std::ptr;

/// Hyperparameters in the engine's `svm_parameter` layout
///
/// Owns the per-class weight table. Training and cross validation take a
/// `Parameters` by value, so a record is consumed exactly once; a record
/// that is never used is released when it goes out of scope.
#[repr(C)]
#[derive(Debug)]
pub struct Parameters {
    raw: SvmParameter,
    weight_label: Vec<c_int>,
    weight: Vec<f64>,
}

impl Parameters {
    /// Start from the default C-SVC / RBF configuration
    pub fn builder() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    /// Assign every field positionally, without defaults or gamma resolution
    ///
    /// `weight_label` and `weight` are moved into the record, not copied;
    /// their common length becomes `nr_weight`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw_parts(
        svm_type: SvmType,
        kernel_type: KernelType,
        degree: i32,
        gamma: f64,
        coef0: f64,
        nu: f64,
        cache_size: f64,
        c: f64,
        eps: f64,
        p: f64,
        shrinking: bool,
        probability: bool,
        weight_label: Vec<i32>,
        weight: Vec<f64>,
    ) -> Result<Self> {
        if weight_label.len() != weight.len() {
            return Err(BridgeError::DimensionMismatch {
                expected: weight_label.len(),
                actual: weight.len(),
            });
        }
        let nr_weight = c_int::try_from(weight.len()).map_err(|_| {
            BridgeError::InvalidArgument(format!("{} class weights", weight.len()))
        })?;

        let (label_ptr, weight_ptr) = if nr_weight == 0 {
            (ptr::null(), ptr::null())
        } else {
            (weight_label.as_ptr(), weight.as_ptr())
        };

        Ok(Self {
            raw: SvmParameter {
                svm_type: svm_type.as_raw(),
                kernel_type: kernel_type.as_raw(),
                degree,
                gamma,
                coef0,
                cache_size,
                eps,
                c,
                nr_weight,
                weight_label: label_ptr,
                weight: weight_ptr,
                nu,
                p,
                shrinking: shrinking as c_int,
                probability: probability as c_int,
            },
            weight_label,
            weight,
        })
    }

    /// The layout-exact view handed to the engine
    pub fn raw(&self) -> &SvmParameter {
        &self.raw
    }

    pub fn svm_type(&self) -> SvmType {
        // Only ever written from a valid SvmType.
        SvmType::from_raw(self.raw.svm_type).unwrap_or(SvmType::CSvc)
    }

    pub fn kernel_type(&self) -> KernelType {
        KernelType::from_raw(self.raw.kernel_type).unwrap_or(KernelType::Rbf)
    }

    pub fn probability(&self) -> bool {
        self.raw.probability()
    }

    /// The owned class-weight table as `(label, weight)` pairs
    pub fn class_weights(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.weight_label
            .iter()
            .copied()
            .zip(self.weight.iter().copied())
    }
}

/// Builder for [`Parameters`]
///
/// Defaults: C-SVC, RBF kernel, degree 3, gamma resolved at build time
/// (0.5 for classification, 0.1 for regression), coef0 0, nu 0.5,
/// 100 MB cache, C 1, tolerance 1e-3, p 0.1, no shrinking, no probability
/// estimates, no class weights.
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    svm_type: SvmType,
    kernel_type: KernelType,
    degree: i32,
    gamma: f64,
    coef0: f64,
    nu: f64,
    cache_size: f64,
    c: f64,
    eps: f64,
    p: f64,
    shrinking: bool,
    probability: bool,
    weight_label: Vec<i32>,
    weight: Vec<f64>,
}

impl Default for ParameterBuilder {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Rbf,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
            nu: 0.5,
            cache_size: 100.0,
            c: 1.0,
            eps: 1e-3,
            p: 0.1,
            shrinking: false,
            probability: false,
            weight_label: Vec::new(),
            weight: Vec::new(),
        }
    }
}

impl ParameterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_svm_type(mut self, svm_type: SvmType) -> Self {
        self.svm_type = svm_type;
        self
    }

    pub fn with_kernel(mut self, kernel_type: KernelType) -> Self {
        self.kernel_type = kernel_type;
        self
    }

    /// Linear kernel
    pub fn linear(self) -> Self {
        self.with_kernel(KernelType::Linear)
    }

    /// Polynomial kernel `(gamma * <x,y> + coef0)^degree`
    pub fn poly(self, gamma: f64, coef0: f64, degree: i32) -> Self {
        self.with_kernel(KernelType::Poly)
            .with_gamma(gamma)
            .with_coef0(coef0)
            .with_degree(degree)
    }

    /// RBF kernel `exp(-gamma * |x-y|^2)`
    pub fn rbf(self, gamma: f64) -> Self {
        self.with_kernel(KernelType::Rbf).with_gamma(gamma)
    }

    /// Sigmoid kernel `tanh(gamma * <x,y> + coef0)`
    pub fn sigmoid(self, gamma: f64, coef0: f64) -> Self {
        self.with_kernel(KernelType::Sigmoid)
            .with_gamma(gamma)
            .with_coef0(coef0)
    }

    pub fn with_degree(mut self, degree: i32) -> Self {
        self.degree = degree;
        self
    }

    /// Kernel width; 0 selects the default for the SVM type
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.coef0 = coef0;
        self
    }

    pub fn with_nu(mut self, nu: f64) -> Self {
        self.nu = nu;
        self
    }

    /// Kernel cache size in MB
    pub fn with_cache_size(mut self, cache_size: f64) -> Self {
        self.cache_size = cache_size;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Epsilon-SVR insensitive margin
    pub fn with_p(mut self, p: f64) -> Self {
        self.p = p;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.shrinking = shrinking;
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    /// Per-class multipliers of C; both arrays move into the record
    pub fn with_weights(mut self, labels: Vec<i32>, weights: Vec<f64>) -> Self {
        self.weight_label = labels;
        self.weight = weights;
        self
    }

    pub fn build(self) -> Result<Parameters> {
        let gamma = if self.gamma == 0.0 {
            if self.svm_type.is_regression() {
                0.1
            } else {
                0.5
            }
        } else {
            self.gamma
        };

        Parameters::from_raw_parts(
            self.svm_type,
            self.kernel_type,
            self.degree,
            gamma,
            self.coef0,
            self.nu,
            self.cache_size,
            self.c,
            self.eps,
            self.p,
            self.shrinking,
            self.probability,
            self.weight_label,
            self.weight,
        )
    }
}
