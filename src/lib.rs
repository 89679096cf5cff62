//! Bridge between dense host buffers and libsvm-layout SVM structures
//!
//! Host data arrives as flat `f64` buffers. The [`marshal`] layer turns
//! them into `svm_node` sequences, arena-backed `svm_problem` sets and
//! `svm_parameter` records with libsvm's exact memory layout. An [`Engine`]
//! trains on those views, and the resulting models are used for prediction
//! and persistence. [`ffi`] exposes the same operations as a C ABI.

pub mod api;
pub mod cache;
pub mod core;
pub mod engine;
pub mod ffi;
pub mod kernel;
pub mod logging;
pub mod marshal;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{Bridge, Model};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::error::{BridgeError, Result};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::engine::{NativeEngine, NativeModel};
pub use crate::kernel::{Kernel, KernelFunction};
pub use crate::logging::{LogRecordSink, SilentSink};
pub use crate::marshal::{marshal_vector, FeatureVector, ParameterBuilder, Parameters, TrainingSet};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
