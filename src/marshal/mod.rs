//! Conversion of dense host buffers into engine-layout structures
//!
//! - [`node`]: one dense vector to a sentinel-terminated node sequence
//! - [`problem`]: a batch of dense rows to an arena-backed training set
//! - [`param`]: scalar and array inputs to a hyperparameter record

pub mod node;
pub mod param;
pub mod problem;

pub use self::node::{marshal_vector, FeatureVector};
pub use self::param::{ParameterBuilder, Parameters};
pub use self::problem::TrainingSet;

use crate::core::{BridgeError, Result};

/// Allocate an empty vector with room for exactly `len` elements
pub(crate) fn allocate<T>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(BridgeError::out_of_memory(len))?;
    Ok(buffer)
}
