//! Error types for the SVM boundary layer

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Out of memory: failed to allocate {requested} elements")]
    OutOfMemory { requested: usize },

    #[error("Null handle passed for {0}")]
    NullHandle(&'static str),

    #[error("Unsupported by engine: {0}")]
    Unsupported(String),

    #[error("Model was not trained with probability estimates")]
    ProbabilityUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BridgeError {
    /// Map a failed `try_reserve` into an out-of-memory signal
    pub(crate) fn out_of_memory(requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| BridgeError::OutOfMemory { requested }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BridgeError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4, got 3");

        let err = BridgeError::NullHandle("model");
        assert_eq!(err.to_string(), "Null handle passed for model");
    }

    #[test]
    fn test_out_of_memory_mapping() {
        let mut v: Vec<u64> = Vec::new();
        let err = v
            .try_reserve_exact(usize::MAX)
            .map_err(BridgeError::out_of_memory(usize::MAX))
            .unwrap_err();
        assert!(matches!(err, BridgeError::OutOfMemory { requested } if requested == usize::MAX));
    }
}
