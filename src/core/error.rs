//! Error types for SVM implementation

use crate::features::{FeatureClass, FeatureType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    /// Rejected configuration value (C, nu, kernel scale, tolerance, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "Feature type mismatch: {kernel} expects {expected_type:?}/{expected_class:?}, \
         got {actual_type:?}/{actual_class:?}"
    )]
    FeatureTypeMismatch {
        kernel: &'static str,
        expected_type: FeatureType,
        expected_class: FeatureClass,
        actual_type: FeatureType,
        actual_class: FeatureClass,
    },

    #[error("Distance provider is not initialized on the kernel's feature pairing")]
    DistanceNotInitialized,

    #[error("Kernel is not initialized with features")]
    KernelNotInitialized,

    #[error("Index out of bounds: ({i}, {j}) for binding of size {lhs}x{rhs}")]
    IndexOutOfBounds {
        i: usize,
        j: usize,
        lhs: usize,
        rhs: usize,
    },

    #[error("Solver did not converge within {iterations} iterations")]
    SolverNonConvergence { iterations: usize },

    #[error("Empty training set: {0}")]
    EmptyTrainingSet(String),

    #[error("Model not trained")]
    ModelNotTrained,

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;
