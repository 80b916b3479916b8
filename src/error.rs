// src/error.rs

/// Errors reported by the PCA pipeline.
///
/// Every variant aborts the whole `fit_transform` call that produced it;
/// no step of the pipeline recovers from a failed precondition.
#[derive(Debug, thiserror::Error)]
pub enum PcaError {
    #[error("invalid input shape ({n_samples} samples x {n_features} features): {reason}")]
    InvalidInputShape {
        n_samples: usize,
        n_features: usize,
        reason: &'static str,
    },
    #[error("input contains a non-finite value at row {row}, column {column}")]
    NonFiniteInput { row: usize, column: usize },
    #[error("column {column} has zero variance and cannot be scaled")]
    DegenerateColumn { column: usize },
    #[error("requested {requested} components but the data only has {available} features")]
    ComponentCountExceedsFeatures { requested: usize, available: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("dimension mismatch: expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("numeric failure: {0}")]
    NumericFailure(String),
}
