//! Error types for dataset construction and training.

use thiserror::Error;

/// Training errors
///
/// Every error is fatal: the run is a deterministic offline batch process, so
/// retrying a failed step with the same inputs reproduces the same failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Input arrays from the data-loading collaborator are malformed or
    /// misaligned. Surfaced at construction.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// A batch or configuration violates the dimensionality fixed at model
    /// construction. Surfaced at the failing step.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// A loss or metric became non-finite. Aborting beats silently selecting
    /// a corrupted checkpoint.
    #[error("numeric instability: {context} is {value}")]
    NumericInstability { context: &'static str, value: f32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The checkpoint sink failed to persist a snapshot.
    #[error("checkpoint sink error: {0}")]
    Checkpoint(String),
}

/// Result type for training operations
pub type Result<T> = std::result::Result<T, Error>;
