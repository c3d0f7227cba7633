//! Error types for the featflow-layers crate.
//!
//! All stages raise errors synchronously at the call that detects them; a
//! call either returns the full transformed tensor or fails wholesale.

use featflow_tensor::{DType, TensorError};
use thiserror::Error;

/// Error type for preprocessing-layer operations.
#[derive(Debug, Error)]
pub enum LayerError {
    /// Element-type mismatch between operands.
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// The expected element type.
        expected: DType,
        /// The actual element type.
        got: DType,
    },

    /// Shape, batch-size, or axis incompatibility.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape that was provided.
        actual: Vec<usize>,
    },

    /// An input whose rank differs from what the layer supports.
    #[error("Invalid rank: expected {expected}, got {actual}")]
    Rank {
        /// The supported rank.
        expected: usize,
        /// The rank of the input.
        actual: usize,
    },

    /// An unseen token with no out-of-vocabulary capacity configured.
    #[error("Out-of-vocabulary token with no OOV buckets configured: {token:?}")]
    OutOfVocabulary {
        /// The offending token.
        token: String,
    },

    /// A category index outside the declared bound.
    #[error("Index {index} out of range for {num_categories} categories")]
    IndexOutOfRange {
        /// The offending index.
        index: i64,
        /// The declared number of categories.
        num_categories: usize,
    },

    /// A reduction mode incompatible with the input's multiplicity.
    #[error("Invalid mode: {message}")]
    InvalidMode {
        /// Description of the incompatibility.
        message: String,
    },

    /// A weight tensor misaligned with its value tensor.
    #[error("Invalid weights: {message}")]
    InvalidWeights {
        /// Description of the misalignment.
        message: String,
    },

    /// A fitted-state operation invoked before adaptation.
    #[error("{layer} has not been adapted; call adapt() or supply a vocabulary")]
    NotAdapted {
        /// The layer that required fitted state.
        layer: String,
    },

    /// A configuration rejected at construction time.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// A tensor invariant violation propagated from the data model.
    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),

    /// An I/O failure while loading a vocabulary file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for layer operations.
pub type Result<T> = std::result::Result<T, LayerError>;
