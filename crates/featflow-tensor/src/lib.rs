//! Categorical tensor types for featflow preprocessing.
//!
//! This crate provides the data model shared by every preprocessing stage:
//! dense and sparse tensors of string, integer, or float elements, plus the
//! shape arithmetic and dense↔sparse conversions the stages build on.
//!
//! # Overview
//!
//! - [`DenseTensor`]: an n-dimensional row-major array of one element type.
//! - [`SparseTensor`]: coordinate-form storage (sorted coordinates, aligned
//!   values, logical dense shape).
//! - [`Tensor`]: the enum passed between stages, preserving representation.
//! - [`Scalar`] / [`DType`] / [`Values`]: element-level taxonomy.
//! - [`Shape`]: dimension sizes with row-major offset arithmetic.
//!
//! # Example
//!
//! ```
//! use featflow_tensor::{DenseTensor, Scalar, SparseTensor, Tensor};
//!
//! let dense = DenseTensor::from_i64(&[2, 3], vec![0, 4, 0, 0, 5, 6]).unwrap();
//! let sparse = SparseTensor::from_dense(&dense, &Scalar::I64(0)).unwrap();
//! assert_eq!(sparse.nnz(), 3);
//!
//! // Round-trip through the dense form is exact.
//! assert_eq!(sparse.to_dense(&Scalar::I64(0)).unwrap(), dense);
//!
//! let tensor = Tensor::from(sparse);
//! assert!(tensor.is_sparse());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod dense;
pub mod scalar;
pub mod shape;
pub mod sparse;
pub mod tensor;
pub mod values;

pub use dense::DenseTensor;
pub use scalar::{DType, Scalar};
pub use shape::Shape;
pub use sparse::SparseTensor;
pub use tensor::Tensor;
pub use values::Values;

/// Error type for tensor construction and conversion.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// Element-type mismatch between two operands.
    #[error("DType mismatch: expected {expected}, got {got}")]
    DTypeMismatch {
        /// The expected element type.
        expected: DType,
        /// The actual element type.
        got: DType,
    },

    /// Shape mismatch between two operands.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        got: Vec<usize>,
    },

    /// A value column whose length disagrees with its shape or coordinates.
    #[error("Length mismatch: expected {expected} values, got {got}")]
    LengthMismatch {
        /// The expected number of values.
        expected: usize,
        /// The actual number of values.
        got: usize,
    },

    /// A coordinate list violating the sparse-tensor invariants.
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates {
        /// Description of the violation.
        message: String,
    },
}

/// Result type for tensor operations.
pub type TensorResult<T> = Result<T, TensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_workflow() {
        let dense = DenseTensor::from_strings(
            &[2, 2],
            vec!["a".into(), "".into(), "".into(), "b".into()],
        )
        .unwrap();
        let sparse = SparseTensor::from_dense(&dense, &Scalar::from("")).unwrap();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.dense_shape().as_slice(), &[2, 2]);

        let back = sparse.to_dense(&Scalar::from("")).unwrap();
        assert_eq!(back, dense);
    }

    #[test]
    fn test_error_display() {
        let err = TensorError::DTypeMismatch {
            expected: DType::Str,
            got: DType::I64,
        };
        assert_eq!(err.to_string(), "DType mismatch: expected str, got i64");

        let err = TensorError::LengthMismatch {
            expected: 4,
            got: 2,
        };
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let dense = DenseTensor::from_i64(&[1, 3], vec![7, 8, 9]).unwrap();
        let tensor = Tensor::from(dense);
        let json = serde_json::to_string(&tensor).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tensor);
    }
}
