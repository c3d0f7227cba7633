//! Dense-to-sparse materialization.

use crate::error::{LayerError, Result};
use crate::layer::PreprocessingLayer;
use featflow_tensor::{Scalar, SparseTensor, Tensor};
use serde::{Deserialize, Serialize};

/// Converts dense tensors to sparse form, dropping entries equal to an
/// ignore value.
///
/// Output coordinates follow row-major traversal of the input. Sparse input
/// passes through unchanged, so the layer is idempotent and total over both
/// tensor forms.
///
/// # Examples
///
/// ```
/// use featflow_layers::materialize::SparseMaterializer;
/// use featflow_layers::layer::PreprocessingLayer;
/// use featflow_tensor::{DenseTensor, Scalar, Tensor};
///
/// let layer = SparseMaterializer::default(); // ignore value 0
/// let input = Tensor::from(DenseTensor::from_i64(&[2, 2], vec![0, 3, 4, 0]).unwrap());
/// let output = layer.apply(&input).unwrap();
/// assert_eq!(output.as_sparse().unwrap().nnz(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMaterializer {
    ignore_value: Scalar,
}

impl SparseMaterializer {
    /// Creates a materializer that drops entries equal to `ignore_value`.
    pub fn new(ignore_value: Scalar) -> Self {
        Self { ignore_value }
    }

    /// Returns the configured ignore value.
    pub fn ignore_value(&self) -> &Scalar {
        &self.ignore_value
    }
}

impl Default for SparseMaterializer {
    fn default() -> Self {
        Self::new(Scalar::I64(0))
    }
}

impl PreprocessingLayer for SparseMaterializer {
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        match input {
            Tensor::Dense(dense) => {
                if self.ignore_value.dtype() != dense.dtype() {
                    return Err(LayerError::TypeMismatch {
                        expected: dense.dtype(),
                        got: self.ignore_value.dtype(),
                    });
                }
                let sparse = SparseTensor::from_dense(dense, &self.ignore_value)?;
                Ok(Tensor::from(sparse))
            }
            Tensor::Sparse(_) => Ok(input.clone()),
        }
    }

    fn name(&self) -> &str {
        "SparseMaterializer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featflow_tensor::DenseTensor;

    #[test]
    fn test_drops_ignore_entries_in_row_major_order() {
        let layer = SparseMaterializer::default();
        let input = Tensor::from(DenseTensor::from_i64(&[2, 3], vec![0, 7, 0, 8, 0, 9]).unwrap());
        let output = layer.apply(&input).unwrap();
        let sparse = output.as_sparse().unwrap();
        assert_eq!(
            sparse.coordinates(),
            &[vec![0, 1], vec![1, 0], vec![1, 2]]
        );
        assert_eq!(sparse.values().as_i64(), Some(&[7i64, 8, 9][..]));
        assert_eq!(sparse.dense_shape().as_slice(), &[2, 3]);
    }

    #[test]
    fn test_string_ignore_value() {
        let layer = SparseMaterializer::new(Scalar::from(""));
        let input = Tensor::from(
            DenseTensor::from_strings(&[1, 3], vec!["a".into(), "".into(), "b".into()]).unwrap(),
        );
        let output = layer.apply(&input).unwrap();
        assert_eq!(output.as_sparse().unwrap().nnz(), 2);
    }

    #[test]
    fn test_type_mismatch() {
        let layer = SparseMaterializer::default();
        let input = Tensor::from(
            DenseTensor::from_strings(&[1, 1], vec!["a".into()]).unwrap(),
        );
        let err = layer.apply(&input).unwrap_err();
        assert!(matches!(err, LayerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_sparse_input_passes_through() {
        let layer = SparseMaterializer::default();
        let dense = DenseTensor::from_i64(&[2, 2], vec![0, 5, 0, 6]).unwrap();
        let sparse = Tensor::from(SparseTensor::from_dense(&dense, &Scalar::I64(0)).unwrap());
        let output = layer.apply(&sparse).unwrap();
        assert_eq!(output, sparse);
    }

    #[test]
    fn test_apply_is_idempotent_on_result() {
        let layer = SparseMaterializer::default();
        let input = Tensor::from(DenseTensor::from_i64(&[1, 3], vec![0, 1, 2]).unwrap());
        let once = layer.apply(&input).unwrap();
        let twice = layer.apply(&once).unwrap();
        assert_eq!(once, twice);
    }
}
