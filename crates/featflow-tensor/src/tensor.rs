//! The unified tensor type passed between preprocessing stages.

use crate::dense::DenseTensor;
use crate::scalar::{DType, Scalar};
use crate::shape::Shape;
use crate::sparse::SparseTensor;
use serde::{Deserialize, Serialize};

/// A categorical tensor in either dense or sparse form.
///
/// This is the sole wire contract between preprocessing stages: each stage
/// consumes a `Tensor` and produces a `Tensor`, preserving the representation
/// of its input unless its contract says otherwise.
///
/// # Examples
///
/// ```
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let t = Tensor::from(DenseTensor::from_i64(&[2, 2], vec![1, 2, 3, 4]).unwrap());
/// assert!(!t.is_sparse());
/// assert_eq!(t.dense_shape().as_slice(), &[2, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tensor {
    /// A dense tensor.
    Dense(DenseTensor),
    /// A sparse tensor.
    Sparse(SparseTensor),
}

impl Tensor {
    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        match self {
            Tensor::Dense(t) => t.dtype(),
            Tensor::Sparse(t) => t.dtype(),
        }
    }

    /// Returns the logical dense shape of either form.
    pub fn dense_shape(&self) -> &Shape {
        match self {
            Tensor::Dense(t) => t.shape(),
            Tensor::Sparse(t) => t.dense_shape(),
        }
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.dense_shape().ndim()
    }

    /// Returns true for the sparse form.
    pub fn is_sparse(&self) -> bool {
        matches!(self, Tensor::Sparse(_))
    }

    /// Returns the dense form, if this is one.
    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            Tensor::Dense(t) => Some(t),
            Tensor::Sparse(_) => None,
        }
    }

    /// Returns the sparse form, if this is one.
    pub fn as_sparse(&self) -> Option<&SparseTensor> {
        match self {
            Tensor::Dense(_) => None,
            Tensor::Sparse(t) => Some(t),
        }
    }

    /// Returns the batch size (size of the leading dimension), or `None` for
    /// rank-0 tensors.
    pub fn batch_size(&self) -> Option<usize> {
        self.dense_shape().as_slice().first().copied()
    }

    /// Returns the values of one example of a rank-2 tensor, in coordinate
    /// order.
    ///
    /// For the dense form this is the example's full row; for the sparse form
    /// it is the stored entries of that row. Returns `None` if the tensor is
    /// not rank 2 or the example is out of bounds.
    pub fn row_values(&self, example: usize) -> Option<Vec<Scalar>> {
        if self.ndim() != 2 || example >= self.dense_shape()[0] {
            return None;
        }
        match self {
            Tensor::Dense(t) => {
                let width = t.shape()[1];
                let values = (0..width)
                    .filter_map(|col| t.get(&[example, col]))
                    .collect();
                Some(values)
            }
            Tensor::Sparse(t) => {
                let values = t
                    .coordinates()
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c[0] == example)
                    .filter_map(|(i, _)| t.values().get(i))
                    .collect();
                Some(values)
            }
        }
    }
}

impl From<DenseTensor> for Tensor {
    fn from(t: DenseTensor) -> Self {
        Tensor::Dense(t)
    }
}

impl From<SparseTensor> for Tensor {
    fn from(t: SparseTensor) -> Self {
        Tensor::Sparse(t)
    }
}
