//! Sparse categorical tensors in coordinate (COO) form.

use crate::dense::DenseTensor;
use crate::scalar::{DType, Scalar};
use crate::shape::Shape;
use crate::values::Values;
use crate::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// A sparse tensor: explicit coordinates, aligned values, and the logical
/// dense shape.
///
/// Invariants, enforced at construction:
/// - `coordinates.len() == values.len()`
/// - every coordinate has rank `dense_shape.ndim()` and is in bounds
/// - coordinates are strictly increasing in row-major order (which also rules
///   out duplicates)
///
/// # Examples
///
/// ```
/// use featflow_tensor::{DenseTensor, Scalar, SparseTensor};
///
/// let dense = DenseTensor::from_i64(&[2, 3], vec![0, 5, 0, 7, 0, 9]).unwrap();
/// let sparse = SparseTensor::from_dense(&dense, &Scalar::I64(0)).unwrap();
/// assert_eq!(sparse.nnz(), 3);
/// assert_eq!(sparse.coordinates()[0], vec![0, 1]);
///
/// let back = sparse.to_dense(&Scalar::I64(0)).unwrap();
/// assert_eq!(back, dense);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseTensor {
    coordinates: Vec<Vec<usize>>,
    values: Values,
    dense_shape: Shape,
}

impl SparseTensor {
    /// Creates a sparse tensor, validating the coordinate invariants.
    ///
    /// # Errors
    ///
    /// - [`TensorError::LengthMismatch`] if coordinates and values disagree in
    ///   length.
    /// - [`TensorError::InvalidCoordinates`] if a coordinate has the wrong
    ///   rank, is out of bounds, or the list is not strictly increasing in
    ///   row-major order.
    pub fn new(
        coordinates: Vec<Vec<usize>>,
        values: Values,
        dense_shape: Shape,
    ) -> TensorResult<Self> {
        if coordinates.len() != values.len() {
            return Err(TensorError::LengthMismatch {
                expected: coordinates.len(),
                got: values.len(),
            });
        }
        let mut prev: Option<usize> = None;
        for coords in &coordinates {
            let offset = dense_shape.offset_of(coords).ok_or_else(|| {
                TensorError::InvalidCoordinates {
                    message: format!(
                        "coordinate {:?} out of bounds for dense shape {}",
                        coords, dense_shape
                    ),
                }
            })?;
            if let Some(p) = prev {
                if offset <= p {
                    return Err(TensorError::InvalidCoordinates {
                        message: format!(
                            "coordinate {:?} breaks strict row-major ordering",
                            coords
                        ),
                    });
                }
            }
            prev = Some(offset);
        }
        Ok(Self {
            coordinates,
            values,
            dense_shape,
        })
    }

    /// Materializes a dense tensor as sparse, dropping entries equal to
    /// `ignore`. Output coordinates follow row-major traversal of the input.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DTypeMismatch`] if `ignore` has a different
    /// element type than the tensor.
    pub fn from_dense(dense: &DenseTensor, ignore: &Scalar) -> TensorResult<Self> {
        if ignore.dtype() != dense.dtype() {
            return Err(TensorError::DTypeMismatch {
                expected: dense.dtype(),
                got: ignore.dtype(),
            });
        }
        let shape = dense.shape();
        let mut coordinates = Vec::new();
        let mut values = Values::with_capacity(dense.dtype(), 0);
        for (offset, value) in dense.values().iter().enumerate() {
            if &value != ignore {
                coordinates.push(shape.coords_of(offset));
                values.push(value)?;
            }
        }
        Ok(Self {
            coordinates,
            values,
            dense_shape: shape.clone(),
        })
    }

    /// Converts back to a dense tensor, filling absent coordinates with
    /// `fill`.
    ///
    /// Materializing with ignore value `x` and densifying with fill `x`
    /// reproduces the original tensor exactly.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DTypeMismatch`] if `fill` has a different
    /// element type than the tensor.
    pub fn to_dense(&self, fill: &Scalar) -> TensorResult<DenseTensor> {
        if fill.dtype() != self.dtype() {
            return Err(TensorError::DTypeMismatch {
                expected: self.dtype(),
                got: fill.dtype(),
            });
        }
        let numel = self.dense_shape.numel();
        // Coordinates are in bounds by construction, so offset_of cannot fail.
        let offsets: Vec<usize> = self
            .coordinates
            .iter()
            .filter_map(|c| self.dense_shape.offset_of(c))
            .collect();
        let mut values = Values::with_capacity(self.dtype(), numel);
        let mut next = 0usize;
        for offset in 0..numel {
            match (offsets.get(next), self.values.get(next)) {
                (Some(o), Some(value)) if *o == offset => {
                    values.push(value)?;
                    next += 1;
                }
                _ => values.push(fill.clone())?,
            }
        }
        DenseTensor::new(self.dense_shape.clone(), values)
    }

    /// Returns the coordinate list.
    pub fn coordinates(&self) -> &[Vec<usize>] {
        &self.coordinates
    }

    /// Returns the value column, aligned with the coordinates.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Returns the logical dense shape.
    pub fn dense_shape(&self) -> &Shape {
        &self.dense_shape
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// Returns the number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}
