//! Dense categorical tensors.

use crate::scalar::{DType, Scalar};
use crate::shape::Shape;
use crate::values::Values;
use crate::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// A dense n-dimensional tensor of a single element type, stored in row-major
/// order.
///
/// # Examples
///
/// ```
/// use featflow_tensor::{DenseTensor, DType, Scalar};
///
/// let t = DenseTensor::from_i64(&[2, 2], vec![1, 2, 3, 4]).unwrap();
/// assert_eq!(t.dtype(), DType::I64);
/// assert_eq!(t.get(&[1, 0]), Some(Scalar::I64(3)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseTensor {
    shape: Shape,
    values: Values,
}

impl DenseTensor {
    /// Creates a dense tensor from a shape and a row-major value column.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::LengthMismatch`] if the number of values does
    /// not equal `shape.numel()`.
    pub fn new(shape: Shape, values: Values) -> TensorResult<Self> {
        if values.len() != shape.numel() {
            return Err(TensorError::LengthMismatch {
                expected: shape.numel(),
                got: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Creates a string tensor from row-major data.
    pub fn from_strings(shape: &[usize], data: Vec<String>) -> TensorResult<Self> {
        Self::new(Shape::from(shape), Values::Str(data))
    }

    /// Creates an integer tensor from row-major data.
    pub fn from_i64(shape: &[usize], data: Vec<i64>) -> TensorResult<Self> {
        Self::new(Shape::from(shape), Values::I64(data))
    }

    /// Creates a float tensor from row-major data.
    pub fn from_f32(shape: &[usize], data: Vec<f32>) -> TensorResult<Self> {
        Self::new(Shape::from(shape), Values::F32(data))
    }

    /// Returns the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// Returns the backing value column.
    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        self.values.len()
    }

    /// Returns the element at the given coordinates, or `None` when out of
    /// bounds.
    pub fn get(&self, coords: &[usize]) -> Option<Scalar> {
        self.shape.offset_of(coords).and_then(|o| self.values.get(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_checked() {
        let err = DenseTensor::from_i64(&[2, 3], vec![1, 2, 3]).unwrap_err();
        match err {
            TensorError::LengthMismatch { expected, got } => {
                assert_eq!(expected, 6);
                assert_eq!(got, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_get() {
        let t = DenseTensor::from_strings(
            &[2, 2],
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
        )
        .unwrap();
        assert_eq!(t.get(&[0, 1]), Some(Scalar::from("b")));
        assert_eq!(t.get(&[1, 1]), Some(Scalar::from("d")));
        assert_eq!(t.get(&[2, 0]), None);
    }
}
