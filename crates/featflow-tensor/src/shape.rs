//! Shape utilities for tensor dimensions.
//!
//! [`Shape`] represents an ordered sequence of dimension sizes and provides
//! the row-major index arithmetic the sparse/dense conversions rely on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// The shape (dimension sizes) of a tensor.
///
/// # Examples
///
/// ```
/// use featflow_tensor::Shape;
///
/// let shape = Shape::new(vec![2, 3, 4]);
/// assert_eq!(shape.ndim(), 3);
/// assert_eq!(shape.numel(), 24);
/// assert_eq!(shape[0], 2);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a 2D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements, the product of all dimensions.
    pub fn numel(&self) -> usize {
        if self.dims.is_empty() {
            1
        } else {
            self.dims.iter().product()
        }
    }

    /// Returns the dimensions as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.dims
    }

    /// Consumes the shape and returns the underlying dimensions.
    pub fn into_vec(self) -> Vec<usize> {
        self.dims
    }

    /// Returns the row-major strides for this shape.
    ///
    /// The stride of a dimension is the number of elements skipped when its
    /// coordinate increases by one.
    ///
    /// # Examples
    ///
    /// ```
    /// use featflow_tensor::Shape;
    ///
    /// let shape = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(shape.strides(), vec![12, 4, 1]);
    /// ```
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Returns the flat row-major offset of a coordinate tuple, or `None` if
    /// the coordinate rank or any component is out of bounds.
    pub fn offset_of(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        let mut stride = 1;
        for (c, d) in coords.iter().zip(self.dims.iter()).rev() {
            if c >= d {
                return None;
            }
            offset += c * stride;
            stride *= d;
        }
        Some(offset)
    }

    /// Returns the coordinate tuple of a flat row-major offset.
    ///
    /// # Panics
    ///
    /// Panics if `offset >= self.numel()`.
    pub fn coords_of(&self, offset: usize) -> Vec<usize> {
        assert!(
            offset < self.numel(),
            "Offset {} out of bounds for shape {:?} ({} elements)",
            offset,
            self.dims,
            self.numel()
        );
        let mut coords = vec![0; self.dims.len()];
        let mut rem = offset;
        for i in (0..self.dims.len()).rev() {
            coords[i] = rem % self.dims[i];
            rem /= self.dims[i];
        }
        coords
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.dims[index]
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_properties() {
        let shape = Shape::new(vec![2, 3, 4]);
        assert_eq!(shape.ndim(), 3);
        assert_eq!(shape.numel(), 24);
        assert_eq!(shape.as_slice(), &[2, 3, 4]);
        assert_eq!(shape[1], 3);
    }

    #[test]
    fn test_empty_shape_is_scalar() {
        let shape = Shape::new(vec![]);
        assert_eq!(shape.ndim(), 0);
        assert_eq!(shape.numel(), 1);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::new(vec![2, 3, 4]).strides(), vec![12, 4, 1]);
        assert_eq!(Shape::matrix(3, 5).strides(), vec![5, 1]);
        assert_eq!(Shape::new(vec![7]).strides(), vec![1]);
    }

    #[test]
    fn test_offset_coords_roundtrip() {
        let shape = Shape::new(vec![2, 3, 4]);
        for offset in 0..shape.numel() {
            let coords = shape.coords_of(offset);
            assert_eq!(shape.offset_of(&coords), Some(offset));
        }
    }

    #[test]
    fn test_offset_of_out_of_bounds() {
        let shape = Shape::matrix(2, 3);
        assert_eq!(shape.offset_of(&[0, 3]), None);
        assert_eq!(shape.offset_of(&[2, 0]), None);
        assert_eq!(shape.offset_of(&[0]), None);
        assert_eq!(shape.offset_of(&[1, 2]), Some(5));
    }
}
