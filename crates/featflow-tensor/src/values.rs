//! Typed value columns backing dense and sparse tensors.

use crate::scalar::{DType, Scalar};
use crate::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// A homogeneous column of tensor elements.
///
/// Both tensor forms store their elements as one `Values` column: dense
/// tensors in full row-major order, sparse tensors aligned with their
/// coordinate list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Values {
    /// String tokens.
    Str(Vec<String>),
    /// Integer values.
    I64(Vec<i64>),
    /// Float values.
    F32(Vec<f32>),
}

impl Values {
    /// Creates an empty column of the given element type with reserved
    /// capacity.
    pub fn with_capacity(dtype: DType, capacity: usize) -> Self {
        match dtype {
            DType::Str => Values::Str(Vec::with_capacity(capacity)),
            DType::I64 => Values::I64(Vec::with_capacity(capacity)),
            DType::F32 => Values::F32(Vec::with_capacity(capacity)),
        }
    }

    /// Returns the element type of the column.
    pub fn dtype(&self) -> DType {
        match self {
            Values::Str(_) => DType::Str,
            Values::I64(_) => DType::I64,
            Values::F32(_) => DType::F32,
        }
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self {
            Values::Str(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::F32(v) => v.len(),
        }
    }

    /// Returns true if the column holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index` as a [`Scalar`], or `None` when out of
    /// bounds.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            Values::Str(v) => v.get(index).map(|s| Scalar::Str(s.clone())),
            Values::I64(v) => v.get(index).map(|x| Scalar::I64(*x)),
            Values::F32(v) => v.get(index).map(|x| Scalar::F32(*x)),
        }
    }

    /// Appends a scalar to the column.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DTypeMismatch`] if the scalar's type differs
    /// from the column's.
    pub fn push(&mut self, value: Scalar) -> TensorResult<()> {
        match (self, value) {
            (Values::Str(v), Scalar::Str(s)) => v.push(s),
            (Values::I64(v), Scalar::I64(x)) => v.push(x),
            (Values::F32(v), Scalar::F32(x)) => v.push(x),
            (col, value) => {
                return Err(TensorError::DTypeMismatch {
                    expected: col.dtype(),
                    got: value.dtype(),
                })
            }
        }
        Ok(())
    }

    /// Returns the column as a string slice, or `None` for other types.
    pub fn as_str(&self) -> Option<&[String]> {
        match self {
            Values::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the column as an integer slice, or `None` for other types.
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Values::I64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the column as a float slice, or `None` for other types.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Values::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Iterates over the column as scalars.
    pub fn iter(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

impl From<Vec<String>> for Values {
    fn from(v: Vec<String>) -> Self {
        Values::Str(v)
    }
}

impl From<Vec<i64>> for Values {
    fn from(v: Vec<i64>) -> Self {
        Values::I64(v)
    }
}

impl From<Vec<f32>> for Values {
    fn from(v: Vec<f32>) -> Self {
        Values::F32(v)
    }
}
