//! Scalar values and element types for categorical tensors.
//!
//! Categorical pipelines move three element types around: raw string tokens,
//! integer tokens / index-space values, and float aggregates. [`DType`] names
//! the type, [`Scalar`] holds a single value of it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element type of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// UTF-8 string tokens.
    Str,
    /// Signed 64-bit integers (integer tokens, index-space values).
    I64,
    /// 32-bit floats (category-space aggregates).
    F32,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Str => write!(f, "str"),
            DType::I64 => write!(f, "i64"),
            DType::F32 => write!(f, "f32"),
        }
    }
}

/// A single tensor element.
///
/// Used for per-element access and for configuration values that must match a
/// tensor's element type (e.g. the ignore value when materializing a sparse
/// tensor).
///
/// # Examples
///
/// ```
/// use featflow_tensor::{DType, Scalar};
///
/// let s = Scalar::from("cat");
/// assert_eq!(s.dtype(), DType::Str);
///
/// let i = Scalar::from(42i64);
/// assert_eq!(i.dtype(), DType::I64);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// A string token.
    Str(String),
    /// An integer value.
    I64(i64),
    /// A float value.
    F32(f32),
}

impl Scalar {
    /// Returns the element type of this scalar.
    pub fn dtype(&self) -> DType {
        match self {
            Scalar::Str(_) => DType::Str,
            Scalar::I64(_) => DType::I64,
            Scalar::F32(_) => DType::F32,
        }
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::I64(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::F32(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
        }
    }
}
