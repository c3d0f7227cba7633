//! Direct token-to-bucket hashing.

use crate::error::{LayerError, Result};
use crate::fingerprint;
use crate::layer::PreprocessingLayer;
use featflow_tensor::{DenseTensor, SparseTensor, Tensor, Values};
use serde::{Deserialize, Serialize};

/// Maps tokens directly into `[0, num_bins)` via the stable fingerprint,
/// bypassing vocabulary lookup.
///
/// Stateless: the mapping is fully determined by `num_bins` and the optional
/// `salt`. Use distinct salts to decorrelate independent hashing layers over
/// the same token space.
///
/// # Examples
///
/// ```
/// use featflow_layers::hashing::Hashing;
/// use featflow_layers::layer::PreprocessingLayer;
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let layer = Hashing::new(32).unwrap();
/// let input = Tensor::from(
///     DenseTensor::from_strings(&[1, 2], vec!["cat".into(), "dog".into()]).unwrap(),
/// );
/// let output = layer.apply(&input).unwrap();
/// for &bin in output.as_dense().unwrap().values().as_i64().unwrap() {
///     assert!((0..32).contains(&bin));
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashing {
    num_bins: usize,
    salt: Option<u64>,
}

impl Hashing {
    /// Creates a hashing layer with the given number of bins.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if `num_bins` is zero.
    pub fn new(num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(LayerError::Config {
                message: "Hashing requires num_bins > 0".to_string(),
            });
        }
        Ok(Self {
            num_bins,
            salt: None,
        })
    }

    /// Sets a salt perturbing the bucket assignment.
    pub fn with_salt(mut self, salt: u64) -> Self {
        self.salt = Some(salt);
        self
    }

    /// Returns the number of bins.
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    fn hash_values(&self, values: &Values) -> Result<Values> {
        let mut hashed = Vec::with_capacity(values.len());
        for value in values.iter() {
            hashed.push(fingerprint::bucket(&value, self.num_bins, self.salt)?);
        }
        Ok(Values::I64(hashed))
    }
}

impl PreprocessingLayer for Hashing {
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        match input {
            Tensor::Dense(dense) => {
                let values = self.hash_values(dense.values())?;
                Ok(Tensor::from(DenseTensor::new(dense.shape().clone(), values)?))
            }
            Tensor::Sparse(sparse) => {
                let values = self.hash_values(sparse.values())?;
                let out = SparseTensor::new(
                    sparse.coordinates().to_vec(),
                    values,
                    sparse.dense_shape().clone(),
                )?;
                Ok(Tensor::from(out))
            }
        }
    }

    fn name(&self) -> &str {
        "Hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featflow_tensor::Scalar;

    fn batch(tokens: &[&str]) -> Tensor {
        let data: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        Tensor::from(DenseTensor::from_strings(&[1, data.len()], data).unwrap())
    }

    #[test]
    fn test_rejects_zero_bins() {
        assert!(matches!(Hashing::new(0), Err(LayerError::Config { .. })));
    }

    #[test]
    fn test_deterministic_across_calls() {
        let layer = Hashing::new(16).unwrap();
        let input = batch(&["a", "b", "c", "a"]);
        let first = layer.apply(&input).unwrap();
        let second = layer.apply(&input).unwrap();
        assert_eq!(first, second);

        // Same token, same bucket.
        let bins = first.as_dense().unwrap().values().as_i64().unwrap().to_vec();
        assert_eq!(bins[0], bins[3]);
    }

    #[test]
    fn test_salt_perturbs_assignment() {
        let tokens: Vec<String> = (0..32).map(|i| format!("t{}", i)).collect();
        let input = Tensor::from(
            DenseTensor::from_strings(&[1, tokens.len()], tokens).unwrap(),
        );
        let unsalted = Hashing::new(8).unwrap().apply(&input).unwrap();
        let salted = Hashing::new(8).unwrap().with_salt(99).apply(&input).unwrap();
        assert_ne!(unsalted, salted);
    }

    #[test]
    fn test_sparse_shape_preserved() {
        let dense = DenseTensor::from_strings(
            &[2, 2],
            vec!["".into(), "a".into(), "b".into(), "".into()],
        )
        .unwrap();
        let sparse = SparseTensor::from_dense(&dense, &Scalar::from("")).unwrap();
        let input = Tensor::from(sparse);
        let layer = Hashing::new(4).unwrap();
        let output = layer.apply(&input).unwrap();
        let out = output.as_sparse().unwrap();
        assert_eq!(out.coordinates(), &[vec![0, 1], vec![1, 0]]);
        assert_eq!(out.dense_shape().as_slice(), &[2, 2]);
    }

    #[test]
    fn test_integer_tokens_accepted() {
        let input = Tensor::from(DenseTensor::from_i64(&[1, 3], vec![5, 6, 7]).unwrap());
        let layer = Hashing::new(3).unwrap();
        let output = layer.apply(&input).unwrap();
        for &bin in output.as_dense().unwrap().values().as_i64().unwrap() {
            assert!((0..3).contains(&bin));
        }
    }

    #[test]
    fn test_float_input_rejected() {
        let input = Tensor::from(DenseTensor::from_f32(&[1, 1], vec![0.5]).unwrap());
        let layer = Hashing::new(3).unwrap();
        assert!(matches!(
            layer.apply(&input),
            Err(LayerError::TypeMismatch { .. })
        ));
    }
}
