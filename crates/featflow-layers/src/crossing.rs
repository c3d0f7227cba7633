//! Cartesian crossing of categorical columns.

use crate::error::{LayerError, Result};
use crate::fingerprint;
use crate::layer::PreprocessingLayer;
use crate::vocabulary::token_string;
use featflow_tensor::{DenseTensor, Shape, SparseTensor, Tensor, Values};
use serde::{Deserialize, Serialize};

/// Separator joining the string forms of crossed values into one composite
/// token.
pub const SEPARATOR: &str = "_X_";

/// Crosses `k` rank-2 categorical columns into combined tokens.
///
/// With no depth configured, every example yields the full Cartesian product
/// over its per-input value lists, one composite token per combination. With
/// `depth = [d1, d2, ...]`, combinations are drawn from size-`d` subsets of
/// the inputs instead: for each depth in the given order, each subset in
/// lexicographic input order, then the product in odometer order (last input
/// varies fastest).
///
/// Composite tokens are the values' string forms joined with [`SEPARATOR`];
/// with `num_bins` configured they are fingerprinted into `[0, num_bins)`
/// instead. Output is sparse iff any input is sparse. An example with an
/// empty value list for a crossed input contributes no combinations for the
/// subsets containing that input.
///
/// # Examples
///
/// ```
/// use featflow_layers::crossing::CategoryCrossing;
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let a = Tensor::from(DenseTensor::from_i64(&[1, 2], vec![1, 2]).unwrap());
/// let b = Tensor::from(DenseTensor::from_i64(&[1, 2], vec![1, 3]).unwrap());
/// let crossed = CategoryCrossing::new().cross(&[a, b]).unwrap();
/// let tokens: Vec<&str> = crossed.as_dense().unwrap().values().as_str().unwrap()
///     .iter().map(String::as_str).collect();
/// assert_eq!(tokens, ["1_X_1", "1_X_3", "2_X_1", "2_X_3"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCrossing {
    depth: Option<Vec<usize>>,
    num_bins: Option<usize>,
}

impl CategoryCrossing {
    /// Creates a crossing layer producing the full Cartesian product as
    /// composite string tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts combinations to subsets of exactly the given sizes.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if the list is empty or contains zero.
    pub fn with_depth(mut self, depths: Vec<usize>) -> Result<Self> {
        if depths.is_empty() || depths.contains(&0) {
            return Err(LayerError::Config {
                message: "depth must be a non-empty list of positive sizes".to_string(),
            });
        }
        self.depth = Some(depths);
        Ok(self)
    }

    /// Hashes composite tokens into `[0, num_bins)` instead of emitting
    /// strings.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if `num_bins` is zero.
    pub fn with_num_bins(mut self, num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(LayerError::Config {
                message: "num_bins must be positive".to_string(),
            });
        }
        self.num_bins = Some(num_bins);
        Ok(self)
    }

    /// Crosses the given columns. All inputs must be rank 2 with equal batch
    /// size and hold string or integer values.
    pub fn cross(&self, inputs: &[Tensor]) -> Result<Tensor> {
        if inputs.is_empty() {
            return Err(LayerError::Config {
                message: "crossing requires at least one input".to_string(),
            });
        }
        for input in inputs {
            if input.ndim() != 2 {
                return Err(LayerError::Rank {
                    expected: 2,
                    actual: input.ndim(),
                });
            }
        }
        let batch = inputs[0].dense_shape()[0];
        for input in &inputs[1..] {
            if input.dense_shape()[0] != batch {
                return Err(LayerError::ShapeMismatch {
                    expected: inputs[0].dense_shape().as_slice().to_vec(),
                    actual: input.dense_shape().as_slice().to_vec(),
                });
            }
        }

        let subsets = self.subsets(inputs.len())?;

        // Per-input, per-example value lists in canonical string form.
        let mut rows: Vec<Vec<Vec<String>>> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let mut per_example = Vec::with_capacity(batch);
            for example in 0..batch {
                let values = input.row_values(example).unwrap_or_default();
                let mut tokens = Vec::with_capacity(values.len());
                for value in &values {
                    tokens.push(token_string(value)?.into_owned());
                }
                per_example.push(tokens);
            }
            rows.push(per_example);
        }

        let mut per_example_tokens: Vec<Vec<String>> = Vec::with_capacity(batch);
        for example in 0..batch {
            let mut tokens = Vec::new();
            for subset in &subsets {
                let lists: Vec<&Vec<String>> =
                    subset.iter().map(|&i| &rows[i][example]).collect();
                emit_product(&lists, &mut tokens);
            }
            per_example_tokens.push(tokens);
        }

        let any_sparse = inputs.iter().any(Tensor::is_sparse);
        if any_sparse {
            self.build_sparse(batch, per_example_tokens)
        } else {
            self.build_dense(batch, inputs, &subsets, per_example_tokens)
        }
    }

    fn subsets(&self, num_inputs: usize) -> Result<Vec<Vec<usize>>> {
        match &self.depth {
            None => Ok(vec![(0..num_inputs).collect()]),
            Some(depths) => {
                let mut subsets = Vec::new();
                for &depth in depths {
                    if depth > num_inputs {
                        return Err(LayerError::Config {
                            message: format!(
                                "depth {} exceeds the {} crossed inputs",
                                depth, num_inputs
                            ),
                        });
                    }
                    combinations(num_inputs, depth, &mut subsets);
                }
                Ok(subsets)
            }
        }
    }

    fn encode(&self, tokens: Vec<String>) -> Result<Values> {
        match self.num_bins {
            None => Ok(Values::Str(tokens)),
            Some(num_bins) => {
                let mut bins = Vec::with_capacity(tokens.len());
                for token in &tokens {
                    let hash = fingerprint::fingerprint64(token.as_bytes());
                    bins.push((hash % num_bins as u64) as i64);
                }
                Ok(Values::I64(bins))
            }
        }
    }

    fn build_dense(
        &self,
        batch: usize,
        inputs: &[Tensor],
        subsets: &[Vec<usize>],
        per_example: Vec<Vec<String>>,
    ) -> Result<Tensor> {
        // Dense inputs have fixed widths, so every example yields the same
        // combination count.
        let width: usize = subsets
            .iter()
            .map(|subset| {
                subset
                    .iter()
                    .map(|&i| inputs[i].dense_shape()[1])
                    .product::<usize>()
            })
            .sum();
        let values = self.encode(per_example.into_iter().flatten().collect())?;
        Ok(Tensor::from(DenseTensor::new(
            Shape::matrix(batch, width),
            values,
        )?))
    }

    fn build_sparse(&self, batch: usize, per_example: Vec<Vec<String>>) -> Result<Tensor> {
        let width = per_example.iter().map(Vec::len).max().unwrap_or(0);
        let mut coordinates = Vec::new();
        let mut tokens = Vec::new();
        for (example, row) in per_example.into_iter().enumerate() {
            for (position, token) in row.into_iter().enumerate() {
                coordinates.push(vec![example, position]);
                tokens.push(token);
            }
        }
        let values = self.encode(tokens)?;
        Ok(Tensor::from(SparseTensor::new(
            coordinates,
            values,
            Shape::matrix(batch, width),
        )?))
    }
}

/// Appends all size-`depth` index subsets of `0..n` in lexicographic order.
fn combinations(n: usize, depth: usize, out: &mut Vec<Vec<usize>>) {
    let mut current = Vec::with_capacity(depth);
    fn recurse(start: usize, n: usize, depth: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == depth {
            out.push(current.clone());
            return;
        }
        let remaining = depth - current.len();
        for i in start..=n.saturating_sub(remaining) {
            current.push(i);
            recurse(i + 1, n, depth, current, out);
            current.pop();
        }
    }
    recurse(0, n, depth, &mut current, out);
}

/// Emits the Cartesian product over the given value lists in odometer order,
/// joining each tuple with [`SEPARATOR`]. Any empty list yields no output.
fn emit_product(lists: &[&Vec<String>], out: &mut Vec<String>) {
    if lists.iter().any(|list| list.is_empty()) {
        return;
    }
    let mut indices = vec![0usize; lists.len()];
    loop {
        let token = indices
            .iter()
            .zip(lists)
            .map(|(&i, list)| list[i].as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        out.push(token);

        let mut position = lists.len();
        loop {
            if position == 0 {
                return;
            }
            position -= 1;
            indices[position] += 1;
            if indices[position] < lists[position].len() {
                break;
            }
            indices[position] = 0;
        }
    }
}

impl PreprocessingLayer for CategoryCrossing {
    /// Crosses a single column: with the default depth this canonicalizes
    /// each value to its composite-token form (string or hashed bin).
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        self.cross(std::slice::from_ref(input))
    }

    fn name(&self) -> &str {
        "CategoryCrossing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featflow_tensor::Scalar;

    fn dense_i64(shape: &[usize], data: Vec<i64>) -> Tensor {
        Tensor::from(DenseTensor::from_i64(shape, data).unwrap())
    }

    #[test]
    fn test_full_cross_order() {
        let a = dense_i64(&[1, 2], vec![1, 2]);
        let b = dense_i64(&[1, 2], vec![1, 3]);
        let crossed = CategoryCrossing::new().cross(&[a, b]).unwrap();
        let dense = crossed.as_dense().unwrap();
        assert_eq!(dense.shape().as_slice(), &[1, 4]);
        let tokens: Vec<&str> = dense
            .values()
            .as_str()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(tokens, ["1_X_1", "1_X_3", "2_X_1", "2_X_3"]);
    }

    #[test]
    fn test_three_way_cross_width() {
        let a = dense_i64(&[2, 2], vec![1, 2, 3, 4]);
        let b = dense_i64(&[2, 1], vec![5, 6]);
        let c = dense_i64(&[2, 2], vec![7, 8, 9, 0]);
        let crossed = CategoryCrossing::new().cross(&[a, b, c]).unwrap();
        let dense = crossed.as_dense().unwrap();
        assert_eq!(dense.shape().as_slice(), &[2, 4]);
        let tokens = dense.values().as_str().unwrap();
        assert_eq!(tokens[0], "1_X_5_X_7");
        assert_eq!(tokens[3], "2_X_5_X_8");
        assert_eq!(tokens[4], "3_X_6_X_9");
    }

    #[test]
    fn test_pairwise_depth() {
        let a = dense_i64(&[1, 1], vec![1]);
        let b = dense_i64(&[1, 1], vec![2]);
        let c = dense_i64(&[1, 1], vec![3]);
        let crossed = CategoryCrossing::new()
            .with_depth(vec![2])
            .unwrap()
            .cross(&[a, b, c])
            .unwrap();
        let tokens: Vec<&str> = crossed
            .as_dense()
            .unwrap()
            .values()
            .as_str()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        // Subsets (a,b), (a,c), (b,c) in lexicographic input order.
        assert_eq!(tokens, ["1_X_2", "1_X_3", "2_X_3"]);
    }

    #[test]
    fn test_mixed_depths_in_given_order() {
        let a = dense_i64(&[1, 1], vec![1]);
        let b = dense_i64(&[1, 1], vec![2]);
        let crossed = CategoryCrossing::new()
            .with_depth(vec![1, 2])
            .unwrap()
            .cross(&[a, b])
            .unwrap();
        let tokens: Vec<&str> = crossed
            .as_dense()
            .unwrap()
            .values()
            .as_str()
            .unwrap()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(tokens, ["1", "2", "1_X_2"]);
    }

    #[test]
    fn test_hashed_output_in_range_and_deterministic() {
        let a = dense_i64(&[1, 2], vec![1, 2]);
        let b = dense_i64(&[1, 2], vec![1, 3]);
        let layer = CategoryCrossing::new().with_num_bins(10).unwrap();
        let first = layer.cross(&[a.clone(), b.clone()]).unwrap();
        let second = layer.cross(&[a, b]).unwrap();
        assert_eq!(first, second);
        let bins = first.as_dense().unwrap().values().as_i64().unwrap();
        assert_eq!(bins.len(), 4);
        for &bin in bins {
            assert!((0..10).contains(&bin));
        }
        // Matches hashing the composite token directly.
        let expected = (fingerprint::fingerprint64(b"1_X_1") % 10) as i64;
        assert_eq!(bins[0], expected);
    }

    #[test]
    fn test_sparse_input_yields_sparse_output() {
        let dense_a = DenseTensor::from_i64(&[2, 2], vec![1, 0, 0, 0]).unwrap();
        let a = Tensor::from(SparseTensor::from_dense(&dense_a, &Scalar::I64(0)).unwrap());
        let b = dense_i64(&[2, 2], vec![5, 6, 7, 8]);
        let crossed = CategoryCrossing::new().cross(&[a, b]).unwrap();
        let sparse = crossed.as_sparse().unwrap();
        // Example 0 crosses {1} x {5,6}; example 1 has no entries in `a`.
        assert_eq!(sparse.coordinates(), &[vec![0, 0], vec![0, 1]]);
        let tokens = sparse.values().as_str().unwrap();
        assert_eq!(tokens, &["1_X_5", "1_X_6"]);
        assert_eq!(sparse.dense_shape().as_slice(), &[2, 2]);
    }

    #[test]
    fn test_string_and_integer_columns_cross() {
        let a = Tensor::from(
            DenseTensor::from_strings(&[1, 1], vec!["us".into()]).unwrap(),
        );
        let b = dense_i64(&[1, 2], vec![1, 2]);
        let crossed = CategoryCrossing::new().cross(&[a, b]).unwrap();
        let tokens = crossed.as_dense().unwrap().values().as_str().unwrap();
        assert_eq!(tokens, &["us_X_1", "us_X_2"]);
    }

    #[test]
    fn test_batch_mismatch_rejected() {
        let a = dense_i64(&[1, 1], vec![1]);
        let b = dense_i64(&[2, 1], vec![1, 2]);
        let err = CategoryCrossing::new().cross(&[a, b]).unwrap_err();
        assert!(matches!(err, LayerError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_invalid_configs() {
        assert!(CategoryCrossing::new().with_depth(vec![]).is_err());
        assert!(CategoryCrossing::new().with_depth(vec![0]).is_err());
        assert!(CategoryCrossing::new().with_num_bins(0).is_err());
        let a = dense_i64(&[1, 1], vec![1]);
        let err = CategoryCrossing::new()
            .with_depth(vec![3])
            .unwrap()
            .cross(&[a])
            .unwrap_err();
        assert!(matches!(err, LayerError::Config { .. }));
        assert!(CategoryCrossing::new().cross(&[]).is_err());
    }

    #[test]
    fn test_rank_one_rejected() {
        let bad = Tensor::from(DenseTensor::from_i64(&[3], vec![1, 2, 3]).unwrap());
        let err = CategoryCrossing::new().cross(&[bad]).unwrap_err();
        assert!(matches!(
            err,
            LayerError::Rank {
                expected: 2,
                actual: 1
            }
        ));
    }
}
