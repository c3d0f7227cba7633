//! Index-space to category-space aggregation.

use crate::adapt::FitState;
use crate::error::{LayerError, Result};
use crate::layer::PreprocessingLayer;
use featflow_tensor::{DType, DenseTensor, Shape, SparseTensor, Tensor, TensorError, Values};
use serde::{Deserialize, Serialize};

/// How occurrences of each category are reduced into one output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingMode {
    /// Direct one-hot expansion; the input must hold exactly one value per
    /// example along the reduced axis.
    OneHot,
    /// Number of occurrences per category.
    Count,
    /// Count divided by the number of values present in the example along
    /// the reduced axis.
    AvgCount,
    /// 1 if the category occurs at least once, else 0 (capped, not counted).
    Binary,
    /// Count weighted by an inverse-document-frequency statistic learned by
    /// [`CategoryEncoding::adapt`].
    TfIdf,
}

/// Aggregates index-space values into fixed-width category-space vectors
/// consumable by linear models and dense layers.
///
/// Input values must be integers in `[0, num_categories)`. The reduction
/// runs along `axis` (default: last); the output replaces that axis with a
/// `num_categories`-wide float dimension.
///
/// # Examples
///
/// ```
/// use featflow_layers::encoding::{CategoryEncoding, EncodingMode};
/// use featflow_layers::layer::PreprocessingLayer;
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
/// let input = Tensor::from(DenseTensor::from_i64(&[2, 2], vec![0, 2, 2, 2]).unwrap());
/// let output = layer.apply(&input).unwrap();
/// assert_eq!(
///     output.as_dense().unwrap().values().as_f32(),
///     Some(&[1.0, 0.0, 1.0, 0.0, 0.0, 2.0][..])
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEncoding {
    num_categories: usize,
    mode: EncodingMode,
    axis: Option<usize>,
    sparse_out: bool,
    idf: FitState<Vec<f32>>,
}

struct Grouped {
    group_shape: Shape,
    /// (group offset, category) per input value, in scan order.
    entries: Vec<(usize, i64)>,
    /// Occurrence weight per entry, aligned with `entries`.
    weights: Vec<f32>,
    /// Number of values present per group.
    counts: Vec<usize>,
}

impl CategoryEncoding {
    /// Creates an encoding layer.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if `num_categories` is zero.
    pub fn new(num_categories: usize, mode: EncodingMode) -> Result<Self> {
        if num_categories == 0 {
            return Err(LayerError::Config {
                message: "num_categories must be positive".to_string(),
            });
        }
        Ok(Self {
            num_categories,
            mode,
            axis: None,
            sparse_out: false,
            idf: FitState::Unfitted,
        })
    }

    /// Sets the reduced (multivalent) axis. Defaults to the last axis.
    pub fn with_axis(mut self, axis: usize) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Materializes the aggregate sparse (only nonzero category slots).
    pub fn with_sparse_output(mut self, sparse_out: bool) -> Self {
        self.sparse_out = sparse_out;
        self
    }

    /// Returns the declared category count.
    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    /// Learns the inverse-document-frequency table from a reference corpus,
    /// replacing any previous table. Each reduction group of each batch
    /// counts as one document.
    ///
    /// The table is `idf[c] = ln((1 + N) / (1 + df[c])) + 1`, with `N` the
    /// number of documents and `df[c]` the number of documents containing
    /// category `c`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::InvalidMode`] unless the layer's mode is
    /// [`EncodingMode::TfIdf`], and [`LayerError::IndexOutOfRange`] for
    /// corpus values outside `[0, num_categories)`.
    pub fn adapt<I>(&mut self, batches: I) -> Result<()>
    where
        I: IntoIterator<Item = Tensor>,
    {
        if self.mode != EncodingMode::TfIdf {
            return Err(LayerError::InvalidMode {
                message: "adapt is only meaningful for the tf-idf mode".to_string(),
            });
        }
        let mut document_count = 0u64;
        let mut document_frequency = vec![0u64; self.num_categories];
        for batch in batches {
            let grouped = self.grouped(&batch, None)?;
            let num_groups = grouped.group_shape.numel();
            let mut present = vec![false; num_groups * self.num_categories];
            for &(group, category) in &grouped.entries {
                present[group * self.num_categories + category as usize] = true;
            }
            for group in 0..num_groups {
                for category in 0..self.num_categories {
                    if present[group * self.num_categories + category] {
                        document_frequency[category] += 1;
                    }
                }
            }
            document_count += num_groups as u64;
        }
        let idf: Vec<f32> = document_frequency
            .iter()
            .map(|&df| ((1 + document_count) as f32 / (1 + df) as f32).ln() + 1.0)
            .collect();
        tracing::info!(
            documents = document_count,
            "Adapted CategoryEncoding idf table"
        );
        self.idf.replace(idf);
        Ok(())
    }

    /// Encodes with a parallel weight tensor multiplying each occurrence's
    /// contribution.
    ///
    /// The weights must mirror the input: same representation, same shape,
    /// and (for sparse input) the same coordinate list, with `f32` values.
    ///
    /// # Errors
    ///
    /// In addition to the unweighted errors: [`LayerError::InvalidMode`] for
    /// the binary and one-hot modes, [`LayerError::InvalidWeights`] for
    /// misaligned weights.
    pub fn apply_weighted(&self, input: &Tensor, weights: &Tensor) -> Result<Tensor> {
        if matches!(self.mode, EncodingMode::Binary | EncodingMode::OneHot) {
            return Err(LayerError::InvalidMode {
                message: "weights are not meaningful for binary or one-hot encoding".to_string(),
            });
        }
        self.encode(input, Some(weights))
    }

    fn resolve_axis(&self, rank: usize) -> Result<usize> {
        if rank == 0 {
            return Err(LayerError::Rank {
                expected: 1,
                actual: 0,
            });
        }
        let axis = self.axis.unwrap_or(rank - 1);
        if axis >= rank {
            return Err(LayerError::Config {
                message: format!("axis {} out of range for rank {} input", axis, rank),
            });
        }
        Ok(axis)
    }

    fn check_category(&self, category: i64) -> Result<()> {
        if category < 0 || category as usize >= self.num_categories {
            return Err(LayerError::IndexOutOfRange {
                index: category,
                num_categories: self.num_categories,
            });
        }
        Ok(())
    }

    fn group_offset(
        shape_coords: &[usize],
        axis: usize,
        group_shape: &Shape,
    ) -> Result<usize> {
        let group_coords: Vec<usize> = shape_coords
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .map(|(_, c)| *c)
            .collect();
        group_shape.offset_of(&group_coords).ok_or_else(|| {
            LayerError::Tensor(TensorError::InvalidCoordinates {
                message: format!("coordinate {:?} escapes its group space", shape_coords),
            })
        })
    }

    fn grouped(&self, input: &Tensor, weights: Option<&Tensor>) -> Result<Grouped> {
        let shape = input.dense_shape();
        let axis = self.resolve_axis(shape.ndim())?;
        if input.dtype() != DType::I64 {
            return Err(LayerError::TypeMismatch {
                expected: DType::I64,
                got: input.dtype(),
            });
        }
        let group_dims: Vec<usize> = shape
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != axis)
            .map(|(_, d)| *d)
            .collect();
        let group_shape = Shape::new(group_dims);
        let mut counts = vec![0usize; group_shape.numel()];
        let mut entries = Vec::new();
        let mut entry_weights = Vec::new();

        match input {
            Tensor::Dense(dense) => {
                let weight_data = match weights {
                    None => None,
                    Some(Tensor::Dense(w)) => {
                        if w.shape() != dense.shape() {
                            return Err(LayerError::ShapeMismatch {
                                expected: dense.shape().as_slice().to_vec(),
                                actual: w.shape().as_slice().to_vec(),
                            });
                        }
                        Some(Self::weight_values(w.values())?)
                    }
                    Some(Tensor::Sparse(_)) => {
                        return Err(LayerError::InvalidWeights {
                            message: "dense input requires dense weights".to_string(),
                        })
                    }
                };
                let values = dense.values().as_i64().ok_or(LayerError::TypeMismatch {
                    expected: DType::I64,
                    got: dense.dtype(),
                })?;
                for (offset, &category) in values.iter().enumerate() {
                    self.check_category(category)?;
                    let coords = shape.coords_of(offset);
                    let group = Self::group_offset(&coords, axis, &group_shape)?;
                    entries.push((group, category));
                    entry_weights.push(weight_data.map_or(1.0, |w| w[offset]));
                    counts[group] += 1;
                }
            }
            Tensor::Sparse(sparse) => {
                let weight_data = match weights {
                    None => None,
                    Some(Tensor::Sparse(w)) => {
                        if w.dense_shape() != sparse.dense_shape() {
                            return Err(LayerError::ShapeMismatch {
                                expected: sparse.dense_shape().as_slice().to_vec(),
                                actual: w.dense_shape().as_slice().to_vec(),
                            });
                        }
                        if w.coordinates() != sparse.coordinates() {
                            return Err(LayerError::InvalidWeights {
                                message: "weight coordinates differ from input coordinates"
                                    .to_string(),
                            });
                        }
                        Some(Self::weight_values(w.values())?)
                    }
                    Some(Tensor::Dense(_)) => {
                        return Err(LayerError::InvalidWeights {
                            message: "sparse input requires sparse weights".to_string(),
                        })
                    }
                };
                let values = sparse.values().as_i64().ok_or(LayerError::TypeMismatch {
                    expected: DType::I64,
                    got: sparse.dtype(),
                })?;
                for (i, coords) in sparse.coordinates().iter().enumerate() {
                    let category = values[i];
                    self.check_category(category)?;
                    let group = Self::group_offset(coords, axis, &group_shape)?;
                    entries.push((group, category));
                    entry_weights.push(weight_data.map_or(1.0, |w| w[i]));
                    counts[group] += 1;
                }
            }
        }

        Ok(Grouped {
            group_shape,
            entries,
            weights: entry_weights,
            counts,
        })
    }

    fn weight_values(values: &Values) -> Result<&[f32]> {
        values.as_f32().ok_or(LayerError::TypeMismatch {
            expected: DType::F32,
            got: values.dtype(),
        })
    }

    fn encode(&self, input: &Tensor, weights: Option<&Tensor>) -> Result<Tensor> {
        let idf = match self.mode {
            EncodingMode::TfIdf => Some(self.idf.fitted("CategoryEncoding")?.clone()),
            _ => None,
        };
        let shape = input.dense_shape();
        let axis = self.resolve_axis(shape.ndim())?;
        let grouped = self.grouped(input, weights)?;
        let num_groups = grouped.group_shape.numel();

        if self.mode == EncodingMode::OneHot {
            if let Some(bad) = grouped.counts.iter().find(|&&count| count != 1) {
                return Err(LayerError::InvalidMode {
                    message: format!(
                        "one-hot encoding expects exactly one value per example, got {}",
                        bad
                    ),
                });
            }
        }

        let mut acc = vec![0f32; num_groups * self.num_categories];
        for (&(group, category), &weight) in grouped.entries.iter().zip(&grouped.weights) {
            let slot = group * self.num_categories + category as usize;
            match self.mode {
                EncodingMode::Binary | EncodingMode::OneHot => acc[slot] = 1.0,
                _ => acc[slot] += weight,
            }
        }
        match self.mode {
            EncodingMode::AvgCount => {
                for group in 0..num_groups {
                    let count = grouped.counts[group];
                    if count > 0 {
                        for slot in &mut acc[group * self.num_categories..][..self.num_categories]
                        {
                            *slot /= count as f32;
                        }
                    }
                }
            }
            EncodingMode::TfIdf => {
                if let Some(idf) = &idf {
                    for group in 0..num_groups {
                        for (category, factor) in idf.iter().enumerate() {
                            acc[group * self.num_categories + category] *= factor;
                        }
                    }
                }
            }
            _ => {}
        }

        let mut out_dims = shape.as_slice().to_vec();
        out_dims[axis] = self.num_categories;
        let out_shape = Shape::new(out_dims);

        if self.sparse_out {
            let mut nonzero: Vec<(usize, Vec<usize>, f32)> = Vec::new();
            for group in 0..num_groups {
                let group_coords = grouped.group_shape.coords_of(group);
                for category in 0..self.num_categories {
                    let value = acc[group * self.num_categories + category];
                    if value != 0.0 {
                        let mut coords = group_coords.clone();
                        coords.insert(axis, category);
                        let offset = out_shape.offset_of(&coords).ok_or_else(|| {
                            LayerError::Tensor(TensorError::InvalidCoordinates {
                                message: format!("coordinate {:?} out of output bounds", coords),
                            })
                        })?;
                        nonzero.push((offset, coords, value));
                    }
                }
            }
            nonzero.sort_by_key(|(offset, _, _)| *offset);
            let mut coordinates = Vec::with_capacity(nonzero.len());
            let mut values = Vec::with_capacity(nonzero.len());
            for (_, coords, value) in nonzero {
                coordinates.push(coords);
                values.push(value);
            }
            Ok(Tensor::from(SparseTensor::new(
                coordinates,
                Values::F32(values),
                out_shape,
            )?))
        } else {
            let mut data = vec![0f32; out_shape.numel()];
            for group in 0..num_groups {
                let group_coords = grouped.group_shape.coords_of(group);
                for category in 0..self.num_categories {
                    let mut coords = group_coords.clone();
                    coords.insert(axis, category);
                    if let Some(offset) = out_shape.offset_of(&coords) {
                        data[offset] = acc[group * self.num_categories + category];
                    }
                }
            }
            Ok(Tensor::from(DenseTensor::new(out_shape, Values::F32(data))?))
        }
    }
}

impl PreprocessingLayer for CategoryEncoding {
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        self.encode(input, None)
    }

    fn name(&self) -> &str {
        "CategoryEncoding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use featflow_tensor::Scalar;

    fn input_2x2() -> Tensor {
        Tensor::from(DenseTensor::from_i64(&[2, 2], vec![0, 2, 2, 2]).unwrap())
    }

    fn dense_f32(t: &Tensor) -> &[f32] {
        t.as_dense().unwrap().values().as_f32().unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "expected {:?}, got {:?}", expected, actual);
        }
    }

    #[test]
    fn test_count() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
        let out = layer.apply(&input_2x2()).unwrap();
        assert_eq!(out.dense_shape().as_slice(), &[2, 3]);
        assert_close(dense_f32(&out), &[1.0, 0.0, 1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_avg_count() {
        let layer = CategoryEncoding::new(3, EncodingMode::AvgCount).unwrap();
        let out = layer.apply(&input_2x2()).unwrap();
        assert_close(dense_f32(&out), &[0.5, 0.0, 0.5, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_binary_caps_counts() {
        let layer = CategoryEncoding::new(3, EncodingMode::Binary).unwrap();
        let out = layer.apply(&input_2x2()).unwrap();
        assert_close(dense_f32(&out), &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_one_hot() {
        let layer = CategoryEncoding::new(3, EncodingMode::OneHot).unwrap();
        let input = Tensor::from(DenseTensor::from_i64(&[2, 1], vec![0, 2]).unwrap());
        let out = layer.apply(&input).unwrap();
        assert_close(dense_f32(&out), &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_one_hot_rejects_multivalent() {
        let layer = CategoryEncoding::new(3, EncodingMode::OneHot).unwrap();
        let err = layer.apply(&input_2x2()).unwrap_err();
        assert!(matches!(err, LayerError::InvalidMode { .. }));
    }

    #[test]
    fn test_one_hot_rejects_empty_sparse_row() {
        let layer = CategoryEncoding::new(3, EncodingMode::OneHot).unwrap();
        let sparse = SparseTensor::new(
            vec![vec![0, 0]],
            Values::from(vec![1i64]),
            Shape::matrix(2, 1),
        )
        .unwrap();
        let err = layer.apply(&Tensor::from(sparse)).unwrap_err();
        assert!(matches!(err, LayerError::InvalidMode { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
        let high = Tensor::from(DenseTensor::from_i64(&[1, 1], vec![3]).unwrap());
        assert!(matches!(
            layer.apply(&high),
            Err(LayerError::IndexOutOfRange {
                index: 3,
                num_categories: 3
            })
        ));
        let negative = Tensor::from(DenseTensor::from_i64(&[1, 1], vec![-1]).unwrap());
        assert!(matches!(
            layer.apply(&negative),
            Err(LayerError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_tfidf_requires_adaptation() {
        let layer = CategoryEncoding::new(3, EncodingMode::TfIdf).unwrap();
        let err = layer.apply(&input_2x2()).unwrap_err();
        assert!(matches!(err, LayerError::NotAdapted { .. }));
    }

    #[test]
    fn test_tfidf_weighting() {
        let mut layer = CategoryEncoding::new(2, EncodingMode::TfIdf).unwrap();
        // Two documents: {0, 1} and {0}; df = [2, 1], N = 2.
        layer
            .adapt(vec![Tensor::from(
                DenseTensor::from_i64(&[2, 2], vec![0, 1, 0, 0]).unwrap(),
            )])
            .unwrap();
        let input = Tensor::from(DenseTensor::from_i64(&[2, 2], vec![0, 0, 1, 1]).unwrap());
        let out = layer.apply(&input).unwrap();
        let idf0 = (3.0f32 / 3.0).ln() + 1.0;
        let idf1 = (3.0f32 / 2.0).ln() + 1.0;
        assert_close(dense_f32(&out), &[2.0 * idf0, 0.0, 0.0, 2.0 * idf1]);
    }

    #[test]
    fn test_adapt_rejected_for_other_modes() {
        let mut layer = CategoryEncoding::new(2, EncodingMode::Count).unwrap();
        let err = layer.adapt(vec![input_2x2()]).unwrap_err();
        assert!(matches!(err, LayerError::InvalidMode { .. }));
    }

    #[test]
    fn test_weighted_count() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
        let input = Tensor::from(DenseTensor::from_i64(&[1, 2], vec![0, 2]).unwrap());
        let weights = Tensor::from(DenseTensor::from_f32(&[1, 2], vec![2.0, 0.5]).unwrap());
        let out = layer.apply_weighted(&input, &weights).unwrap();
        assert_close(dense_f32(&out), &[2.0, 0.0, 0.5]);
    }

    #[test]
    fn test_weighted_binary_rejected() {
        let layer = CategoryEncoding::new(3, EncodingMode::Binary).unwrap();
        let input = Tensor::from(DenseTensor::from_i64(&[1, 1], vec![0]).unwrap());
        let weights = Tensor::from(DenseTensor::from_f32(&[1, 1], vec![1.0]).unwrap());
        assert!(matches!(
            layer.apply_weighted(&input, &weights),
            Err(LayerError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_weight_misalignment_rejected() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
        let input = Tensor::from(DenseTensor::from_i64(&[1, 2], vec![0, 1]).unwrap());
        let wrong_shape = Tensor::from(DenseTensor::from_f32(&[1, 3], vec![1.0, 1.0, 1.0]).unwrap());
        assert!(matches!(
            layer.apply_weighted(&input, &wrong_shape),
            Err(LayerError::ShapeMismatch { .. })
        ));

        let dense = DenseTensor::from_i64(&[1, 2], vec![0, 1]).unwrap();
        let sparse_input = Tensor::from(SparseTensor::from_dense(&dense, &Scalar::I64(-1)).unwrap());
        let dense_weights = Tensor::from(DenseTensor::from_f32(&[1, 2], vec![1.0, 1.0]).unwrap());
        assert!(matches!(
            layer.apply_weighted(&sparse_input, &dense_weights),
            Err(LayerError::InvalidWeights { .. })
        ));
    }

    #[test]
    fn test_sparse_input_counts_present_entries() {
        let layer = CategoryEncoding::new(3, EncodingMode::AvgCount).unwrap();
        let sparse = SparseTensor::new(
            vec![vec![0, 0], vec![0, 2], vec![1, 1]],
            Values::from(vec![0i64, 2, 2]),
            Shape::matrix(2, 3),
        )
        .unwrap();
        let out = layer.apply(&Tensor::from(sparse)).unwrap();
        // Example 0 has two entries, example 1 has one.
        assert_close(dense_f32(&out), &[0.5, 0.0, 0.5, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_sparse_output_holds_only_nonzero_slots() {
        let layer = CategoryEncoding::new(4, EncodingMode::Count)
            .unwrap()
            .with_sparse_output(true);
        let input = Tensor::from(DenseTensor::from_i64(&[2, 2], vec![3, 3, 0, 1]).unwrap());
        let out = layer.apply(&input).unwrap();
        let sparse = out.as_sparse().unwrap();
        assert_eq!(sparse.dense_shape().as_slice(), &[2, 4]);
        assert_eq!(
            sparse.coordinates(),
            &[vec![0, 3], vec![1, 0], vec![1, 1]]
        );
        assert_eq!(sparse.values().as_f32(), Some(&[2.0f32, 1.0, 1.0][..]));
    }

    #[test]
    fn test_axis_zero_reduction() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap().with_axis(0);
        let input = Tensor::from(DenseTensor::from_i64(&[2, 1], vec![0, 1]).unwrap());
        let out = layer.apply(&input).unwrap();
        assert_eq!(out.dense_shape().as_slice(), &[3, 1]);
        assert_close(dense_f32(&out), &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(CategoryEncoding::new(0, EncodingMode::Count).is_err());
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap().with_axis(2);
        let input = Tensor::from(DenseTensor::from_i64(&[1, 1], vec![0]).unwrap());
        assert!(matches!(
            layer.apply(&input),
            Err(LayerError::Config { .. })
        ));
    }

    #[test]
    fn test_float_input_rejected() {
        let layer = CategoryEncoding::new(3, EncodingMode::Count).unwrap();
        let input = Tensor::from(DenseTensor::from_f32(&[1, 1], vec![0.0]).unwrap());
        assert!(matches!(
            layer.apply(&input),
            Err(LayerError::TypeMismatch { .. })
        ));
    }
}
