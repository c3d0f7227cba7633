//! The shared preprocessing-layer capability and sequential pipelines.

use crate::error::Result;
use featflow_tensor::Tensor;

/// A batched, pure tensor transformation.
///
/// Every preprocessing stage implements this trait, which is what lets
/// callers compose stages uniformly: a pipeline is explicit data holding
/// boxed layers, not an inheritance hierarchy.
///
/// `apply` takes `&self` and must be deterministic: layers mutate state only
/// in their adaptation passes (which take `&mut self`), so a layer that is
/// being applied is frozen and safe to share across threads.
///
/// # Example
///
/// ```
/// use featflow_layers::hashing::Hashing;
/// use featflow_layers::layer::PreprocessingLayer;
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let layer = Hashing::new(16).unwrap();
/// let input = Tensor::from(
///     DenseTensor::from_strings(&[1, 2], vec!["a".into(), "b".into()]).unwrap(),
/// );
/// let output = layer.apply(&input).unwrap();
/// assert_eq!(output.dense_shape().as_slice(), &[1, 2]);
/// ```
pub trait PreprocessingLayer: Send + Sync {
    /// Transforms one input batch into one output batch.
    ///
    /// Dense input produces dense output and sparse input produces sparse
    /// output unless the layer's contract says otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::LayerError`] if the input's element type, shape, or
    /// values are incompatible with the layer; no partial output is ever
    /// produced.
    fn apply(&self, input: &Tensor) -> Result<Tensor>;

    /// Returns the name of the layer for debugging and logging purposes.
    fn name(&self) -> &str {
        "PreprocessingLayer"
    }
}

/// A sequence of preprocessing layers applied in order.
///
/// # Example
///
/// ```
/// use featflow_layers::layer::{Pipeline, PreprocessingLayer};
/// use featflow_layers::hashing::Hashing;
/// use featflow_layers::materialize::SparseMaterializer;
/// use featflow_tensor::{DenseTensor, Scalar, Tensor};
///
/// let pipeline = Pipeline::new()
///     .with_stage(SparseMaterializer::new(Scalar::from("")))
///     .with_stage(Hashing::new(8).unwrap());
///
/// let input = Tensor::from(
///     DenseTensor::from_strings(&[1, 2], vec!["a".into(), "".into()]).unwrap(),
/// );
/// let output = pipeline.apply(&input).unwrap();
/// assert!(output.is_sparse());
/// ```
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn PreprocessingLayer>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage, builder style.
    pub fn with_stage(mut self, stage: impl PreprocessingLayer + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Appends an already boxed stage.
    pub fn push(&mut self, stage: Box<dyn PreprocessingLayer>) {
        self.stages.push(stage);
    }

    /// Returns the number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline holds no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl PreprocessingLayer for Pipeline {
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        let mut current = input.clone();
        for stage in &self.stages {
            current = stage.apply(&current)?;
        }
        Ok(current)
    }

    fn name(&self) -> &str {
        "Pipeline"
    }
}
