//! Vocabulary-backed token-to-index lookup.

use crate::adapt::FitState;
use crate::error::{LayerError, Result};
use crate::fingerprint;
use crate::layer::PreprocessingLayer;
use crate::vocabulary::{token_string, Vocabulary, VocabularyBuilder};
use featflow_tensor::{DenseTensor, Scalar, SparseTensor, Tensor, Values};
use serde::{Deserialize, Serialize};

/// What to do with an out-of-vocabulary token when no OOV buckets are
/// configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownPolicy {
    /// Fail the call with [`LayerError::OutOfVocabulary`].
    #[default]
    Error,
    /// Drop the entry from sparse outputs. Dense cells cannot be absent, so
    /// dense inputs still fail.
    Drop,
}

/// Construction-time configuration for [`IndexLookup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexLookupConfig {
    /// Cap on the vocabulary size learned by `adapt`.
    pub max_tokens: Option<usize>,
    /// Number of index values reserved for out-of-vocabulary tokens.
    pub num_oov_tokens: usize,
    /// An explicit vocabulary; when supplied the layer is fitted from
    /// construction and `adapt` is not required.
    pub vocabulary: Option<Vocabulary>,
    /// Handling of unseen tokens when `num_oov_tokens` is zero.
    pub unknown_policy: UnknownPolicy,
}

impl Default for IndexLookupConfig {
    fn default() -> Self {
        Self {
            max_tokens: None,
            num_oov_tokens: 1,
            vocabulary: None,
            unknown_policy: UnknownPolicy::Error,
        }
    }
}

/// Maps raw categorical tokens (strings or integers) to dense integer
/// indices.
///
/// The index space is partitioned as `[0, num_oov_tokens)` for
/// out-of-vocabulary hash buckets and `[num_oov_tokens, num_oov_tokens +
/// vocabulary_size)` for in-vocabulary tokens, so a downstream
/// [`crate::encoding::CategoryEncoding`] can use [`IndexLookup::num_indices`]
/// as its category count.
///
/// The vocabulary is either supplied at construction (frozen for the layer's
/// lifetime) or learned by a single [`IndexLookup::adapt`] pass over sample
/// batches; re-adaptation replaces it wholesale.
///
/// # Examples
///
/// ```
/// use featflow_layers::index_lookup::{IndexLookup, IndexLookupConfig};
/// use featflow_layers::layer::PreprocessingLayer;
/// use featflow_layers::vocabulary::Vocabulary;
/// use featflow_tensor::{DenseTensor, Tensor};
///
/// let lookup = IndexLookup::new(IndexLookupConfig {
///     num_oov_tokens: 1,
///     vocabulary: Some(Vocabulary::from_tokens(["cat", "dog"]).unwrap()),
///     ..IndexLookupConfig::default()
/// })
/// .unwrap();
///
/// let input = Tensor::from(
///     DenseTensor::from_strings(&[1, 2], vec!["dog".into(), "cat".into()]).unwrap(),
/// );
/// let output = lookup.apply(&input).unwrap();
/// // "dog" is vocabulary position 1, shifted past the single OOV bucket.
/// assert_eq!(output.as_dense().unwrap().values().as_i64(), Some(&[2i64, 1][..]));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexLookup {
    max_tokens: Option<usize>,
    num_oov_tokens: usize,
    unknown_policy: UnknownPolicy,
    vocab: FitState<Vocabulary>,
}

impl IndexLookup {
    /// Creates an index-lookup layer from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if `max_tokens` is `Some(0)`.
    pub fn new(config: IndexLookupConfig) -> Result<Self> {
        if config.max_tokens == Some(0) {
            return Err(LayerError::Config {
                message: "max_tokens must be positive when set".to_string(),
            });
        }
        let vocab = match config.vocabulary {
            Some(vocabulary) => FitState::Fitted(vocabulary),
            None => FitState::Unfitted,
        };
        Ok(Self {
            max_tokens: config.max_tokens,
            num_oov_tokens: config.num_oov_tokens,
            unknown_policy: config.unknown_policy,
            vocab,
        })
    }

    /// Learns the vocabulary from sample batches: tokens are ranked by
    /// frequency (ties broken by first-seen order) and capped at
    /// `max_tokens`. Replaces any previous vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::TypeMismatch`] if a batch holds float values.
    pub fn adapt<I>(&mut self, batches: I) -> Result<()>
    where
        I: IntoIterator<Item = Tensor>,
    {
        let mut builder = VocabularyBuilder::new();
        for batch in batches {
            builder.feed(&batch)?;
        }
        let vocabulary = builder.build(self.max_tokens)?;
        tracing::info!(tokens = vocabulary.len(), "Adapted IndexLookup vocabulary");
        self.vocab.replace(vocabulary);
        Ok(())
    }

    /// Returns the current vocabulary, if fitted.
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocab.as_option()
    }

    /// Returns the size of the output index space: `num_oov_tokens` plus the
    /// vocabulary size (zero while unfitted).
    pub fn num_indices(&self) -> usize {
        self.num_oov_tokens + self.vocab.as_option().map_or(0, Vocabulary::len)
    }

    /// Maps one token. `Ok(None)` means the entry is dropped (sparse inputs
    /// under [`UnknownPolicy::Drop`] only).
    fn lookup(&self, token: &Scalar) -> Result<Option<i64>> {
        let canonical = token_string(token)?;
        if let Some(vocab) = self.vocab.as_option() {
            if let Some(position) = vocab.position(&canonical) {
                return Ok(Some((self.num_oov_tokens + position) as i64));
            }
        }
        if self.num_oov_tokens > 0 {
            return Ok(Some(fingerprint::bucket(token, self.num_oov_tokens, None)?));
        }
        match self.unknown_policy {
            UnknownPolicy::Drop => Ok(None),
            UnknownPolicy::Error => Err(LayerError::OutOfVocabulary {
                token: canonical.into_owned(),
            }),
        }
    }
}

impl PreprocessingLayer for IndexLookup {
    fn apply(&self, input: &Tensor) -> Result<Tensor> {
        // With no OOV range every token must come from a vocabulary.
        if self.num_oov_tokens == 0 {
            self.vocab.fitted("IndexLookup")?;
        }
        match input {
            Tensor::Dense(dense) => {
                let mut indices = Vec::with_capacity(dense.numel());
                for value in dense.values().iter() {
                    match self.lookup(&value)? {
                        Some(index) => indices.push(index),
                        None => {
                            return Err(LayerError::OutOfVocabulary {
                                token: token_string(&value)?.into_owned(),
                            })
                        }
                    }
                }
                Ok(Tensor::from(DenseTensor::new(
                    dense.shape().clone(),
                    Values::I64(indices),
                )?))
            }
            Tensor::Sparse(sparse) => {
                let mut coordinates = Vec::with_capacity(sparse.nnz());
                let mut indices = Vec::with_capacity(sparse.nnz());
                for (coords, value) in sparse.coordinates().iter().zip(sparse.values().iter()) {
                    if let Some(index) = self.lookup(&value)? {
                        coordinates.push(coords.clone());
                        indices.push(index);
                    }
                }
                Ok(Tensor::from(SparseTensor::new(
                    coordinates,
                    Values::I64(indices),
                    sparse.dense_shape().clone(),
                )?))
            }
        }
    }

    fn name(&self) -> &str {
        "IndexLookup"
    }
}
