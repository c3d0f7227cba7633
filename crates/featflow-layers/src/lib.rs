//! Categorical feature preprocessing layers.
//!
//! This crate converts raw categorical features (strings, hashed buckets,
//! crossed features) into numeric tensors consumable by linear models and
//! dense layers. It provides five composable stages:
//!
//! - **[`SparseMaterializer`]**: dense tensor + ignore value → sparse tensor
//! - **[`IndexLookup`]**: tokens → dense integer indices via a fitted or
//!   supplied vocabulary, with a reserved hash range for unseen tokens
//! - **[`Hashing`]**: tokens → bounded integer range via a stable fingerprint
//! - **[`CategoryCrossing`]**: Cartesian combinations of categorical columns
//! - **[`CategoryEncoding`]**: index-space values → fixed-width category
//!   vectors (count, average count, binary, tf-idf, one-hot)
//!
//! Every stage implements [`PreprocessingLayer`], so callers compose them
//! with an explicit [`Pipeline`]; stages that learn state (a vocabulary, an
//! idf table) do so in a single `adapt` pass and are frozen afterwards.
//!
//! # Quick start
//!
//! ```
//! use featflow_layers::prelude::*;
//! use featflow_tensor::{DenseTensor, Tensor};
//!
//! // Fit a vocabulary, then encode token counts per example.
//! let mut lookup = IndexLookup::new(IndexLookupConfig::default()).unwrap();
//! let samples = DenseTensor::from_strings(
//!     &[2, 2],
//!     vec!["cat".into(), "dog".into(), "cat".into(), "emu".into()],
//! )
//! .unwrap();
//! lookup.adapt(vec![Tensor::from(samples)]).unwrap();
//!
//! let encoding = CategoryEncoding::new(lookup.num_indices(), EncodingMode::Count).unwrap();
//!
//! let batch = Tensor::from(
//!     DenseTensor::from_strings(&[1, 2], vec!["cat".into(), "cat".into()]).unwrap(),
//! );
//! let indexed = lookup.apply(&batch).unwrap();
//! let counted = encoding.apply(&indexed).unwrap();
//! assert_eq!(counted.dense_shape().as_slice(), &[1, 4]);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adapt;
pub mod crossing;
pub mod encoding;
pub mod error;
pub mod fingerprint;
pub mod hashing;
pub mod index_lookup;
pub mod layer;
pub mod materialize;
pub mod vocabulary;

pub use adapt::FitState;
pub use crossing::CategoryCrossing;
pub use encoding::{CategoryEncoding, EncodingMode};
pub use error::{LayerError, Result};
pub use hashing::Hashing;
pub use index_lookup::{IndexLookup, IndexLookupConfig, UnknownPolicy};
pub use layer::{Pipeline, PreprocessingLayer};
pub use materialize::SparseMaterializer;
pub use vocabulary::{Vocabulary, VocabularyBuilder};

/// Convenience re-exports for building preprocessing pipelines.
pub mod prelude {
    pub use crate::crossing::CategoryCrossing;
    pub use crate::encoding::{CategoryEncoding, EncodingMode};
    pub use crate::error::LayerError;
    pub use crate::hashing::Hashing;
    pub use crate::index_lookup::{IndexLookup, IndexLookupConfig, UnknownPolicy};
    pub use crate::layer::{Pipeline, PreprocessingLayer};
    pub use crate::materialize::SparseMaterializer;
    pub use crate::vocabulary::{Vocabulary, VocabularyBuilder};
}
