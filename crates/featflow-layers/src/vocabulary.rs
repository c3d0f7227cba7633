//! Vocabularies: ordered token→index mappings.
//!
//! A [`Vocabulary`] is an ordered, deduplicated token sequence with O(1)
//! token→position lookup. It can be supplied explicitly (from a list or a
//! one-token-per-line file) or learned from sample data with a
//! [`VocabularyBuilder`], which ranks tokens by frequency with first-seen
//! order breaking ties.

use crate::error::{LayerError, Result};
use featflow_tensor::{DType, Scalar, Tensor};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Returns the canonical string form of a token: the string itself, or the
/// decimal representation of an integer. Consistent with the byte encoding
/// used by the fingerprint, so vocabulary lookup and OOV hashing agree on
/// token identity.
pub(crate) fn token_string(token: &Scalar) -> Result<Cow<'_, str>> {
    match token {
        Scalar::Str(s) => Ok(Cow::Borrowed(s.as_str())),
        Scalar::I64(v) => Ok(Cow::Owned(v.to_string())),
        Scalar::F32(_) => Err(LayerError::TypeMismatch {
            expected: DType::Str,
            got: DType::F32,
        }),
    }
}

/// An ordered, deduplicated sequence of tokens mapping token → 0-based
/// position.
///
/// # Examples
///
/// ```
/// use featflow_layers::vocabulary::Vocabulary;
///
/// let vocab = Vocabulary::from_tokens(["cat", "dog", "emu"]).unwrap();
/// assert_eq!(vocab.len(), 3);
/// assert_eq!(vocab.position("dog"), Some(1));
/// assert_eq!(vocab.position("yak"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from an explicit token sequence; order defines
    /// index assignment.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Config`] if the sequence contains a duplicate
    /// token.
    pub fn from_tokens<I, T>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(tokens.len());
        for (position, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), position).is_some() {
                return Err(LayerError::Config {
                    message: format!("duplicate vocabulary token: {:?}", token),
                });
            }
        }
        Ok(Self { tokens, index })
    }

    /// Loads a vocabulary from a file with one token per line; line order
    /// defines index assignment. The file is consumed read-only and its
    /// handle is released before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Io`] on read failure and [`LayerError::Config`]
    /// on duplicate tokens.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut tokens = Vec::new();
        for line in reader.lines() {
            tokens.push(line?);
        }
        let vocab = Self::from_tokens(tokens)?;
        tracing::info!(
            path = %path.display(),
            tokens = vocab.len(),
            "Loaded vocabulary file"
        );
        Ok(vocab)
    }

    /// Returns the number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the vocabulary holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the 0-based position of a token, or `None` if absent.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Returns the token at a position.
    pub fn token(&self, position: usize) -> Option<&str> {
        self.tokens.get(position).map(String::as_str)
    }

    /// Returns the tokens in index order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenStats {
    count: u64,
    first_seen: usize,
}

/// Accumulates token frequencies across sample batches and builds a
/// frequency-ranked [`Vocabulary`].
///
/// Ranking: descending count, ties broken by first-seen order.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    stats: HashMap<String, TokenStats>,
    observed: usize,
}

impl VocabularyBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every token of a batch (dense or sparse, string or integer).
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::TypeMismatch`] for float batches.
    pub fn feed(&mut self, batch: &Tensor) -> Result<()> {
        let values = match batch {
            Tensor::Dense(t) => t.values(),
            Tensor::Sparse(t) => t.values(),
        };
        for value in values.iter() {
            let token = token_string(&value)?.into_owned();
            let next_rank = self.observed;
            let stats = self.stats.entry(token).or_insert(TokenStats {
                count: 0,
                first_seen: next_rank,
            });
            stats.count += 1;
            self.observed += 1;
        }
        Ok(())
    }

    /// Returns the number of distinct tokens observed so far.
    pub fn distinct(&self) -> usize {
        self.stats.len()
    }

    /// Builds the vocabulary, keeping at most `max_tokens` of the most
    /// frequent tokens.
    pub fn build(self, max_tokens: Option<usize>) -> Result<Vocabulary> {
        let mut ranked: Vec<(String, TokenStats)> = self.stats.into_iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count.cmp(&a.count).then(a.first_seen.cmp(&b.first_seen))
        });
        if let Some(cap) = max_tokens {
            ranked.truncate(cap);
        }
        Vocabulary::from_tokens(ranked.into_iter().map(|(token, _)| token))
    }
}
