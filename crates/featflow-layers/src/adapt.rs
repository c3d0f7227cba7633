//! The adapt-then-apply lifecycle.
//!
//! Layers that learn state from sample data (a vocabulary, an IDF table)
//! follow a two-phase lifecycle: a single mutable adaptation pass, then a
//! frozen read-only phase. [`FitState`] makes the two states explicit:
//! `Unfitted --adapt--> Fitted`, one-way, with re-adaptation replacing the
//! fitted value wholesale. Operations that need learned state fail with
//! [`LayerError::NotAdapted`] while `Unfitted`.

use crate::error::{LayerError, Result};
use serde::{Deserialize, Serialize};

/// Fitted-or-not state for an adaptable layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitState<T> {
    /// No adaptation pass has run and nothing was supplied at construction.
    Unfitted,
    /// Learned (or supplied) state, frozen until the next adaptation pass.
    Fitted(T),
}

impl<T> FitState<T> {
    /// Returns true in the fitted state.
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitState::Fitted(_))
    }

    /// Returns the fitted value, or [`LayerError::NotAdapted`] naming the
    /// requesting layer.
    pub fn fitted(&self, layer: &str) -> Result<&T> {
        match self {
            FitState::Fitted(value) => Ok(value),
            FitState::Unfitted => Err(LayerError::NotAdapted {
                layer: layer.to_string(),
            }),
        }
    }

    /// Returns the fitted value if present.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            FitState::Fitted(value) => Some(value),
            FitState::Unfitted => None,
        }
    }

    /// Installs a newly learned value, replacing any previous one.
    pub fn replace(&mut self, value: T) {
        *self = FitState::Fitted(value);
    }
}

impl<T> Default for FitState<T> {
    fn default() -> Self {
        FitState::Unfitted
    }
}
