//! # Error
//!
//! $$
//! \mathcal{E}=\{\text{configuration},\ \text{indexing},\ \text{shape},\ \text{parameter},\ \text{exhausted}\}
//! $$
//!
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DistributionError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
  /// A request that can never be satisfied by the current configuration,
  /// e.g. a without-replacement batch larger than the dataset.
  #[error("configuration error: {0}")]
  Configuration(String),
  /// An index structure that is neither a flat index list nor one index list
  /// per sample replicate, or an index outside the dataset.
  #[error("indexing error: {0}")]
  Indexing(String),
  #[error("shape mismatch: {0}")]
  ShapeMismatch(String),
  #[error("{distribution} requires parameter `{name}`")]
  MissingParameter {
    distribution: &'static str,
    name: &'static str,
  },
  #[error("invalid parameter `{name}`: {reason}")]
  InvalidParameter { name: &'static str, reason: String },
  #[error(
    "truncation exhausted after {restarts} restarts ({filled}/{requested} samples accepted in the last attempt)"
  )]
  TruncationExhausted {
    restarts: usize,
    filled: usize,
    requested: usize,
  },
}

impl DistributionError {
  /// Failures a base distribution may raise for a reduced batch; truncation
  /// retries these instead of surfacing them.
  pub fn is_transient(&self) -> bool {
    matches!(
      self,
      DistributionError::ShapeMismatch(_) | DistributionError::InvalidParameter { .. }
    )
  }

  pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
    DistributionError::InvalidParameter {
      name,
      reason: reason.into(),
    }
  }
}
