//! # Config
//!
//! $$
//! \text{batch}\le|\mathcal{D}|,\qquad \sum_i w_i>0,\ w_i\ge 0
//! $$
//!
use impl_new_derive::ImplNew;

use crate::error::DistributionError;
use crate::error::Result;

/// Default number of inner rejection iterations per truncated draw.
pub const MAX_DEPTH: usize = 20;
/// Default number of from-scratch restarts before a truncated draw fails.
pub const MAX_RESTARTS: usize = 100;

/// Minibatch configuration of an empirical distribution. Fixed once the
/// distribution is built.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct EmpiricalConfig {
  pub batch_size: usize,
  pub is_observed: bool,
  pub weights: Option<Vec<f64>>,
}

impl EmpiricalConfig {
  pub fn validate(&self) -> Result<()> {
    if self.batch_size == 0 {
      return Err(DistributionError::Configuration(
        "batch_size must be > 0".into(),
      ));
    }
    if let Some(weights) = &self.weights {
      normalize_weights(weights)?;
    }
    Ok(())
  }
}

/// Retry budget of a truncated distribution.
#[derive(ImplNew, Clone, Debug, Default, PartialEq)]
pub struct TruncationConfig {
  pub max_depth: Option<usize>,
  pub max_restarts: Option<usize>,
}

impl TruncationConfig {
  pub fn max_depth(&self) -> usize {
    self.max_depth.unwrap_or(MAX_DEPTH)
  }

  pub fn max_restarts(&self) -> usize {
    self.max_restarts.unwrap_or(MAX_RESTARTS)
  }
}

/// Normalizes resampling weights into a probability vector.
pub fn normalize_weights(weights: &[f64]) -> Result<Vec<f64>> {
  if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
    return Err(DistributionError::Configuration(
      "weights must be finite and nonnegative".into(),
    ));
  }
  let total: f64 = weights.iter().sum();
  if total <= 0.0 {
    return Err(DistributionError::Configuration(
      "weights must not all be zero".into(),
    ));
  }
  Ok(weights.iter().map(|w| w / total).collect())
}
