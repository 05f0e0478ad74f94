//! # Traits
//!
//! $$
//! \mathcal{D}:\ (x,\theta)\mapsto\log p(x\mid\theta)\in\mathbb{R}^{S\times B},\qquad
//! (\theta,N)\mapsto x\sim p(\cdot\mid\theta)
//! $$
//!
use ndarray::ArrayD;
use ndarray::IxDyn;
use rand::RngCore;

use crate::error::Result;
use crate::params::Parameters;

/// The capability every parametric distribution in the catalog implements.
///
/// Values and parameters follow the (sample, batch, event...) axis order.
/// `calculate_log_probability` always returns a (sample, batch) tensor and
/// `get_sample` returns a tensor whose sample axis has `number_samples` rows.
pub trait Distribution: Send + Sync {
  fn name(&self) -> &'static str;

  /// Whether a draw is a deterministic, differentiable function of the
  /// parameters and parameter-free noise.
  fn is_reparameterizable(&self) -> bool;

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters)
    -> Result<ArrayD<f64>>;

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>>;
}

/// Distributions without a normalized density. They encode a sampling
/// mechanism, so their log-probability is a constant placeholder.
///
/// The call shape matches [`Distribution::calculate_log_probability`]; the
/// value and parameters are accepted and ignored.
pub trait ImplicitDistribution {
  fn calculate_log_probability(
    &self,
    _x: &ArrayD<f64>,
    _params: &Parameters,
  ) -> Result<ArrayD<f64>> {
    Ok(ArrayD::zeros(IxDyn(&[1, 1])))
  }
}
