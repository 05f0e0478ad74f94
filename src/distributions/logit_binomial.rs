//! # LogitBinomial
//!
//! $$
//! \log P(X=x)=\log\binom{n}{x}+x\log\sigma(z)+(n-x)\log\sigma(-z)
//! $$
//!
use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;

use super::binomial::ln_binomial_coefficient;
use super::binomial::sample_counts;
use super::sigmoid;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::expand_samples;
use crate::broadcast::sum_data_dimensions;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "LogitBinomial";

/// Binomial counts parameterized by the logit `z` of the success probability,
/// which keeps the log-mass finite when `p` saturates at 0 or 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogitBinomial;

/// `log sigmoid(z)` split on `alpha = relu(-z)` so no exponent is positive.
fn log_sigmoid(z: f64) -> f64 {
  let alpha = (-z).max(0.0);
  -(alpha + ((-alpha).exp() + (-z - alpha).exp()).ln())
}

impl Distribution for LogitBinomial {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    false
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let n = params.require(NAME, "n")?;
    let z = params.require(NAME, "z")?;
    let [x, n, z] = broadcast_and_squeeze([x, n, z])?;

    let log_probability = Zip::from(&x).and(&n).and(&z).map_collect(|&x, &n, &z| {
      // log(1 - sigmoid(z)) == log sigmoid(-z), split on beta = relu(z).
      let success_term = if x == 0.0 { 0.0 } else { x * log_sigmoid(z) };
      let failure_term = if n == x { 0.0 } else { (n - x) * log_sigmoid(-z) };
      ln_binomial_coefficient(n, x) + success_term + failure_term
    });
    Ok(sum_data_dimensions(log_probability))
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let n = params.require(NAME, "n")?;
    let z = params.require(NAME, "z")?;
    let [n, z] = broadcast_and_squeeze([n, z])?;
    let n = expand_samples(n, number_samples)?;
    let p = expand_samples(z.mapv(sigmoid), number_samples)?;
    sample_counts(&n, &p, rng)
  }
}
