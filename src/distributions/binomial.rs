//! # Binomial
//!
//! $$
//! \log P(X=x)=\log\binom{n}{x}+x\log p+(n-x)\log(1-p)
//! $$
//!
use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::Distribution as _;
use statrs::function::gamma::ln_gamma;

use super::xlogy;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::expand_samples;
use crate::broadcast::sum_data_dimensions;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "Binomial";

/// Binomial counts with `n` trials and success probability `p`.
///
/// Draws are not reparameterizable: no gradient flows through `n` or `p`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Binomial;

impl Distribution for Binomial {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    false
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let n = params.require(NAME, "n")?;
    let p = params.require(NAME, "p")?;
    let [x, n, p] = broadcast_and_squeeze([x, n, p])?;

    let log_probability = Zip::from(&x)
      .and(&n)
      .and(&p)
      .map_collect(|&x, &n, &p| {
        ln_binomial_coefficient(n, x) + xlogy(x, p) + xlogy(n - x, 1.0 - p)
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
    let p = params.require(NAME, "p")?;
    let [n, p] = broadcast_and_squeeze([n, p])?;
    let n = expand_samples(n, number_samples)?;
    let p = expand_samples(p, number_samples)?;
    sample_counts(&n, &p, rng)
  }
}

/// `log C(n, x)` through the gamma function; `-inf` outside `0 <= x <= n`.
pub(crate) fn ln_binomial_coefficient(n: f64, x: f64) -> f64 {
  if x < 0.0 || x > n {
    return f64::NEG_INFINITY;
  }
  ln_gamma(n + 1.0) - ln_gamma(x + 1.0) - ln_gamma(n - x + 1.0)
}

fn trials(n: f64) -> Result<u64> {
  let rounded = n.round();
  if !n.is_finite() || rounded < 0.0 || (n - rounded).abs() > 1e-9 {
    return Err(DistributionError::invalid(
      "n",
      format!("expected a nonnegative integer, got {n}"),
    ));
  }
  Ok(rounded as u64)
}

/// Elementwise binomial draws for already broadcast `n` and `p`.
pub(crate) fn sample_counts(
  n: &ArrayD<f64>,
  p: &ArrayD<f64>,
  rng: &mut dyn RngCore,
) -> Result<ArrayD<f64>> {
  let mut out = ArrayD::zeros(n.raw_dim());
  for ((out, &n), &p) in out.iter_mut().zip(n.iter()).zip(p.iter()) {
    let binomial = rand_distr::Binomial::new(trials(n)?, p)
      .map_err(|err| DistributionError::invalid("p", format!("{p}: {err}")))?;
    *out = binomial.sample(&mut *rng) as f64;
  }
  Ok(out)
}
