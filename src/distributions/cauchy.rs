//! # Cauchy
//!
//! $$
//! \log f(x)\propto-\log\!\left(1+\left(\frac{x-\mu}{\sigma}\right)^2\right)
//! $$
//!
use std::f64::consts::PI;

use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::Uniform;

use super::location_scale;
use super::noise;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::sum_data_dimensions;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "Cauchy";

/// Cauchy distribution with location `mu` and scale `sigma`.
///
/// The log-density drops the `-log(pi * sigma)` normalizer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cauchy;

impl Distribution for Cauchy {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    true
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let mu = params.require(NAME, "mu")?;
    let sigma = params.require(NAME, "sigma")?;
    let [x, mu, sigma] = broadcast_and_squeeze([x, mu, sigma])?;

    let log_probability = Zip::from(&x)
      .and(&mu)
      .and(&sigma)
      .map_collect(|&x, &mu, &sigma| -(1.0 + ((x - mu) / sigma).powi(2)).ln());
    Ok(sum_data_dimensions(log_probability))
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let (mu, sigma) = location_scale(params, NAME, number_samples)?;
    let u = noise(mu.shape(), Uniform::new(0.0, 1.0), rng);
    Ok(
      Zip::from(&mu)
        .and(&sigma)
        .and(&u)
        .map_collect(|&mu, &sigma, &u| mu + sigma * (PI * u).tan()),
    )
  }
}
