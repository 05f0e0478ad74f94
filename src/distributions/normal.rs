//! # Normal
//!
//! $$
//! \log f(x)=-\tfrac12\log(2\pi\sigma^2)-\frac{(x-\mu)^2}{2\sigma^2}
//! $$
//!
use std::f64::consts::PI;

use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::StandardNormal;

use super::location_scale;
use super::noise;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::sum_data_dimensions;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "Normal";

/// Normal distribution parameterized by `mu` and `sigma`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Normal;

impl Distribution for Normal {
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
      .map_collect(|&x, &mu, &sigma| {
        let var = sigma * sigma;
        -0.5 * (2.0 * PI * var).ln() - 0.5 * (x - mu).powi(2) / var
      });
    Ok(sum_data_dimensions(log_probability))
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let (mu, sigma) = location_scale(params, NAME, number_samples)?;
    let z = noise(mu.shape(), StandardNormal, rng);
    Ok(&mu + &(&sigma * &z))
  }
}
