//! # LogitNormal
//!
//! $$
//! \log f(x)=-\tfrac12\log(2\pi)-\log x-\log(1-x)-\log\sigma-\frac{(\operatorname{logit}x-\mu)^2}{2\sigma^2}
//! $$
//!
use std::f64::consts::PI;

use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::StandardNormal;

use super::location_scale;
use super::noise;
use super::sigmoid;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::sum_data_dimensions;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "LogitNormal";

/// `sigmoid(mu + sigma * Z)` for standard normal `Z`; support (0, 1).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogitNormal;

impl Distribution for LogitNormal {
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
        let log_x = x.ln();
        let log_1mx = (1.0 - x).ln();
        let logit = log_x - log_1mx;
        -0.5 * (2.0 * PI).ln() - log_x - log_1mx - sigma.ln()
          - 0.5 * (logit - mu).powi(2) / (sigma * sigma)
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
    Ok(
      Zip::from(&mu)
        .and(&sigma)
        .and(&z)
        .map_collect(|&mu, &sigma, &z| sigmoid(mu + sigma * z)),
    )
  }
}
