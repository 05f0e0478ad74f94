//! # Concrete
//!
//! $$
//! \log f(x)=\log\Gamma(K)+(K-1)\log\tau+\sum_k\left[\log p_k-(\tau+1)\log x_k\right]-K\log\sum_k p_k x_k^{-\tau}
//! $$
//!
//! Continuous relaxation of the categorical on the probability simplex; the
//! sample is `softmax((log p + G) / tau)` with standard Gumbel noise `G`.
//!
use ndarray::ArrayD;
use ndarray::ArrayView1;
use ndarray::Axis;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::Gumbel;
use statrs::function::gamma::ln_gamma;

use super::categorical::event_tensor;
use super::log_sum_exp;
use super::noise;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::expand_samples;
use crate::broadcast::sum_data_dimensions;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "Concrete";

/// Concrete (Gumbel-softmax) distribution with class weights `p` over the
/// trailing axis and temperature `tau`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Concrete;

/// `p` and `tau` broadcast to (sample, batch, k) with at least two categories.
fn weights_and_temperature(params: &Parameters) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
  let p = event_tensor(params.require(NAME, "p")?)?;
  if p.ndim() != 3 || p.shape()[2] < 2 {
    return Err(DistributionError::ShapeMismatch(format!(
      "`p` must be (sample, batch, k) with k >= 2, got {:?}",
      p.shape()
    )));
  }
  let [p, tau] = broadcast_and_squeeze([&p, params.require(NAME, "tau")?])?;
  Ok((p, tau))
}

fn lane_log_density(x: ArrayView1<f64>, p: ArrayView1<f64>, tau: f64) -> f64 {
  let k = x.len() as f64;
  let mut body = 0.0;
  let mut normalization = 0.0;
  for (&x, &p) in x.iter().zip(p.iter()) {
    body += p.ln() - (tau + 1.0) * x.ln();
    normalization += p * x.powf(-tau);
  }
  ln_gamma(k) + (k - 1.0) * tau.ln() + body - k * normalization.ln()
}

impl Distribution for Concrete {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    true
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let (p, tau) = weights_and_temperature(params)?;
    let [x, p, tau] = broadcast_and_squeeze([x, &p, &tau])?;
    if x.ndim() != 3 {
      return Err(DistributionError::ShapeMismatch(format!(
        "Concrete values must be (sample, batch, k), got {:?}",
        x.shape()
      )));
    }

    let log_probability = Zip::from(x.lanes(Axis(2)))
      .and(p.lanes(Axis(2)))
      .and(tau.lanes(Axis(2)))
      .map_collect(|x, p, tau| lane_log_density(x, p, tau[0]));
    Ok(sum_data_dimensions(log_probability))
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let (p, tau) = weights_and_temperature(params)?;
    let p = expand_samples(p, number_samples)?;
    let tau = expand_samples(tau, number_samples)?;
    let gumbel = Gumbel::new(0.0, 1.0)
      .map_err(|err| DistributionError::invalid("tau", err.to_string()))?;
    let g = noise(p.shape(), gumbel, rng);

    let mut sample = Zip::from(&p)
      .and(&g)
      .and(&tau)
      .map_collect(|&p, &g, &tau| (p.ln() + g) / tau);
    for mut lane in sample.lanes_mut(Axis(2)) {
      let norm = log_sum_exp(lane.view());
      lane.mapv_inplace(|v| (v - norm).exp());
    }
    Ok(sample)
  }
}
