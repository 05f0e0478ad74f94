//! # Categorical
//!
//! $$
//! \log P(X=x)=\sum_k x_k\log p_k,\qquad x\in\{0,1\}^K,\ \textstyle\sum_k x_k=1
//! $$
//!
use ndarray::Array2;
use ndarray::ArrayD;
use ndarray::Zip;
use rand::RngCore;
use rand_distr::Distribution as _;
use rand_distr::WeightedIndex;

use super::xlogy;
use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::expand_samples;
use crate::broadcast::lift;
use crate::broadcast::sum_data_dimensions;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "Categorical";

/// One-hot categorical over the trailing category axis of `p`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Categorical;

impl Distribution for Categorical {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    false
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let p = params.require(NAME, "p")?;
    let [x, p] = broadcast_and_squeeze([x, p])?;
    let log_probability = Zip::from(&x).and(&p).map_collect(|&x, &p| xlogy(x, p));
    Ok(sum_data_dimensions(log_probability))
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let p = expand_samples(event_tensor(params.require(NAME, "p")?)?, number_samples)?;
    one_hot_draw(&p, rng)
  }
}

/// Lifts a scalar and requires at least one event axis.
pub(crate) fn event_tensor(p: &ArrayD<f64>) -> Result<ArrayD<f64>> {
  let p = lift(p)?;
  if p.ndim() < 3 {
    return Err(DistributionError::ShapeMismatch(format!(
      "category weights must be (sample, batch, k), got {:?}",
      p.shape()
    )));
  }
  Ok(p)
}

/// Draws one multinomial(1, p) one-hot vector per (sample, batch) cell. The
/// event axes of `p` are flattened into the category axis and the result has
/// the shape of `p`. Weights need not be normalized.
pub(crate) fn one_hot_draw(p: &ArrayD<f64>, rng: &mut dyn RngCore) -> Result<ArrayD<f64>> {
  let shape = p.shape().to_vec();
  let cells = shape[0] * shape[1];
  let categories: usize = shape[2..].iter().product();
  let flat = p
    .to_shape((cells, categories))
    .map_err(|err| DistributionError::ShapeMismatch(err.to_string()))?;

  let mut one_hot = Array2::<f64>::zeros((cells, categories));
  for (row, mut out) in flat.outer_iter().zip(one_hot.outer_iter_mut()) {
    let index = WeightedIndex::new(row.iter())
      .map_err(|err| DistributionError::invalid("p", err.to_string()))?;
    out[index.sample(&mut *rng)] = 1.0;
  }

  one_hot
    .into_shape_with_order(shape)
    .map_err(|err| DistributionError::ShapeMismatch(err.to_string()))
}
