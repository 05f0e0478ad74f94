//! # Softmax Categorical
//!
//! $$
//! \log P(X=k)=z_k-\log\sum_j e^{z_j}
//! $$
//!
use ndarray::Array2;
use ndarray::ArrayD;
use ndarray::ArrayView1;
use ndarray::Axis;
use ndarray::Ix3;
use rand::RngCore;

use super::categorical::event_tensor;
use super::categorical::one_hot_draw;
use super::log_sum_exp;
use crate::broadcast::broadcast_sample_batch;
use crate::broadcast::expand_samples;
use crate::broadcast::lift;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "SoftmaxCategorical";

/// Categorical distribution over unnormalized logits `z`.
///
/// The log-probability is the negative softmax cross-entropy, so the softmax is
/// never materialized. Observed values are either integer labels shaped
/// (sample, batch) / (sample, batch, 1) or one-hot vectors with the event shape
/// of `z`; samples are one-hot.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftmaxCategorical;

/// Flattens (sample, batch, event...) into (sample, batch, k).
fn flatten_events(a: &ArrayD<f64>) -> Result<ndarray::Array3<f64>> {
  let shape = a.shape();
  let k: usize = shape[2..].iter().product();
  a.to_shape((shape[0], shape[1], k))
    .map(|view| view.into_owned())
    .map_err(|err| DistributionError::ShapeMismatch(err.to_string()))
}

fn label_of(row: ArrayView1<f64>, categories: usize) -> Result<usize> {
  if row.len() == categories && categories > 1 {
    return row
      .iter()
      .position(|&v| v == 1.0)
      .ok_or_else(|| DistributionError::invalid("x", "one-hot value without a hot entry"));
  }
  let label = row[0];
  if row.len() != 1 || label.fract() != 0.0 || label < 0.0 || label >= categories as f64 {
    return Err(DistributionError::invalid(
      "x",
      format!("expected a label in 0..{categories}, got {row}"),
    ));
  }
  Ok(label as usize)
}

/// Numerically stable softmax along the trailing axis.
fn softmax(z: &ndarray::Array3<f64>) -> ndarray::Array3<f64> {
  let mut p = z.clone();
  for mut lane in p.lanes_mut(Axis(2)) {
    let norm = log_sum_exp(lane.view());
    lane.mapv_inplace(|v| (v - norm).exp());
  }
  p
}

impl Distribution for SoftmaxCategorical {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    false
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let z = flatten_events(&event_tensor(params.require(NAME, "z")?)?)?;
    let x = lift(x)?;
    let x = if x.ndim() == 2 {
      x.insert_axis(Axis(2))
        .into_dimensionality::<Ix3>()
        .map_err(|err| DistributionError::ShapeMismatch(err.to_string()))?
    } else {
      flatten_events(&x)?
    };

    let categories = z.shape()[2];
    let (samples, batch) =
      broadcast_sample_batch(&[&x.clone().into_dyn(), &z.clone().into_dyn()])?;
    let labels = x
      .broadcast((samples, batch, x.shape()[2]))
      .ok_or_else(|| DistributionError::ShapeMismatch("labels do not broadcast".into()))?;
    let logits = z
      .broadcast((samples, batch, categories))
      .ok_or_else(|| DistributionError::ShapeMismatch("logits do not broadcast".into()))?;

    let mut log_probability = Array2::zeros((samples, batch));
    for ((s, b), out) in log_probability.indexed_iter_mut() {
      let row = logits.slice(ndarray::s![s, b, ..]);
      let label = label_of(labels.slice(ndarray::s![s, b, ..]), categories)?;
      *out = row[label] - log_sum_exp(row);
    }
    Ok(log_probability.into_dyn())
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let z = expand_samples(event_tensor(params.require(NAME, "z")?)?, number_samples)?;
    let p = softmax(&flatten_events(&z)?);
    let one_hot = one_hot_draw(&p.into_dyn(), rng)?;
    one_hot
      .into_shape_with_order(z.shape().to_vec())
      .map_err(|err| DistributionError::ShapeMismatch(err.to_string()))
  }
}
