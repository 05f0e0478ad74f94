//! # Cholesky Multivariate Normal
//!
//! $$
//! \log f(x)=-\tfrac d2\log(2\pi)-\sum_i\log|L_{ii}|-\tfrac12\left\|L^{-1}(x-\mu)\right\|^2,\qquad \Sigma=LL^\top
//! $$
//!
use std::f64::consts::PI;

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::s;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayD;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Ix3;
use ndarray::Ix4;
use rand::RngCore;
use rand_distr::StandardNormal;

use super::noise;
use crate::broadcast::broadcast_sample_batch;
use crate::broadcast::get_diagonal;
use crate::broadcast::lift;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

const NAME: &str = "CholeskyMultivariateNormal";

/// Multivariate normal parameterized by its mean `mu` (sample, batch, d) and a
/// lower-triangular Cholesky factor `chol_cov` (sample, batch, d, d).
#[derive(Clone, Copy, Debug, Default)]
pub struct CholeskyMultivariateNormal;

fn as_vectors(name: &'static str, a: &ArrayD<f64>) -> Result<Array3<f64>> {
  lift(a)?.into_dimensionality::<Ix3>().map_err(|_| {
    DistributionError::ShapeMismatch(format!(
      "`{name}` must be (sample, batch, d), got {:?}",
      a.shape()
    ))
  })
}

fn as_factors(a: &ArrayD<f64>) -> Result<ndarray::Array4<f64>> {
  lift(a)?.into_dimensionality::<Ix4>().map_err(|_| {
    DistributionError::ShapeMismatch(format!(
      "`chol_cov` must be (sample, batch, d, d), got {:?}",
      a.shape()
    ))
  })
}

fn to_matrix(l: ArrayView2<f64>) -> DMatrix<f64> {
  DMatrix::from_fn(l.nrows(), l.ncols(), |i, j| l[[i, j]])
}

fn to_vector(v: ArrayView1<f64>) -> DVector<f64> {
  DVector::from_iterator(v.len(), v.iter().copied())
}

impl Distribution for CholeskyMultivariateNormal {
  fn name(&self) -> &'static str {
    NAME
  }

  fn is_reparameterizable(&self) -> bool {
    true
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    let chol_cov = params.require(NAME, "chol_cov")?;
    let x = as_vectors("x", x)?;
    let mu = as_vectors("mu", params.require(NAME, "mu")?)?;
    let l = as_factors(chol_cov)?;
    let d = l.shape()[3];
    if l.shape()[2] != d || x.shape()[2] != d || mu.shape()[2] != d {
      return Err(DistributionError::ShapeMismatch(format!(
        "dimension mismatch: x {:?}, mu {:?}, chol_cov {:?}",
        x.shape(),
        mu.shape(),
        l.shape()
      )));
    }

    let log_det = get_diagonal(&l.clone().into_dyn())?
      .mapv(|v| v.abs().ln())
      .sum_axis(ndarray::Axis(2));
    let (samples, batch) =
      broadcast_sample_batch(&[&x.clone().into_dyn(), &mu.clone().into_dyn(), &log_det])?;
    let broadcast_err =
      || DistributionError::ShapeMismatch(format!("cannot broadcast to ({samples}, {batch}, {d})"));
    let x = x.broadcast((samples, batch, d)).ok_or_else(broadcast_err)?;
    let mu = mu.broadcast((samples, batch, d)).ok_or_else(broadcast_err)?;
    let l = l.broadcast((samples, batch, d, d)).ok_or_else(broadcast_err)?;
    let log_det = log_det
      .broadcast(ndarray::IxDyn(&[samples, batch]))
      .ok_or_else(broadcast_err)?;

    let normalizer = -0.5 * d as f64 * (2.0 * PI).ln();
    let mut log_probability = Array2::zeros((samples, batch));
    for ((i, j), out) in log_probability.indexed_iter_mut() {
      let diff = to_vector(x.slice(s![i, j, ..])) - to_vector(mu.slice(s![i, j, ..]));
      let whitened = to_matrix(l.slice(s![i, j, .., ..]))
        .solve_lower_triangular(&diff)
        .ok_or_else(|| DistributionError::invalid("chol_cov", "singular Cholesky factor"))?;
      *out = normalizer - log_det[[i, j]] - 0.5 * whitened.norm_squared();
    }
    Ok(log_probability.into_dyn())
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    let mu = as_vectors("mu", params.require(NAME, "mu")?)?;
    let l = as_factors(params.require(NAME, "chol_cov")?)?;
    let d = mu.shape()[2];
    if l.shape()[2] != d || l.shape()[3] != d {
      return Err(DistributionError::ShapeMismatch(format!(
        "mu {:?} does not match chol_cov {:?}",
        mu.shape(),
        l.shape()
      )));
    }

    let (samples, batch) =
      broadcast_sample_batch(&[&mu.clone().into_dyn(), &l.clone().into_dyn()])?;
    if samples != 1 && samples != number_samples {
      return Err(DistributionError::ShapeMismatch(format!(
        "parameters carry {samples} sample replicates but {number_samples} were requested"
      )));
    }
    let samples = number_samples;
    let broadcast_err =
      || DistributionError::ShapeMismatch(format!("cannot broadcast to ({samples}, {batch}, {d})"));
    let mu = mu.broadcast((samples, batch, d)).ok_or_else(broadcast_err)?;
    let l = l.broadcast((samples, batch, d, d)).ok_or_else(broadcast_err)?;

    let z = noise(&[samples, batch, d], StandardNormal, rng);
    let mut sample = Array3::zeros((samples, batch, d));
    for i in 0..samples {
      for j in 0..batch {
        let shifted = to_vector(mu.slice(s![i, j, ..]))
          + to_matrix(l.slice(s![i, j, .., ..])) * to_vector(z.slice(s![i, j, ..]));
        for (out, v) in sample.slice_mut(s![i, j, ..]).iter_mut().zip(shifted.iter()) {
          *out = *v;
        }
      }
    }
    Ok(sample.into_dyn())
  }
}
