//! # Distributions
//!
//! $$
//! x = g_\theta(\varepsilon),\qquad \varepsilon\sim p_0
//! $$
//!
//! | Module                  | Description                                                    |
//! |-------------------------|----------------------------------------------------------------|
//! | [`normal`]              | Normal, location-scale transform of standard normal noise.     |
//! | [`cauchy`]              | Cauchy, tangent transform of uniform noise.                    |
//! | [`lognormal`]           | Log-normal, exponential of a normal draw.                      |
//! | [`logit_normal`]        | Logit-normal, sigmoid of a normal draw.                        |
//! | [`binomial`]            | Binomial counts, probability parameterized.                    |
//! | [`logit_binomial`]      | Binomial counts, logit parameterized.                          |
//! | [`multivariate_normal`] | Multivariate normal with a Cholesky factor.                    |
//! | [`categorical`]         | One-hot categorical.                                           |
//! | [`softmax_categorical`] | Categorical over softmax logits.                               |
//! | [`concrete`]            | Concrete (Gumbel-softmax) relaxation of the categorical.       |
//! | [`truncated`]           | Rejection-sampled restriction of any base distribution.        |
//! | [`empirical`]           | Minibatch resampling from a dataset, without replacement.      |
//!
use ndarray::ArrayD;
use ndarray::ArrayView1;
use ndarray::IxDyn;
use ndarray_rand::RandomExt;
use rand::RngCore;

use crate::broadcast::broadcast_and_squeeze;
use crate::broadcast::expand_samples;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

pub mod binomial;
pub mod categorical;
pub mod cauchy;
pub mod concrete;
pub mod empirical;
pub mod logit_binomial;
pub mod logit_normal;
pub mod lognormal;
pub mod multivariate_normal;
pub mod normal;
pub mod softmax_categorical;
pub mod truncated;

pub use binomial::Binomial;
pub use categorical::Categorical;
pub use cauchy::Cauchy;
pub use concrete::Concrete;
pub use empirical::draw_indices;
pub use empirical::Dataset;
pub use empirical::Empirical;
pub use empirical::EmpiricalSample;
pub use empirical::Indices;
pub use empirical::RandomIndices;
pub use logit_binomial::LogitBinomial;
pub use logit_normal::LogitNormal;
pub use lognormal::LogNormal;
pub use multivariate_normal::CholeskyMultivariateNormal;
pub use normal::Normal;
pub use softmax_categorical::SoftmaxCategorical;
pub use truncated::Truncated;

/// The parametric catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistributionKind {
  Normal,
  Cauchy,
  LogNormal,
  LogitNormal,
  Binomial,
  LogitBinomial,
  CholeskyMultivariateNormal,
  Categorical,
  SoftmaxCategorical,
  Concrete,
}

impl DistributionKind {
  pub const ALL: [DistributionKind; 10] = [
    DistributionKind::Normal,
    DistributionKind::Cauchy,
    DistributionKind::LogNormal,
    DistributionKind::LogitNormal,
    DistributionKind::Binomial,
    DistributionKind::LogitBinomial,
    DistributionKind::CholeskyMultivariateNormal,
    DistributionKind::Categorical,
    DistributionKind::SoftmaxCategorical,
    DistributionKind::Concrete,
  ];

  pub fn is_reparameterizable(&self) -> bool {
    !matches!(
      self,
      DistributionKind::Binomial
        | DistributionKind::LogitBinomial
        | DistributionKind::Categorical
        | DistributionKind::SoftmaxCategorical
    )
  }

  pub fn parameter_names(&self) -> &'static [&'static str] {
    match self {
      DistributionKind::Normal
      | DistributionKind::Cauchy
      | DistributionKind::LogNormal
      | DistributionKind::LogitNormal => &["mu", "sigma"],
      DistributionKind::Binomial => &["n", "p"],
      DistributionKind::LogitBinomial => &["n", "z"],
      DistributionKind::CholeskyMultivariateNormal => &["mu", "chol_cov"],
      DistributionKind::Categorical => &["p"],
      DistributionKind::SoftmaxCategorical => &["z"],
      DistributionKind::Concrete => &["p", "tau"],
    }
  }

  pub fn build(&self) -> Box<dyn Distribution> {
    match self {
      DistributionKind::Normal => Box::new(Normal),
      DistributionKind::Cauchy => Box::new(Cauchy),
      DistributionKind::LogNormal => Box::new(LogNormal),
      DistributionKind::LogitNormal => Box::new(LogitNormal),
      DistributionKind::Binomial => Box::new(Binomial),
      DistributionKind::LogitBinomial => Box::new(LogitBinomial),
      DistributionKind::CholeskyMultivariateNormal => Box::new(CholeskyMultivariateNormal),
      DistributionKind::Categorical => Box::new(Categorical),
      DistributionKind::SoftmaxCategorical => Box::new(SoftmaxCategorical),
      DistributionKind::Concrete => Box::new(Concrete),
    }
  }
}

/// Draws a tensor of i.i.d. noise.
pub(crate) fn noise<D>(shape: &[usize], distribution: D, rng: &mut dyn RngCore) -> ArrayD<f64>
where
  D: rand_distr::Distribution<f64>,
{
  ArrayD::random_using(IxDyn(shape), distribution, rng)
}

/// Broadcasts `mu`/`sigma` against each other and lifts a shared sample axis
/// to `number_samples` replicates.
pub(crate) fn location_scale(
  params: &Parameters,
  distribution: &'static str,
  number_samples: usize,
) -> Result<(ArrayD<f64>, ArrayD<f64>)> {
  let mu = params.require(distribution, "mu")?;
  let sigma = params.require(distribution, "sigma")?;
  let [mu, sigma] = broadcast_and_squeeze([mu, sigma])?;
  Ok((
    expand_samples(mu, number_samples)?,
    expand_samples(sigma, number_samples)?,
  ))
}

pub(crate) fn sigmoid(v: f64) -> f64 {
  if v >= 0.0 {
    1.0 / (1.0 + (-v).exp())
  } else {
    let e = v.exp();
    e / (1.0 + e)
  }
}

/// `x * ln(y)`, zero whenever `x` is zero.
pub(crate) fn xlogy(x: f64, y: f64) -> f64 {
  if x == 0.0 {
    0.0
  } else {
    x * y.ln()
  }
}

pub(crate) fn log_sum_exp(row: ArrayView1<f64>) -> f64 {
  let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  if !max.is_finite() {
    return max;
  }
  max + row.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}
