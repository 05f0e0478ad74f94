//! # Truncated
//!
//! $$
//! \tilde p(x\mid\theta)\propto p(x\mid\theta)\,\mathbf 1\{R(x)\}
//! $$
//!
//! Rejection sampling of an arbitrary base distribution. The log-probability
//! is the base one, not renormalized over the accepted region.
//!
use ndarray::ArrayD;
use ndarray::ArrayViewD;
use ndarray::Axis;
use rand::RngCore;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::TruncationConfig;
use crate::error::DistributionError;
use crate::error::Result;
use crate::params::Parameters;
use crate::traits::Distribution;

type Rule = Box<dyn Fn(ArrayViewD<f64>) -> bool + Send + Sync>;

/// A base distribution restricted to the values its rule accepts.
///
/// Every draw is tried for at most `max_depth` inner iterations; the whole
/// batch is then redrawn from scratch up to `max_restarts` times before
/// [`DistributionError::TruncationExhausted`] is returned.
pub struct Truncated {
  base: Box<dyn Distribution>,
  rule: Rule,
  config: TruncationConfig,
}

impl Truncated {
  pub fn new<R>(base: Box<dyn Distribution>, rule: R, config: TruncationConfig) -> Self
  where
    R: Fn(ArrayViewD<f64>) -> bool + Send + Sync + 'static,
  {
    Self {
      base,
      rule: Box::new(rule),
      config,
    }
  }

  pub fn base(&self) -> &dyn Distribution {
    self.base.as_ref()
  }

  pub fn config(&self) -> &TruncationConfig {
    &self.config
  }

  /// One from-scratch attempt. Slot `i` of the result holds the accepted draw
  /// for sample `i`, or `None` if the inner budget ran out first.
  fn attempt(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<Vec<Option<ArrayD<f64>>>> {
    let mut slots: Vec<Option<ArrayD<f64>>> = vec![None; number_samples];
    let mut remaining: Vec<usize> = (0..number_samples).collect();

    for depth in 0..self.config.max_depth() {
      if remaining.is_empty() {
        break;
      }

      let reduced = params.select_rows(&remaining, number_samples);
      let draw = match self.base.get_sample(&reduced, remaining.len(), &mut *rng) {
        Ok(draw) if draw.ndim() > 0 && draw.len_of(Axis(0)) == remaining.len() => draw,
        Ok(draw) => {
          trace!(depth, shape = ?draw.shape(), "base returned a short batch");
          continue;
        }
        Err(err) if err.is_transient() => {
          trace!(depth, error = %err, "transient base failure");
          continue;
        }
        Err(err) => return Err(err),
      };

      let mut rejected = Vec::with_capacity(remaining.len());
      for (row, &slot) in draw.outer_iter().zip(&remaining) {
        if (self.rule)(row.view()) {
          slots[slot] = Some(row.to_owned());
        } else {
          rejected.push(slot);
        }
      }
      trace!(
        depth,
        accepted = remaining.len() - rejected.len(),
        remaining = rejected.len(),
        "rejection iteration"
      );
      remaining = rejected;
    }

    Ok(slots)
  }
}

impl Distribution for Truncated {
  fn name(&self) -> &'static str {
    self.base.name()
  }

  fn is_reparameterizable(&self) -> bool {
    false
  }

  fn calculate_log_probability(&self, x: &ArrayD<f64>, params: &Parameters) -> Result<ArrayD<f64>> {
    self.base.calculate_log_probability(x, params)
  }

  fn get_sample(
    &self,
    params: &Parameters,
    number_samples: usize,
    rng: &mut dyn RngCore,
  ) -> Result<ArrayD<f64>> {
    if number_samples == 0 {
      return Err(DistributionError::Configuration(
        "a truncated draw needs at least one sample".into(),
      ));
    }

    let max_restarts = self.config.max_restarts();
    let mut filled = 0;
    for restart in 0..=max_restarts {
      if restart > 0 {
        debug!(
          distribution = self.name(),
          restart,
          filled,
          requested = number_samples,
          "restarting truncated draw"
        );
      }

      let slots = self.attempt(params, number_samples, &mut *rng)?;
      filled = slots.iter().filter(|slot| slot.is_some()).count();
      if filled == number_samples {
        let rows: Vec<ArrayD<f64>> = slots.into_iter().flatten().collect();
        let views: Vec<ArrayViewD<f64>> = rows.iter().map(|row| row.view()).collect();
        return ndarray::stack(Axis(0), &views)
          .map_err(|err| DistributionError::ShapeMismatch(err.to_string()));
      }
    }

    warn!(
      distribution = self.name(),
      restarts = max_restarts,
      filled,
      requested = number_samples,
      "truncation exhausted"
    );
    Err(DistributionError::TruncationExhausted {
      restarts: max_restarts,
      filled,
      requested: number_samples,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::Array;
  use ndarray::IxDyn;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use tracing_test::traced_test;

  use super::*;
  use crate::distributions::Normal;

  fn positive_normal(config: TruncationConfig) -> Truncated {
    Truncated::new(
      Box::new(Normal),
      |x: ArrayViewD<f64>| x.iter().all(|&v| v > 0.0),
      config,
    )
  }

  #[test]
  fn positive_normal_only_returns_positive_values() {
    let truncated = positive_normal(TruncationConfig::default());
    let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 1.0);
    let mut rng = StdRng::seed_from_u64(51);
    let samples = truncated.get_sample(&params, 10_000, &mut rng).unwrap();

    assert_eq!(samples.shape(), &[10_000, 1]);
    assert!(samples.iter().all(|&v| v > 0.0));
    // half-normal mean sqrt(2 / pi)
    let mean = samples.mean().unwrap();
    println!("[Truncated] mean: {mean:.4}");
    assert_abs_diff_eq!(mean, (2.0 / std::f64::consts::PI).sqrt(), epsilon = 0.03);
  }

  #[test]
  fn per_sample_parameters_follow_their_slot() {
    let truncated = positive_normal(TruncationConfig::default());
    let n = 2_000;
    let mu = Array::from_shape_fn((n, 1), |(s, _)| if s % 2 == 0 { 5.0 } else { 0.0 }).into_dyn();
    let params = Parameters::new().with("mu", mu).with_scalar("sigma", 1.0);
    let mut rng = StdRng::seed_from_u64(52);
    let samples = truncated.get_sample(&params, n, &mut rng).unwrap();

    let even: f64 = (0..n).step_by(2).map(|s| samples[[s, 0]]).sum::<f64>() / (n / 2) as f64;
    let odd: f64 = (1..n).step_by(2).map(|s| samples[[s, 0]]).sum::<f64>() / (n / 2) as f64;
    assert!((even - 5.0).abs() < 0.1);
    assert!((odd - 0.798).abs() < 0.06);
  }

  #[test]
  fn log_probability_is_the_base_one() {
    let truncated = positive_normal(TruncationConfig::default());
    let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 2.0);
    let x = ArrayD::from_elem(IxDyn(&[1, 3]), 0.5);
    assert_eq!(
      truncated.calculate_log_probability(&x, &params).unwrap(),
      Normal.calculate_log_probability(&x, &params).unwrap()
    );
    assert_eq!(truncated.name(), "Normal");
    assert!(!truncated.is_reparameterizable());
  }

  #[test]
  #[traced_test]
  fn impossible_rule_exhausts_the_budget() {
    let truncated = Truncated::new(
      Box::new(Normal),
      |_: ArrayViewD<f64>| false,
      TruncationConfig::new(Some(2), Some(3)),
    );
    let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 1.0);
    let mut rng = StdRng::seed_from_u64(53);
    let err = truncated.get_sample(&params, 5, &mut rng).unwrap_err();

    assert_eq!(
      err,
      DistributionError::TruncationExhausted {
        restarts: 3,
        filled: 0,
        requested: 5
      }
    );
    assert!(logs_contain("restarting truncated draw"));
    assert!(logs_contain("truncation exhausted"));
  }

  #[test]
  fn missing_parameters_are_not_retried() {
    let truncated = positive_normal(TruncationConfig::default());
    let params = Parameters::new().with_scalar("mu", 0.0);
    let mut rng = StdRng::seed_from_u64(54);
    assert!(matches!(
      truncated.get_sample(&params, 4, &mut rng),
      Err(DistributionError::MissingParameter { name: "sigma", .. })
    ));
  }

  #[test]
  fn transient_failures_end_in_exhaustion() {
    let truncated = positive_normal(TruncationConfig::new(Some(3), Some(1)));
    // one row per sample but the wrong count
    let params = Parameters::new()
      .with("mu", ArrayD::zeros(IxDyn(&[3, 1])))
      .with_scalar("sigma", 1.0);
    let mut rng = StdRng::seed_from_u64(55);
    assert!(matches!(
      truncated.get_sample(&params, 4, &mut rng),
      Err(DistributionError::TruncationExhausted { .. })
    ));
  }
}
