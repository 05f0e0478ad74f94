//! # Parameters
//!
//! $$
//! \theta=\{\,\text{name}\mapsto T_{\text{name}}\in\mathbb{R}^{S\times B\times E}\,\}
//! $$
//!
use std::collections::BTreeMap;

use ndarray::arr0;
use ndarray::ArrayD;
use ndarray::Axis;

use crate::error::DistributionError;
use crate::error::Result;

/// Named parameter tensors handed to a distribution for one call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parameters {
  values: BTreeMap<String, ArrayD<f64>>,
}

impl Parameters {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, value: ArrayD<f64>) -> Self {
    self.insert(name, value);
    self
  }

  /// Adds a scalar parameter, shared by every sample and batch element.
  pub fn with_scalar(self, name: impl Into<String>, value: f64) -> Self {
    self.with(name, arr0(value).into_dyn())
  }

  pub fn insert(&mut self, name: impl Into<String>, value: ArrayD<f64>) -> Option<ArrayD<f64>> {
    self.values.insert(name.into(), value)
  }

  pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
    self.values.get(name)
  }

  pub fn require(&self, distribution: &'static str, name: &'static str) -> Result<&ArrayD<f64>> {
    self
      .values
      .get(name)
      .ok_or(DistributionError::MissingParameter { distribution, name })
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f64>)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Restricts every parameter that carries one row per requested sample
  /// (axis-0 length `number_samples`) to `rows`. Parameters shared across
  /// samples are left untouched.
  pub fn select_rows(&self, rows: &[usize], number_samples: usize) -> Parameters {
    let values = self
      .values
      .iter()
      .map(|(name, value)| {
        let per_sample = value.ndim() > 0 && value.len_of(Axis(0)) == number_samples;
        let value = if per_sample {
          value.select(Axis(0), rows)
        } else {
          value.clone()
        };
        (name.clone(), value)
      })
      .collect();
    Parameters { values }
  }
}

#[cfg(test)]
mod tests {
  use ndarray::Array;

  use super::*;

  #[test]
  fn missing_parameter_names_the_distribution() {
    let params = Parameters::new().with_scalar("mu", 0.0);
    let err = params.require("Normal", "sigma").unwrap_err();
    assert_eq!(
      err,
      DistributionError::MissingParameter {
        distribution: "Normal",
        name: "sigma"
      }
    );
    assert_eq!(err.to_string(), "Normal requires parameter `sigma`");
  }

  #[test]
  fn select_rows_only_touches_per_sample_parameters() {
    let mu = Array::from_shape_fn((4, 1), |(s, _)| s as f64).into_dyn();
    let params = Parameters::new()
      .with("mu", mu)
      .with_scalar("sigma", 2.0)
      .with("shared", ArrayD::zeros(ndarray::IxDyn(&[1, 1])));

    let reduced = params.select_rows(&[3, 1], 4);
    let mu = reduced.get("mu").unwrap();
    assert_eq!(mu.shape(), &[2, 1]);
    assert_eq!(mu[[0, 0]], 3.0);
    assert_eq!(mu[[1, 0]], 1.0);
    assert_eq!(reduced.get("sigma").unwrap().ndim(), 0);
    assert_eq!(reduced.get("shared").unwrap().shape(), &[1, 1]);
  }
}
