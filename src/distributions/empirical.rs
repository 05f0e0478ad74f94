//! # Empirical
//!
//! $$
//! I\subset\{0,\dots,D-1\},\ |I|=B,\qquad P(i\in I)\ \text{driven by}\ w_i\Big/\sum_j w_j
//! $$
//!
//! Minibatch resampling of a caller-owned dataset without replacement. The
//! dataset is borrowed for the call and never copied wholesale.
//!
use impl_new_derive::ImplNew;
use ndarray::ArrayD;
use ndarray::ArrayViewD;
use ndarray::Axis;
use rand::seq::index;
use rand::RngCore;
use tracing::debug;

use crate::config::normalize_weights;
use crate::config::EmpiricalConfig;
use crate::error::DistributionError;
use crate::error::Result;
use crate::traits::ImplicitDistribution;

/// The data an empirical distribution resamples.
#[derive(Clone, Copy, Debug)]
pub enum Dataset<'a, T = f64> {
  /// Records along axis 1 when observed, axis 2 when latent.
  Tensor(&'a ArrayD<f64>),
  /// Ordered object records.
  Records(&'a [T]),
}

/// Record indices selecting a minibatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Indices {
  /// One index set used by every sample replicate.
  Shared(Vec<usize>),
  /// One index set per sample replicate.
  PerReplicate(Vec<Vec<usize>>),
}

impl Indices {
  /// 1-d arrays give a shared set, 2-d arrays one set per row.
  pub fn from_array(a: &ArrayD<f64>) -> Result<Self> {
    let to_index = |v: f64| {
      if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Ok(v as usize)
      } else {
        Err(DistributionError::Indexing(format!(
          "index {v} is not a nonnegative integer"
        )))
      }
    };
    let row = |r: ArrayViewD<f64>| r.iter().map(|&v| to_index(v)).collect::<Result<Vec<_>>>();

    match a.ndim() {
      1 => Ok(Indices::Shared(row(a.view())?)),
      2 => Ok(Indices::PerReplicate(
        a.outer_iter().map(row).collect::<Result<Vec<_>>>()?,
      )),
      _ => Err(DistributionError::Indexing(format!(
        "indices must be a flat list or one list per replicate, got shape {:?}",
        a.shape()
      ))),
    }
  }

  /// No index sets at all; such indices count as unset.
  pub fn is_empty(&self) -> bool {
    match self {
      Indices::Shared(set) => set.is_empty(),
      Indices::PerReplicate(sets) => sets.is_empty(),
    }
  }

  fn sets(&self) -> Vec<&[usize]> {
    match self {
      Indices::Shared(set) => vec![set.as_slice()],
      Indices::PerReplicate(sets) => sets.iter().map(Vec::as_slice).collect(),
    }
  }

  fn check(&self, dataset_size: usize) -> Result<()> {
    let sets = self.sets();
    if sets.is_empty() || sets.iter().any(|set| set.is_empty()) {
      return Err(DistributionError::Indexing("empty index set".into()));
    }
    if let Some(&bad) = sets.iter().flat_map(|set| set.iter()).find(|&&i| i >= dataset_size) {
      return Err(DistributionError::Indexing(format!(
        "index {bad} is out of range for a dataset of {dataset_size} records"
      )));
    }
    Ok(())
  }
}

/// A resampled minibatch.
#[derive(Clone, Debug, PartialEq)]
pub enum EmpiricalSample<T = f64> {
  Tensor(ArrayD<f64>),
  /// One minibatch per index set.
  Records(Vec<Vec<T>>),
}

impl<T> EmpiricalSample<T> {
  pub fn into_tensor(self) -> Option<ArrayD<f64>> {
    match self {
      EmpiricalSample::Tensor(tensor) => Some(tensor),
      EmpiricalSample::Records(_) => None,
    }
  }

  pub fn into_records(self) -> Option<Vec<Vec<T>>> {
    match self {
      EmpiricalSample::Records(records) => Some(records),
      EmpiricalSample::Tensor(_) => None,
    }
  }
}

/// Draws `batch_size` distinct indices out of `dataset_size`, uniformly or in
/// proportion to `weights`.
pub fn draw_indices(
  dataset_size: usize,
  batch_size: usize,
  weights: Option<&[f64]>,
  rng: &mut dyn RngCore,
) -> Result<Vec<usize>> {
  if batch_size > dataset_size {
    return Err(DistributionError::Configuration(format!(
      "cannot draw {batch_size} records without replacement from a dataset of {dataset_size}"
    )));
  }

  let Some(weights) = weights else {
    return Ok(index::sample(rng, dataset_size, batch_size).into_vec());
  };
  if weights.len() != dataset_size {
    return Err(DistributionError::Configuration(format!(
      "{} weights given for a dataset of {dataset_size} records",
      weights.len()
    )));
  }
  let p = normalize_weights(weights)?;
  let support = p.iter().filter(|&&w| w > 0.0).count();
  if support < batch_size {
    return Err(DistributionError::Configuration(format!(
      "only {support} records have positive weight, {batch_size} requested"
    )));
  }
  index::sample_weighted(rng, dataset_size, |i| p[i], batch_size)
    .map(|indices| indices.into_vec())
    .map_err(|err| DistributionError::Configuration(err.to_string()))
}

/// Dataset-backed minibatch distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Empirical {
  config: EmpiricalConfig,
}

impl Empirical {
  pub fn new(config: EmpiricalConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &EmpiricalConfig {
    &self.config
  }

  /// Axis of a tensor dataset holding the records.
  fn record_axis(&self) -> usize {
    if self.config.is_observed {
      1
    } else {
      2
    }
  }

  fn dataset_size<T>(&self, dataset: &Dataset<'_, T>) -> Result<usize> {
    match dataset {
      Dataset::Tensor(tensor) => {
        let axis = self.record_axis();
        tensor.shape().get(axis).copied().ok_or_else(|| {
          DistributionError::ShapeMismatch(format!(
            "dataset of shape {:?} has no record axis {axis}",
            tensor.shape()
          ))
        })
      }
      Dataset::Records(records) => Ok(records.len()),
    }
  }

  /// Resamples a minibatch.
  ///
  /// Without `indices` (or with empty ones), a tensor dataset gets one shared
  /// index set and a record dataset gets `number_samples` independent sets.
  /// Non-empty `weights` override the configured weights for this call; empty
  /// ones fall back to the configuration, then to uniform draws.
  pub fn get_sample<T: Clone>(
    &self,
    dataset: Dataset<'_, T>,
    indices: Option<&Indices>,
    number_samples: usize,
    weights: Option<&[f64]>,
    rng: &mut dyn RngCore,
  ) -> Result<EmpiricalSample<T>> {
    let dataset_size = self.dataset_size(&dataset)?;
    let generated;
    let indices = match indices.filter(|indices| !indices.is_empty()) {
      Some(indices) => indices,
      None => {
        let weights = weights
          .filter(|weights| !weights.is_empty())
          .or(self.config.weights.as_deref());
        let batch_size = self.config.batch_size;
        generated = match dataset {
          Dataset::Tensor(_) => Indices::Shared(draw_indices(
            dataset_size,
            batch_size,
            weights,
            &mut *rng,
          )?),
          Dataset::Records(_) => Indices::PerReplicate(
            (0..number_samples)
              .map(|_| draw_indices(dataset_size, batch_size, weights, &mut *rng))
              .collect::<Result<Vec<_>>>()?,
          ),
        };
        debug!(
          dataset_size,
          batch_size,
          weighted = weights.is_some(),
          sets = generated.sets().len(),
          "drew minibatch indices"
        );
        &generated
      }
    };
    indices.check(dataset_size)?;

    match dataset {
      Dataset::Tensor(tensor) => self.select_tensor(tensor, indices).map(EmpiricalSample::Tensor),
      Dataset::Records(records) => Ok(EmpiricalSample::Records(
        indices
          .sets()
          .into_iter()
          .map(|set| set.iter().map(|&i| records[i].clone()).collect())
          .collect(),
      )),
    }
  }

  fn select_tensor(&self, tensor: &ArrayD<f64>, indices: &Indices) -> Result<ArrayD<f64>> {
    let axis = self.record_axis();
    match indices {
      Indices::Shared(set) => Ok(tensor.select(Axis(axis), set)),
      Indices::PerReplicate(sets) => {
        let replicates = tensor.len_of(Axis(0));
        if sets.len() > replicates {
          return Err(DistributionError::Indexing(format!(
            "{} index sets for a dataset with {replicates} sample rows",
            sets.len()
          )));
        }
        // replicate n takes its records from row n of the sample axis
        let rows: Vec<ArrayD<f64>> = sets
          .iter()
          .enumerate()
          .map(|(n, set)| tensor.index_axis(Axis(0), n).select(Axis(axis - 1), set))
          .collect();
        let views: Vec<ArrayViewD<f64>> = rows.iter().map(|row| row.view()).collect();
        ndarray::stack(Axis(0), &views)
          .map_err(|err| DistributionError::Indexing(format!("ragged index sets: {err}")))
      }
    }
  }
}

impl ImplicitDistribution for Empirical {}

/// Implicit distribution over minibatch index sets, for sharing one minibatch
/// between several empirical variables (inputs and their labels).
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct RandomIndices {
  pub dataset_size: usize,
  pub batch_size: usize,
  pub weights: Option<Vec<f64>>,
}

impl RandomIndices {
  pub fn get_sample(&self, rng: &mut dyn RngCore) -> Result<Indices> {
    let indices = draw_indices(
      self.dataset_size,
      self.batch_size,
      self.weights.as_deref(),
      rng,
    )?;
    debug!(
      dataset_size = self.dataset_size,
      batch_size = self.batch_size,
      "drew shared minibatch indices"
    );
    Ok(Indices::Shared(indices))
  }
}

impl ImplicitDistribution for RandomIndices {}
