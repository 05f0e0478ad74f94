//! # Broadcast
//!
//! $$
//! (S,B,E_1,\dots,E_k)\;\xrightarrow{\;\Sigma_{E}\;}\;(S,B)
//! $$
//!
//! Every distribution aligns its value and parameters here before combining
//! them elementwise, and reduces its per-event log-probability with
//! [`sum_data_dimensions`]. Axis 0 is the sample replicate, axis 1 the batch
//! element, everything after that is event shape.
use ndarray::ArrayD;
use ndarray::Axis;
use ndarray::Dimension;
use ndarray::IxDyn;

use crate::error::DistributionError;
use crate::error::Result;

/// Lifts a 0-d scalar to shape (1, 1). Anything else must already carry the
/// sample and batch axes.
pub fn lift(a: &ArrayD<f64>) -> Result<ArrayD<f64>> {
  match a.ndim() {
    0 => {
      let value = a.first().copied().unwrap_or(f64::NAN);
      Ok(ArrayD::from_elem(IxDyn(&[1, 1]), value))
    }
    1 => Err(DistributionError::ShapeMismatch(format!(
      "tensor of shape {:?} has no batch axis; expected (sample, batch, event...)",
      a.shape()
    ))),
    _ => Ok(a.clone()),
  }
}

/// Standard broadcasting over equal-rank shapes: each axis is either shared or
/// has size 1.
pub fn broadcast_shape(shapes: &[&[usize]]) -> Result<Vec<usize>> {
  let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
  let mut out = vec![1usize; rank];

  for shape in shapes {
    for (axis, &len) in shape.iter().enumerate() {
      if len == out[axis] || len == 1 {
        continue;
      }
      if out[axis] == 1 {
        out[axis] = len;
      } else {
        return Err(DistributionError::ShapeMismatch(format!(
          "cannot broadcast axis {axis}: {} vs {len} (shapes {:?})",
          out[axis], shapes
        )));
      }
    }
  }

  Ok(out)
}

fn pad_trailing(mut a: ArrayD<f64>, rank: usize) -> ArrayD<f64> {
  while a.ndim() < rank {
    let last = a.ndim();
    a.insert_axis_inplace(Axis(last));
  }
  a
}

/// Broadcasts `N` tensors to one common (sample, batch, event...) shape and
/// drops the trailing singleton event axes they end up sharing.
///
/// Tensors of lower rank are padded with trailing size-1 axes first, so a
/// parameter of shape (1, 1) combines with a value of shape (S, B, d).
pub fn broadcast_and_squeeze<const N: usize>(
  arrays: [&ArrayD<f64>; N],
) -> Result<[ArrayD<f64>; N]> {
  let lifted = arrays
    .iter()
    .map(|a| lift(a))
    .collect::<Result<Vec<_>>>()?;
  let rank = lifted.iter().map(|a| a.ndim()).max().unwrap_or(2);
  let padded: Vec<ArrayD<f64>> = lifted.into_iter().map(|a| pad_trailing(a, rank)).collect();

  let shapes: Vec<&[usize]> = padded.iter().map(|a| a.shape()).collect();
  let mut target = broadcast_shape(&shapes)?;
  while target.len() > 2 && target[target.len() - 1] == 1 {
    target.pop();
  }

  let out = padded
    .iter()
    .map(|a| {
      let a = squeeze_trailing(a.clone(), target.len());
      a.broadcast(IxDyn(&target))
        .map(|view| view.to_owned())
        .ok_or_else(|| {
          DistributionError::ShapeMismatch(format!(
            "cannot broadcast {:?} to {:?}",
            a.shape(),
            target
          ))
        })
    })
    .collect::<Result<Vec<_>>>()?;

  out
    .try_into()
    .map_err(|_| DistributionError::ShapeMismatch("broadcast arity changed".into()))
}

fn squeeze_trailing(mut a: ArrayD<f64>, rank: usize) -> ArrayD<f64> {
  while a.ndim() > rank {
    let last = a.ndim() - 1;
    a = a.index_axis_move(Axis(last), 0);
  }
  a
}

/// Sums a log-probability tensor over every event axis, leaving (sample, batch).
pub fn sum_data_dimensions(mut log_probability: ArrayD<f64>) -> ArrayD<f64> {
  while log_probability.ndim() < 2 {
    let last = log_probability.ndim();
    log_probability.insert_axis_inplace(Axis(last));
  }
  while log_probability.ndim() > 2 {
    log_probability = log_probability.sum_axis(Axis(2));
  }
  log_probability
}

/// Resolves the shared (sample, batch) extent of several tensors whose event
/// shapes differ, e.g. integer labels against a row of logits.
pub fn broadcast_sample_batch(arrays: &[&ArrayD<f64>]) -> Result<(usize, usize)> {
  let mut leading = Vec::with_capacity(arrays.len());
  for a in arrays {
    if a.ndim() < 2 {
      return Err(DistributionError::ShapeMismatch(format!(
        "tensor of shape {:?} has no batch axis",
        a.shape()
      )));
    }
    leading.push(&a.shape()[..2]);
  }
  let shape = broadcast_shape(&leading)?;
  Ok((shape[0], shape[1]))
}

/// Expands a tensor whose sample axis is shared (length 1) to `n` replicates.
pub fn expand_samples(a: ArrayD<f64>, n: usize) -> Result<ArrayD<f64>> {
  let samples = a.shape().first().copied().unwrap_or(1);
  if samples == n {
    return Ok(a);
  }
  if samples != 1 {
    return Err(DistributionError::ShapeMismatch(format!(
      "parameters carry {samples} sample replicates but {n} were requested"
    )));
  }
  let mut shape = a.shape().to_vec();
  shape[0] = n;
  a.broadcast(IxDyn(&shape))
    .map(|view| view.to_owned())
    .ok_or_else(|| {
      DistributionError::ShapeMismatch(format!("cannot expand {:?} to {shape:?}", a.shape()))
    })
}

/// Diagonal of the trailing square matrices: (..., d, d) -> (..., d).
pub fn get_diagonal(a: &ArrayD<f64>) -> Result<ArrayD<f64>> {
  let rank = a.ndim();
  if rank < 2 || a.shape()[rank - 1] != a.shape()[rank - 2] {
    return Err(DistributionError::ShapeMismatch(format!(
      "expected trailing square matrices, got {:?}",
      a.shape()
    )));
  }
  let out_shape = &a.shape()[..rank - 1];
  Ok(ArrayD::from_shape_fn(IxDyn(out_shape), |idx| {
    let mut full = idx.slice().to_vec();
    full.push(full[rank - 2]);
    a[IxDyn(&full)]
  }))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::arr0;
  use ndarray::Array;

  use super::*;

  fn dyn_zeros(shape: &[usize]) -> ArrayD<f64> {
    ArrayD::zeros(IxDyn(shape))
  }

  #[test]
  fn scalars_lift_to_sample_batch() {
    let [x, mu] = broadcast_and_squeeze([&arr0(1.0).into_dyn(), &dyn_zeros(&[4, 3])]).unwrap();
    assert_eq!(x.shape(), &[4, 3]);
    assert_eq!(mu.shape(), &[4, 3]);
    assert!(x.iter().all(|&v| v == 1.0));
  }

  #[test]
  fn lower_rank_parameters_pad_trailing_axes() {
    let value = dyn_zeros(&[5, 2, 3]);
    let param = dyn_zeros(&[1, 1]);
    let [v, p] = broadcast_and_squeeze([&value, &param]).unwrap();
    assert_eq!(v.shape(), &[5, 2, 3]);
    assert_eq!(p.shape(), &[5, 2, 3]);
  }

  #[test]
  fn shared_trailing_singletons_are_squeezed() {
    let value = dyn_zeros(&[2, 3, 1, 1]);
    let param = dyn_zeros(&[1, 3, 1]);
    let [v, p] = broadcast_and_squeeze([&value, &param]).unwrap();
    assert_eq!(v.shape(), &[2, 3]);
    assert_eq!(p.shape(), &[2, 3]);
  }

  #[test]
  fn incompatible_axes_fail() {
    let err = broadcast_and_squeeze([&dyn_zeros(&[2, 3]), &dyn_zeros(&[3, 3])]).unwrap_err();
    assert!(matches!(err, DistributionError::ShapeMismatch(_)));
  }

  #[test]
  fn vectors_without_batch_axis_are_rejected() {
    let err = lift(&dyn_zeros(&[3])).unwrap_err();
    assert!(matches!(err, DistributionError::ShapeMismatch(_)));
  }

  #[test]
  fn event_axes_are_summed_away() {
    let lp = Array::from_shape_fn((2, 3, 4, 5), |(s, b, i, j)| (s + b + i + j) as f64).into_dyn();
    let reduced = sum_data_dimensions(lp.clone());
    assert_eq!(reduced.shape(), &[2, 3]);
    let expected: f64 = lp.index_axis(Axis(0), 1).index_axis(Axis(0), 2).sum();
    assert_abs_diff_eq!(reduced[[1, 2]], expected);
  }

  #[test]
  fn sample_batch_extent_ignores_event_axes() {
    let labels = dyn_zeros(&[1, 7]);
    let logits = dyn_zeros(&[4, 1, 10]);
    assert_eq!(broadcast_sample_batch(&[&labels, &logits]).unwrap(), (4, 7));
  }

  #[test]
  fn expand_only_from_shared_sample_axis() {
    let shared = dyn_zeros(&[1, 2]);
    assert_eq!(expand_samples(shared, 6).unwrap().shape(), &[6, 2]);
    assert!(expand_samples(dyn_zeros(&[3, 2]), 6).is_err());
  }

  #[test]
  fn diagonal_of_batched_matrices() {
    let m = Array::from_shape_fn((1, 2, 3, 3), |(_, b, i, j)| {
      if i == j {
        (b * 10 + i) as f64
      } else {
        -1.0
      }
    })
    .into_dyn();
    let d = get_diagonal(&m).unwrap();
    assert_eq!(d.shape(), &[1, 2, 3]);
    assert_eq!(d[[0, 1, 2]], 12.0);
  }
}
