use std::collections::HashSet;
use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use brancher_distr::distributions::Categorical;
use brancher_distr::distributions::Concrete;
use brancher_distr::distributions::Dataset;
use brancher_distr::distributions::Empirical;
use brancher_distr::distributions::EmpiricalSample;
use brancher_distr::distributions::Normal;
use brancher_distr::distributions::RandomIndices;
use brancher_distr::distributions::Truncated;
use brancher_distr::Distribution;
use brancher_distr::DistributionError;
use brancher_distr::DistributionKind;
use brancher_distr::EmpiricalConfig;
use brancher_distr::Parameters;
use brancher_distr::TruncationConfig;
use ndarray::Array;
use ndarray::Array3;
use ndarray::ArrayD;
use ndarray::ArrayViewD;
use ndarray::Axis;
use ndarray::IxDyn;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn params_for(kind: DistributionKind) -> Parameters {
  let simplex = vec![0.2, 0.3, 0.5, 0.6, 0.3, 0.1, 0.1, 0.1, 0.8];
  let simplex = Array3::from_shape_vec((1, 3, 3), simplex).unwrap().into_dyn();
  match kind {
    DistributionKind::Normal
    | DistributionKind::Cauchy
    | DistributionKind::LogNormal
    | DistributionKind::LogitNormal => Parameters::new()
      .with("mu", Array::from_shape_fn((1, 3), |(_, b)| b as f64 * 0.5).into_dyn())
      .with_scalar("sigma", 0.7),
    DistributionKind::Binomial => Parameters::new()
      .with_scalar("n", 8.0)
      .with("p", Array::from_elem((1, 3), 0.4).into_dyn()),
    DistributionKind::LogitBinomial => Parameters::new()
      .with_scalar("n", 8.0)
      .with("z", Array::from_elem((1, 3), -0.3).into_dyn()),
    DistributionKind::CholeskyMultivariateNormal => Parameters::new()
      .with("mu", Array3::zeros((1, 3, 2)).into_dyn())
      .with(
        "chol_cov",
        Array::from_shape_fn((1, 3, 2, 2), |(_, _, i, j)| match (i, j) {
          (0, 0) => 1.5,
          (1, 0) => 0.3,
          (1, 1) => 0.8,
          _ => 0.0,
        })
        .into_dyn(),
      ),
    DistributionKind::Categorical => Parameters::new().with("p", simplex),
    DistributionKind::SoftmaxCategorical => Parameters::new().with("z", simplex.mapv(f64::ln)),
    DistributionKind::Concrete => Parameters::new().with("p", simplex).with_scalar("tau", 0.8),
  }
}

#[test]
fn every_kind_samples_and_scores_its_own_draws() {
  let mut rng = StdRng::seed_from_u64(7);
  for kind in DistributionKind::ALL {
    let distribution = kind.build();
    let params = params_for(kind);
    for name in kind.parameter_names() {
      assert!(params.get(name).is_some(), "{kind:?} is missing `{name}`");
    }

    let samples = distribution.get_sample(&params, 6, &mut rng).unwrap();
    assert_eq!(&samples.shape()[..2], &[6, 3], "{kind:?}");
    let lp = distribution.calculate_log_probability(&samples, &params).unwrap();
    assert_eq!(lp.shape(), &[6, 3], "{kind:?}");
    assert!(lp.iter().all(|v| v.is_finite()), "{kind:?} produced {lp:?}");
  }
}

#[test]
fn normal_density_at_the_mean() {
  let sigma: f64 = 1.7;
  let params = Parameters::new().with_scalar("mu", 0.3).with_scalar("sigma", sigma);
  let x = ArrayD::from_elem(IxDyn(&[1, 1]), 0.3);
  let lp = Normal.calculate_log_probability(&x, &params).unwrap();
  assert_abs_diff_eq!(lp[[0, 0]], -0.5 * (2.0 * PI * sigma * sigma).ln(), epsilon = 1e-12);
}

#[test]
fn normal_moments() {
  let mut rng = StdRng::seed_from_u64(8);
  let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 1.0);
  let samples = Normal.get_sample(&params, 100_000, &mut rng).unwrap();
  let mean = samples.mean().unwrap();
  let var = samples.var(1.0);
  println!("[Normal] mean: {mean:.4}, var: {var:.4}");
  assert!(mean.abs() < 0.02);
  assert!((var - 1.0).abs() < 0.02);
}

#[test]
fn categorical_scores_one_hot_draws_by_their_entry() {
  let mut rng = StdRng::seed_from_u64(9);
  let params = params_for(DistributionKind::Categorical);
  let p = params.get("p").unwrap().clone();
  let samples = Categorical.get_sample(&params, 20, &mut rng).unwrap();
  let lp = Categorical.calculate_log_probability(&samples, &params).unwrap();
  let lp = lp.into_dimensionality::<ndarray::Ix2>().unwrap();
  for ((s, b), &value) in lp.indexed_iter() {
    let k = (0..3).find(|&k| samples[[s, b, k]] == 1.0).unwrap();
    assert_abs_diff_eq!(value, p[[0, b, k]].ln(), epsilon = 1e-12);
  }
}

#[test]
fn concrete_draws_live_on_the_simplex() {
  let mut rng = StdRng::seed_from_u64(10);
  let samples = Concrete
    .get_sample(&params_for(DistributionKind::Concrete), 1_000, &mut rng)
    .unwrap();
  for lane in samples.lanes(Axis(2)) {
    assert!(lane.iter().all(|&v| v >= 0.0));
    assert_abs_diff_eq!(lane.sum(), 1.0, epsilon = 1e-9);
  }
}

#[test]
fn truncated_normal_is_positive() {
  let truncated = Truncated::new(
    Box::new(Normal),
    |x: ArrayViewD<f64>| x.iter().all(|&v| v > 0.0),
    TruncationConfig::default(),
  );
  let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 1.0);
  let mut rng = StdRng::seed_from_u64(11);
  let samples = truncated.get_sample(&params, 10_000, &mut rng).unwrap();
  assert_eq!(samples.len(), 10_000);
  assert!(samples.iter().all(|&v| v > 0.0));
}

#[test]
fn truncation_reports_exhaustion() {
  let truncated = Truncated::new(
    Box::new(Normal),
    |x: ArrayViewD<f64>| x.iter().all(|&v| v > 50.0),
    TruncationConfig::new(Some(4), Some(2)),
  );
  let params = Parameters::new().with_scalar("mu", 0.0).with_scalar("sigma", 1.0);
  let mut rng = StdRng::seed_from_u64(12);
  assert!(matches!(
    truncated.get_sample(&params, 10, &mut rng),
    Err(DistributionError::TruncationExhausted {
      restarts: 2,
      requested: 10,
      ..
    })
  ));
}

#[test]
fn shared_indices_align_inputs_and_labels() {
  let inputs = Array::from_shape_fn((1, 50, 2), |(_, r, k)| (2 * r + k) as f64).into_dyn();
  let labels = Array::from_shape_fn((1, 50, 1), |(_, r, _)| r as f64).into_dyn();
  let empirical = Empirical::new(EmpiricalConfig::new(10, true, None)).unwrap();
  let mut rng = StdRng::seed_from_u64(13);

  let indices = RandomIndices::new(50, 10, None).get_sample(&mut rng).unwrap();
  let x = empirical
    .get_sample::<f64>(Dataset::Tensor(&inputs), Some(&indices), 1, None, &mut rng)
    .unwrap()
    .into_tensor()
    .unwrap();
  let y = empirical
    .get_sample::<f64>(Dataset::Tensor(&labels), Some(&indices), 1, None, &mut rng)
    .unwrap()
    .into_tensor()
    .unwrap();

  assert_eq!(x.shape(), &[1, 10, 2]);
  assert_eq!(y.shape(), &[1, 10, 1]);
  let distinct: HashSet<u64> = y.iter().map(|&v| v as u64).collect();
  assert_eq!(distinct.len(), 10);
  for b in 0..10 {
    assert_eq!(x[[0, b, 0]], 2.0 * y[[0, b, 0]]);
  }
}

#[test]
fn empirical_configuration_is_checked_up_front() {
  assert!(matches!(
    Empirical::new(EmpiricalConfig::new(4, true, Some(vec![0.0, 0.0]))),
    Err(DistributionError::Configuration(_))
  ));

  let empirical = Empirical::new(EmpiricalConfig::new(4, true, None)).unwrap();
  let records = ["a", "b", "c"];
  let mut rng = StdRng::seed_from_u64(14);
  assert!(matches!(
    empirical.get_sample(Dataset::Records(&records), None, 2, None, &mut rng),
    Err(DistributionError::Configuration(_))
  ));

  let weights = [0.0, 1.0, 1.0, 1.0, 1.0];
  let records = ["a", "b", "c", "d", "e"];
  let Ok(EmpiricalSample::Records(batches)) =
    empirical.get_sample(Dataset::Records(&records), None, 3, Some(&weights[..]), &mut rng)
  else {
    panic!("expected record minibatches");
  };
  assert_eq!(batches.len(), 3);
  for batch in batches {
    assert_eq!(batch.len(), 4);
    assert!(!batch.contains(&"a"));
  }
}
