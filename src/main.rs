use anyhow::Result;
use brancher_distr::distributions::Dataset;
use brancher_distr::distributions::Empirical;
use brancher_distr::distributions::Normal;
use brancher_distr::distributions::RandomIndices;
use brancher_distr::distributions::Truncated;
use brancher_distr::Distribution;
use brancher_distr::DistributionKind;
use brancher_distr::EmpiricalConfig;
use brancher_distr::Parameters;
use brancher_distr::TruncationConfig;
use ndarray::Array;
use ndarray::ArrayViewD;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> Result<()> {
  let mut rng = StdRng::seed_from_u64(2024);

  for kind in DistributionKind::ALL {
    println!(
      "{:<28} reparameterizable: {:<5} parameters: {:?}",
      kind.build().name(),
      kind.is_reparameterizable(),
      kind.parameter_names()
    );
  }

  // Normal(1, 2) truncated to the unit interval
  let truncated = Truncated::new(
    Box::new(Normal),
    |x: ArrayViewD<f64>| x.iter().all(|v| (0.0..1.0).contains(v)),
    TruncationConfig::default(),
  );
  let params = Parameters::new().with_scalar("mu", 1.0).with_scalar("sigma", 2.0);
  let samples = truncated.get_sample(&params, 10_000, &mut rng)?;
  println!(
    "\ntruncated normal: {} draws, mean {:.4}",
    samples.len(),
    samples.mean().unwrap_or(f64::NAN)
  );

  // inputs and labels share one minibatch
  let inputs = Array::from_shape_fn((1, 100, 3), |(_, r, k)| (r * 3 + k) as f64).into_dyn();
  let labels = Array::from_shape_fn((1, 100, 1), |(_, r, _)| (r % 10) as f64).into_dyn();
  let indices = RandomIndices::new(100, 8, None).get_sample(&mut rng)?;
  let empirical = Empirical::new(EmpiricalConfig::new(8, true, None))?;
  let x = empirical.get_sample::<f64>(Dataset::Tensor(&inputs), Some(&indices), 1, None, &mut rng)?;
  let y = empirical.get_sample::<f64>(Dataset::Tensor(&labels), Some(&indices), 1, None, &mut rng)?;
  println!("\nminibatch indices: {indices:?}");
  println!("inputs: {x:?}");
  println!("labels: {y:?}");

  Ok(())
}
