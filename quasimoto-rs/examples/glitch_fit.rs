//! Fit a single wave ensemble to the glitchy chirp and compare how well the
//! glitch window is captured against the rest of the signal.
//!
//! Usage:
//!   cargo run --example glitch_fit --release -- [width] [steps]

use std::time::Instant;

use candle_core::Device;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use quasimoto_rs::benchmark::{predict, residual_mse};
use quasimoto_rs::data::generate_1d;
use quasimoto_rs::model::{build_model, ModelSpec};
use quasimoto_rs::trainer::{TrainerConfig, TrainingRun};

fn main() -> anyhow::Result<()> {
    println!("=== Quasimoto glitch fit ===\n");

    let mut args = std::env::args().skip(1);
    let width: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(16);
    let steps: usize = args.next().map(|s| s.parse()).transpose()?.unwrap_or(2000);

    let device = Device::Cpu;
    let dataset = generate_1d();
    let data = dataset.to_tensors(&device)?;
    let glitch = dataset
        .glitch_range()
        .ok_or_else(|| anyhow::anyhow!("dataset has no glitch window"))?;

    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let model = build_model(&ModelSpec::WaveEnsemble { width }, 1, &mut rng, &device)?;
    println!("Ensemble width: {}", width);
    println!("Parameters: {}", model.parameter_count());
    println!("Points: {} (glitch at {:?})\n", dataset.len(), glitch);

    let config = TrainerConfig::default()
        .with_epochs(steps)
        .with_log_every(steps.max(1));
    let mut run = TrainingRun::new("Quasimoto", model.as_ref(), &data, &config)?;

    let start = Instant::now();
    let checkpoints = (steps / 10).max(1);
    let mut step = 0;
    while !run.state().is_terminal() {
        let loss = run.step()?;
        if step % checkpoints == 0 {
            println!("Step {:>5} | Loss: {:.6}", step, loss);
        }
        step += 1;
    }
    let elapsed = start.elapsed();

    let pred = predict(model.as_ref(), &data)?;
    let target = dataset.target();
    let overall = residual_mse(target, &pred)?;
    let inside = residual_mse(&target[glitch.clone()], &pred[glitch.clone()])?;
    let outside_target: Vec<f32> = target[..glitch.start]
        .iter()
        .chain(&target[glitch.end..])
        .copied()
        .collect();
    let outside_pred: Vec<f32> = pred[..glitch.start]
        .iter()
        .chain(&pred[glitch.end..])
        .copied()
        .collect();
    let outside = residual_mse(&outside_target, &outside_pred)?;

    println!("\n=== Results ===");
    println!(
        "Time: {:.2}s ({:.2} ms/step)",
        elapsed.as_secs_f64(),
        elapsed.as_secs_f64() * 1e3 / steps.max(1) as f64
    );
    println!("Overall MSE:  {:.8}", overall);
    println!("Glitch MSE:   {:.8}", inside);
    println!("Outside MSE:  {:.8}", outside);

    Ok(())
}
