//! CLI entry point for quasimoto-rs.

use std::path::PathBuf;

use candle_core::Device;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quasimoto_rs::benchmark::run_suite;
use quasimoto_rs::config::BenchmarkConfig;
use quasimoto_rs::data::{generate_1d_with, generate_volumetric_with};
use quasimoto_rs::error::Result;
use quasimoto_rs::report::{summary_table, write_artifacts};

#[derive(Parser)]
#[command(name = "quasimoto")]
#[command(about = "Fit wave ensembles, SIREN and random Fourier features to synthetic signals")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the 1D and volumetric benchmarks
    Run {
        /// Path to configuration file (defaults to the full benchmark)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for charts and JSON results
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Seed for model initialization
        #[arg(long)]
        seed: Option<u64>,
        /// Only run the 1D benchmark
        #[arg(long)]
        skip_volumetric: bool,
        /// Show a progress bar per model
        #[arg(long)]
        progress: bool,
    },
    /// Generate a sample configuration file
    Init {
        /// Output path for config file
        #[arg(default_value = "quasimoto.yaml")]
        output: PathBuf,
        /// Preset (default, quick)
        #[arg(long, default_value = "default")]
        preset: String,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file
        config: PathBuf,
    },
}

fn select_device() -> Result<Device> {
    #[cfg(feature = "cuda")]
    {
        let device = Device::cuda_if_available(0)?;
        tracing::info!("Device: {:?}", device);
        Ok(device)
    }
    #[cfg(not(feature = "cuda"))]
    {
        Ok(Device::Cpu)
    }
}

fn run(mut config: BenchmarkConfig, show_progress: bool) -> Result<()> {
    config.validate()?;
    let device = select_device()?;
    let trainer = config.trainer_config().with_progress(show_progress);
    let rule = "=".repeat(70);

    println!("{rule}");
    println!("1D BENCHMARK: Glitchy Chirp");
    println!("{rule}");
    let chirp = generate_1d_with(&config.one_d.chirp);
    let report = run_suite(&config.one_d.suite, &chirp, &trainer, config.seed, &device)?;
    println!("\n{}", summary_table(&report));
    let paths = write_artifacts(&config.output_dir, &config.artifact_prefix, &chirp, &report)?;
    for path in paths.all() {
        println!("✓ Saved {}", path.display());
    }

    if let Some(volumetric) = config.volumetric.take() {
        println!("\n{rule}");
        println!("VOLUMETRIC BENCHMARK: 3D space + time");
        println!("{rule}");
        let volume = generate_volumetric_with(&volumetric.volume);
        println!("Generated {} points", volume.len());
        let report = run_suite(&volumetric.suite, &volume, &trainer, config.seed, &device)?;
        println!("\n{}", summary_table(&report));
        let paths = write_artifacts(&config.output_dir, &config.artifact_prefix, &volume, &report)?;
        for path in paths.all() {
            println!("✓ Saved {}", path.display());
        }
    }

    println!("\nBenchmark complete");
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            seed,
            skip_volumetric,
            progress,
        } => {
            let mut config = match config {
                Some(path) => {
                    tracing::info!("Loading configuration: {}", path.display());
                    BenchmarkConfig::from_file(&path)?
                }
                None => BenchmarkConfig::default(),
            };
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if skip_volumetric {
                config.volumetric = None;
            }
            run(config, progress)?;
        }
        Commands::Init { output, preset } => {
            tracing::info!("Generating config for preset: {}", preset);
            let config = BenchmarkConfig::from_preset(&preset)?;
            config.to_file(&output)?;
            println!("✓ Configuration written to: {}", output.display());
        }
        Commands::Validate { config } => {
            tracing::info!("Validating configuration: {}", config.display());
            let config = BenchmarkConfig::from_file(&config)?;
            config.validate()?;
            println!("✓ Configuration is valid");
            println!("  Seed: {}", config.seed);
            println!(
                "  1D models: {} ({} steps)",
                config.one_d.suite.models.len(),
                config.one_d.suite.epochs
            );
            match &config.volumetric {
                Some(v) => println!(
                    "  Volumetric models: {} ({} steps, grid {})",
                    v.suite.models.len(),
                    v.suite.epochs,
                    v.volume.grid_size
                ),
                None => println!("  Volumetric: skipped"),
            }
        }
    }

    Ok(())
}
