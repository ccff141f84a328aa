//! Learnable traveling-wave signal models and a fitting benchmark.
//!
//! This crate fits small parametric models to synthetic signals and compares them:
//! - Quasimoto wave units: a drifting Gaussian-enveloped carrier with phase modulation,
//!   in 1D and over three spatial axes, and ensembles of them behind an affine head
//! - SIREN, a sine-activated MLP
//! - Random Fourier features with a trainable readout
//!
//! Two ground-truth signals are provided: a damped chirp with an injected
//! high-frequency glitch, and a volumetric field on a dense 3D grid. Each model is
//! trained full-batch with Adam on MSE for a fixed number of steps, and the results are
//! rendered as SVG charts, a summary table and JSON.
//!
//! # Example
//!
//! ```no_run
//! use candle_core::Device;
//! use quasimoto_rs::prelude::*;
//!
//! # fn main() -> quasimoto_rs::Result<()> {
//! let device = Device::Cpu;
//! let dataset = generate_1d();
//! let suite = SuiteConfig::one_d();
//!
//! let report = run_suite(&suite, &dataset, &TrainerConfig::default(), 0, &device)?;
//! println!("{}", summary_table(&report));
//! # Ok(())
//! # }
//! ```

pub mod benchmark;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod fourier;
pub mod history;
pub mod linear;
pub mod model;
pub mod optimizer;
pub mod report;
pub mod siren;
pub mod trainer;
pub mod wave;

pub use benchmark::{run_suite, BenchmarkReport, BenchmarkResult, ModelEntry, SuiteConfig};
pub use config::BenchmarkConfig;
pub use data::{generate_1d, generate_volumetric, Dataset, DatasetTensors};
pub use ensemble::{QuasimotoEnsemble, QuasimotoEnsemble3D};
pub use error::{QuasimotoError, Result};
pub use fourier::RandomFourierFeatures;
pub use history::LossTrajectory;
pub use model::{build_model, CoordinateArity, ModelInput, ModelSpec, Parameter, SignalModel};
pub use siren::{SirenLayer, SirenNetwork};
pub use trainer::{RunState, Trainer, TrainerConfig, TrainingOutcome, TrainingRun};
pub use wave::{QuasimotoWave, QuasimotoWave3D};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::benchmark::{run_suite, BenchmarkReport, ModelEntry, SuiteConfig};
    pub use crate::config::BenchmarkConfig;
    pub use crate::data::{generate_1d, generate_volumetric, Dataset};
    pub use crate::error::{QuasimotoError, Result};
    pub use crate::model::{build_model, ModelSpec, SignalModel};
    pub use crate::report::{summary_table, write_artifacts};
    pub use crate::trainer::{Trainer, TrainerConfig};
}
