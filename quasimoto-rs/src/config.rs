//! Benchmark configuration.
//!
//! Configurations are YAML files. Every section has defaults, so an empty file is the
//! full default benchmark:
//!
//! ```yaml
//! seed: 0
//! output_dir: .
//! artifact_prefix: quasimoto
//! optimizer:
//!   learning_rate: 0.001
//! one_d:
//!   chirp:
//!     points: 1000
//!   suite:
//!     epochs: 2000
//!     log_every: 500
//!     models:
//!       - name: Quasimoto
//!         model: { kind: wave_ensemble, width: 16 }
//!       - name: SIREN
//!         model: { kind: siren }
//!       - name: RFF
//!         model: { kind: random_fourier, features: 128, bandwidth: 5.0 }
//! volumetric:
//!   volume:
//!     grid_size: 20
//!   suite:
//!     epochs: 1000
//!     log_every: 200
//!     models:
//!       - name: Quasimoto-4D
//!         model: { kind: wave_ensemble3d, width: 8 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::benchmark::SuiteConfig;
use crate::data::{ChirpConfig, VolumeConfig};
use crate::error::{QuasimotoError, Result};
use crate::optimizer::OptimizerConfig;
use crate::trainer::TrainerConfig;

/// The 1D glitchy-chirp benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneDConfig {
    #[serde(default)]
    pub chirp: ChirpConfig,
    #[serde(default = "SuiteConfig::one_d")]
    pub suite: SuiteConfig,
}

impl Default for OneDConfig {
    fn default() -> Self {
        Self {
            chirp: ChirpConfig::default(),
            suite: SuiteConfig::one_d(),
        }
    }
}

/// The volumetric (3D space + time) benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumetricConfig {
    #[serde(default)]
    pub volume: VolumeConfig,
    #[serde(default = "SuiteConfig::volumetric")]
    pub suite: SuiteConfig,
}

impl Default for VolumetricConfig {
    fn default() -> Self {
        Self {
            volume: VolumeConfig::default(),
            suite: SuiteConfig::volumetric(),
        }
    }
}

/// Complete benchmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Seed for model initialization
    #[serde(default)]
    pub seed: u64,
    /// Directory receiving charts and JSON results
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// File name prefix for artifacts
    #[serde(default = "default_artifact_prefix")]
    pub artifact_prefix: String,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Stop a run when its loss becomes NaN or infinite
    #[serde(default = "default_true")]
    pub abort_on_non_finite: bool,
    #[serde(default)]
    pub one_d: OneDConfig,
    /// Omit to skip the volumetric benchmark
    #[serde(default = "default_volumetric")]
    pub volumetric: Option<VolumetricConfig>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_artifact_prefix() -> String {
    "quasimoto".into()
}
fn default_true() -> bool {
    true
}
fn default_volumetric() -> Option<VolumetricConfig> {
    Some(VolumetricConfig::default())
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            output_dir: default_output_dir(),
            artifact_prefix: default_artifact_prefix(),
            optimizer: OptimizerConfig::default(),
            abort_on_non_finite: true,
            one_d: OneDConfig::default(),
            volumetric: default_volumetric(),
        }
    }
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Create a configuration from a preset.
    ///
    /// Available presets:
    /// - `"default"` - the full benchmark (2000 and 1000 steps, `20³` grid)
    /// - `"quick"` - a smoke-test sized run
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] for an unknown preset name.
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Ok(Self::default()),
            "quick" => Ok(Self::quick_preset()),
            _ => Err(QuasimotoError::invalid_config(format!(
                "unknown preset: {preset}"
            ))),
        }
    }

    /// Same models with 200 and 100 steps and a `10³` grid.
    #[must_use]
    pub fn quick_preset() -> Self {
        Self {
            one_d: OneDConfig {
                chirp: ChirpConfig::default(),
                suite: SuiteConfig::one_d().with_epochs(200).with_log_every(50),
            },
            volumetric: Some(VolumetricConfig {
                volume: VolumeConfig {
                    grid_size: 10,
                    ..VolumeConfig::default()
                },
                suite: SuiteConfig::volumetric()
                    .with_epochs(100)
                    .with_log_every(20),
            }),
            ..Self::default()
        }
    }

    /// Training settings shared by every suite.
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::default()
            .with_optimizer(self.optimizer.clone())
            .with_abort_on_non_finite(self.abort_on_non_finite)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.artifact_prefix.is_empty() {
            return Err(QuasimotoError::invalid_config(
                "artifact_prefix must not be empty",
            ));
        }
        if self.artifact_prefix.contains(['/', '\\']) {
            return Err(QuasimotoError::invalid_config(
                "artifact_prefix must not contain path separators",
            ));
        }

        self.optimizer.validate()?;

        let chirp = &self.one_d.chirp;
        if chirp.points < 2 {
            return Err(QuasimotoError::invalid_config(
                "one_d.chirp.points must be >= 2",
            ));
        }
        if !(chirp.start < chirp.end) {
            return Err(QuasimotoError::invalid_config(
                "one_d.chirp.start must be below one_d.chirp.end",
            ));
        }
        let glitch = &chirp.glitch;
        if !(0.0..=1.0).contains(&glitch.start_fraction)
            || !(0.0..=1.0).contains(&glitch.end_fraction)
            || glitch.start_fraction > glitch.end_fraction
        {
            return Err(QuasimotoError::invalid_config(
                "glitch fractions must satisfy 0 <= start <= end <= 1",
            ));
        }
        self.one_d.suite.validate(1)?;

        if let Some(volumetric) = &self.volumetric {
            if volumetric.volume.grid_size == 0 {
                return Err(QuasimotoError::invalid_config(
                    "volumetric.volume.grid_size must be > 0",
                ));
            }
            if !(volumetric.volume.extent > 0.0) {
                return Err(QuasimotoError::invalid_config(
                    "volumetric.volume.extent must be positive",
                ));
            }
            volumetric.suite.validate(3)?;
        }

        Ok(())
    }
}
