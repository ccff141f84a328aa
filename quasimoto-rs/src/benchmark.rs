//! Benchmark suites: build each configured model, fit it, and collect results.
//!
//! This module only produces data. Rendering lives in [`crate::report`].

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use candle_core::Device;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, DatasetTensors};
use crate::error::{QuasimotoError, Result};
use crate::history::LossTrajectory;
use crate::model::{build_model, ModelSpec, SignalModel};
use crate::trainer::{RunState, Trainer, TrainerConfig};

/// A named model in a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Display name used in logs, tables and plots
    pub name: String,
    pub model: ModelSpec,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, model: ModelSpec) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }
}

fn default_epochs() -> usize {
    2000
}
fn default_log_every() -> usize {
    500
}

/// Models to compare on one dataset, with a shared step budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Optimizer steps per model
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Log the loss every this many steps
    #[serde(default = "default_log_every")]
    pub log_every: usize,
    pub models: Vec<ModelEntry>,
}

impl SuiteConfig {
    /// Ensemble of 16 waves, SIREN and random Fourier features; 2000 steps, logging every 500.
    pub fn one_d() -> Self {
        Self {
            epochs: 2000,
            log_every: 500,
            models: vec![
                ModelEntry::new("Quasimoto", ModelSpec::WaveEnsemble { width: 16 }),
                ModelEntry::new("SIREN", ModelSpec::siren()),
                ModelEntry::new("RFF", ModelSpec::random_fourier()),
            ],
        }
    }

    /// Ensemble of 8 volumetric waves; 1000 steps, logging every 200.
    pub fn volumetric() -> Self {
        Self {
            epochs: 1000,
            log_every: 200,
            models: vec![ModelEntry::new(
                "Quasimoto-4D",
                ModelSpec::WaveEnsemble3D { width: 8 },
            )],
        }
    }

    #[must_use]
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    #[must_use]
    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    /// Validate the suite against a dataset with `spatial_dims` axes.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] for an empty or inconsistent suite.
    pub fn validate(&self, spatial_dims: usize) -> Result<()> {
        if self.epochs == 0 {
            return Err(QuasimotoError::invalid_config("epochs must be > 0"));
        }
        if self.log_every == 0 {
            return Err(QuasimotoError::invalid_config("log_every must be > 0"));
        }
        if self.models.is_empty() {
            return Err(QuasimotoError::invalid_config(
                "suite must list at least one model",
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.models {
            if !seen.insert(entry.name.as_str()) {
                return Err(QuasimotoError::invalid_config(format!(
                    "duplicate model name '{}'",
                    entry.name
                )));
            }
            entry.model.validate()?;
            if !entry.model.supports_dims(spatial_dims) {
                return Err(QuasimotoError::invalid_config(format!(
                    "model '{}' ({:?}) cannot consume {spatial_dims}-axis coordinates",
                    entry.name,
                    entry.model.arity()
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of fitting one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub spec: ModelSpec,
    pub final_loss: f32,
    pub trajectory: LossTrajectory,
    pub state: RunState,
    pub parameter_count: usize,
    /// Fitted model evaluated on the training coordinates
    pub predictions: Vec<f32>,
    /// Mean squared residual of `predictions` against the targets
    pub residual_mse: f64,
    /// Wall-clock training time
    pub seconds: f64,
}

/// Results of one suite, in training order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub dataset: String,
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkReport {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: BenchmarkResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BenchmarkResult> {
        self.results.iter()
    }

    /// Look up a result by model name.
    pub fn get(&self, name: &str) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Results keyed by model name.
    pub fn by_name(&self) -> BTreeMap<&str, &BenchmarkResult> {
        self.results.iter().map(|r| (r.name.as_str(), r)).collect()
    }

    /// Result with the lowest final loss. NaN losses never win.
    pub fn best(&self) -> Option<&BenchmarkResult> {
        self.results
            .iter()
            .filter(|r| !r.final_loss.is_nan())
            .min_by(|a, b| a.final_loss.total_cmp(&b.final_loss))
    }
}

impl<'a> IntoIterator for &'a BenchmarkReport {
    type Item = &'a BenchmarkResult;
    type IntoIter = std::slice::Iter<'a, BenchmarkResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Evaluate `model` on every point of `data`, flattened to one value per point.
///
/// # Errors
///
/// Returns an error if the dataset cannot supply the model's coordinates.
pub fn predict(model: &dyn SignalModel, data: &DatasetTensors) -> Result<Vec<f32>> {
    let input = data.input(model.arity())?;
    let pred = model.forward(&input)?.detach();
    Ok(pred.flatten_all()?.to_vec1()?)
}

/// Mean squared difference between `target` and `pred`, accumulated in f64.
///
/// # Errors
///
/// Returns [`QuasimotoError::ShapeMismatch`] if the lengths differ.
pub fn residual_mse(target: &[f32], pred: &[f32]) -> Result<f64> {
    if target.len() != pred.len() {
        return Err(QuasimotoError::shape_mismatch(
            target.len().to_string(),
            pred.len().to_string(),
        ));
    }
    if target.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = target
        .iter()
        .zip(pred)
        .map(|(&y, &p)| {
            let r = f64::from(y) - f64::from(p);
            r * r
        })
        .sum();
    Ok(sum / target.len() as f64)
}

/// Train every model in `suite` on `dataset`, one after another.
///
/// Models are initialized from a single `ChaCha8Rng` seeded with `seed`, drawn in suite
/// order. `trainer` supplies the optimizer and numerical settings; the step budget and
/// log interval come from the suite.
///
/// A model whose loss turns non-finite is recorded in state [`RunState::Aborted`] and
/// the suite moves on to the next model.
///
/// # Errors
///
/// Returns the first error raised while building or training a model, other than a
/// non-finite loss.
pub fn run_suite(
    suite: &SuiteConfig,
    dataset: &Dataset,
    trainer: &TrainerConfig,
    seed: u64,
    device: &Device,
) -> Result<BenchmarkReport> {
    suite.validate(dataset.spatial_dims())?;
    let tensors = dataset.to_tensors(device)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let trainer = Trainer::new(
        trainer
            .clone()
            .with_epochs(suite.epochs)
            .with_log_every(suite.log_every),
    );

    tracing::info!(
        "Benchmarking {} models on '{}' ({} points)",
        suite.models.len(),
        dataset.name(),
        dataset.len()
    );

    let mut report = BenchmarkReport::new(dataset.name());
    for entry in &suite.models {
        let model = build_model(&entry.model, dataset.spatial_dims(), &mut rng, device)?;

        let start = Instant::now();
        let outcome = trainer.fit_complete(&entry.name, model.as_ref(), &tensors)?;
        let seconds = start.elapsed().as_secs_f64();
        if let RunState::Aborted { step } = outcome.state {
            tracing::warn!(
                "Model '{}' diverged at step {}; recording its partial result",
                entry.name,
                step
            );
        }

        let predictions = predict(model.as_ref(), &tensors)?;
        let residual = residual_mse(dataset.target(), &predictions)?;

        report.push(BenchmarkResult {
            name: entry.name.clone(),
            spec: entry.model.clone(),
            final_loss: outcome.final_loss,
            trajectory: outcome.trajectory,
            state: outcome.state,
            parameter_count: model.parameter_count(),
            predictions,
            residual_mse: residual,
            seconds,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{generate_1d_with, generate_volumetric, ChirpConfig};

    fn tiny_chirp() -> Dataset {
        generate_1d_with(&ChirpConfig {
            points: 64,
            ..ChirpConfig::default()
        })
    }

    #[test]
    fn test_default_suites() {
        let one_d = SuiteConfig::one_d();
        assert_eq!(one_d.epochs, 2000);
        assert_eq!(one_d.log_every, 500);
        let names: Vec<&str> = one_d.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Quasimoto", "SIREN", "RFF"]);
        assert!(one_d.validate(1).is_ok());

        let volumetric = SuiteConfig::volumetric();
        assert_eq!(volumetric.epochs, 1000);
        assert_eq!(volumetric.log_every, 200);
        assert!(volumetric.validate(3).is_ok());
        assert!(volumetric.validate(1).is_err());
    }

    #[test]
    fn test_suite_rejects_duplicates_and_empty() {
        let mut suite = SuiteConfig::one_d();
        suite.models.push(ModelEntry::new("RFF", ModelSpec::random_fourier()));
        assert!(suite.validate(1).is_err());

        suite.models.clear();
        assert!(suite.validate(1).is_err());
    }

    #[test]
    fn test_residual_mse() {
        assert_eq!(residual_mse(&[1.0, 2.0], &[1.0, 0.0]).unwrap(), 2.0);
        assert_eq!(residual_mse(&[], &[]).unwrap(), 0.0);
        assert!(residual_mse(&[1.0], &[]).is_err());
    }

    #[test]
    fn test_run_suite_collects_results_in_order() {
        let device = Device::Cpu;
        let suite = SuiteConfig::one_d().with_epochs(5).with_log_every(5);
        let report = run_suite(&suite, &tiny_chirp(), &TrainerConfig::default(), 0, &device).unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.dataset, "glitchy-chirp");
        let names: Vec<&str> = report.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Quasimoto", "SIREN", "RFF"]);

        for result in &report {
            assert_eq!(result.trajectory.len(), 5);
            assert_eq!(result.predictions.len(), 64);
            assert_eq!(result.state, RunState::Exhausted);
            assert!(result.residual_mse.is_finite());
        }
        assert_eq!(report.get("RFF").unwrap().parameter_count, 257);
        assert!(report.get("missing").is_none());
        assert_eq!(report.by_name().len(), 3);
        assert!(report.best().is_some());
    }

    #[test]
    fn test_run_suite_is_seeded() {
        let device = Device::Cpu;
        let suite = SuiteConfig {
            epochs: 3,
            log_every: 1,
            models: vec![ModelEntry::new("wave", ModelSpec::Wave)],
        };
        let a = run_suite(&suite, &tiny_chirp(), &TrainerConfig::default(), 11, &device).unwrap();
        let b = run_suite(&suite, &tiny_chirp(), &TrainerConfig::default(), 11, &device).unwrap();
        assert_eq!(a.results[0].trajectory, b.results[0].trajectory);
    }

    #[test]
    fn test_run_suite_keeps_results_after_divergence() {
        let device = Device::Cpu;
        let suite = SuiteConfig {
            epochs: 3,
            log_every: 1,
            models: vec![
                ModelEntry::new("Good", ModelSpec::Wave),
                ModelEntry::new(
                    "Diverging",
                    ModelSpec::Siren {
                        hidden: 4,
                        layers: 1,
                        w0: 1e300,
                    },
                ),
                ModelEntry::new("After", ModelSpec::random_fourier()),
            ],
        };
        let report = run_suite(&suite, &tiny_chirp(), &TrainerConfig::default(), 0, &device).unwrap();
        assert_eq!(report.len(), 3);

        let good = report.get("Good").unwrap();
        assert_eq!(good.state, RunState::Exhausted);
        assert_eq!(good.trajectory.len(), 3);

        let diverging = report.get("Diverging").unwrap();
        assert_eq!(diverging.state, RunState::Aborted { step: 0 });
        assert!(diverging.trajectory.is_empty());
        assert!(!diverging.final_loss.is_finite());
        assert_eq!(diverging.predictions.len(), 64);

        assert_eq!(report.get("After").unwrap().state, RunState::Exhausted);
        assert_ne!(report.best().map(|r| r.name.as_str()), Some("Diverging"));
    }

    #[test]
    fn test_run_suite_volumetric() {
        let device = Device::Cpu;
        let suite = SuiteConfig::volumetric().with_epochs(4);
        let report =
            run_suite(&suite, &generate_volumetric(4), &TrainerConfig::default(), 0, &device).unwrap();
        let result = report.get("Quasimoto-4D").unwrap();
        assert_eq!(result.trajectory.len(), 4);
        assert_eq!(result.predictions.len(), 64);
        assert_eq!(result.parameter_count, 8 * 14 + 8 + 1);
    }

    #[test]
    fn test_model_entry_yaml() {
        let yaml = "name: Quasimoto\nmodel:\n  kind: wave_ensemble\n  width: 16\n";
        let entry: ModelEntry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            entry,
            ModelEntry::new("Quasimoto", ModelSpec::WaveEnsemble { width: 16 })
        );
    }
}
