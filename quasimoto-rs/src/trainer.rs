//! Full-batch training loop.
//!
//! Every model is fit the same way: predict all points, take the mean squared error
//! against the targets, backpropagate, and apply one Adam update. A run stops after a
//! fixed number of steps; there is no early stopping.
//!
//! # Example
//!
//! ```no_run
//! use candle_core::Device;
//! use quasimoto_rs::data::generate_1d;
//! use quasimoto_rs::model::{build_model, ModelSpec};
//! use quasimoto_rs::trainer::{Trainer, TrainerConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! # fn main() -> quasimoto_rs::Result<()> {
//! let device = Device::Cpu;
//! let data = generate_1d().to_tensors(&device)?;
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//! let model = build_model(&ModelSpec::WaveEnsemble { width: 16 }, 1, &mut rng, &device)?;
//!
//! let trainer = Trainer::new(TrainerConfig::default());
//! let outcome = trainer.fit("Quasimoto", model.as_ref(), &data)?;
//! println!("final loss {:.6}", outcome.final_loss);
//! # Ok(())
//! # }
//! ```

use candle_core::Tensor;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::data::DatasetTensors;
use crate::error::{QuasimotoError, Result};
use crate::history::LossTrajectory;
use crate::model::{ModelInput, SignalModel};
use crate::optimizer::{AdamOptimizer, OptimizerConfig};

/// Training loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Number of optimizer steps
    pub epochs: usize,
    /// Log the loss every this many steps
    pub log_every: usize,
    pub optimizer: OptimizerConfig,
    /// Stop with [`QuasimotoError::NonFiniteLoss`] when the loss becomes NaN or infinite
    pub abort_on_non_finite: bool,
    /// Draw a terminal progress bar
    pub show_progress: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: 2000,
            log_every: 500,
            optimizer: OptimizerConfig::default(),
            abort_on_non_finite: true,
            show_progress: false,
        }
    }
}

impl TrainerConfig {
    #[must_use]
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    #[must_use]
    pub const fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    #[must_use]
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    #[must_use]
    pub const fn with_abort_on_non_finite(mut self, abort: bool) -> Self {
        self.abort_on_non_finite = abort;
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] for a zero step budget or log interval.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(QuasimotoError::invalid_config("epochs must be > 0"));
        }
        if self.log_every == 0 {
            return Err(QuasimotoError::invalid_config("log_every must be > 0"));
        }
        self.optimizer.validate()
    }
}

/// Lifecycle of one model's training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    /// Optimizer built, no step taken yet
    Initialized,
    /// `step` optimizer steps completed
    Running { step: usize },
    /// The step budget has been spent
    Exhausted,
    /// Stopped on a non-finite loss at `step`
    Aborted { step: usize },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Exhausted | RunState::Aborted { .. })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Loss recorded at the last step
    pub final_loss: f32,
    pub trajectory: LossTrajectory,
    /// Number of steps taken
    pub steps: usize,
    pub state: RunState,
}

/// Mean squared error between `(N, 1)` predictions and targets.
///
/// # Errors
///
/// Returns [`QuasimotoError::ShapeMismatch`] if the shapes differ.
pub fn mse_loss(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    if pred.dims() != target.dims() {
        return Err(QuasimotoError::shape_mismatch(
            format!("{:?}", target.dims()),
            format!("{:?}", pred.dims()),
        ));
    }
    Ok(candle_nn::loss::mse(pred, target)?)
}

/// One model being fit to one dataset.
pub struct TrainingRun<'a> {
    name: String,
    model: &'a dyn SignalModel,
    input: ModelInput<'a>,
    target: &'a Tensor,
    optimizer: AdamOptimizer,
    config: TrainerConfig,
    trajectory: LossTrajectory,
    state: RunState,
    progress: Option<ProgressBar>,
}

impl<'a> TrainingRun<'a> {
    /// Prepare a run of `model` against `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the dataset cannot supply the
    /// model's coordinates, or the model has nothing to train.
    pub fn new(
        name: impl Into<String>,
        model: &'a dyn SignalModel,
        data: &'a DatasetTensors,
        config: &TrainerConfig,
    ) -> Result<Self> {
        let name = name.into();
        config.validate()?;

        let arity = model.arity();
        if !data.supports(arity) {
            return Err(QuasimotoError::invalid_config(format!(
                "model '{name}' consumes {arity:?} coordinates but the dataset has {} spatial axes",
                data.spatial_dims()
            )));
        }
        let input = data.input(arity)?;

        let params = model.parameters();
        if params.is_empty() {
            return Err(QuasimotoError::training(format!(
                "model '{name}' has no trainable parameters"
            )));
        }
        let optimizer = config.optimizer.build_adam(&params)?;

        let progress = if config.show_progress {
            let pb = ProgressBar::new(config.epochs as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos:>7}/{len:7} {msg}",
                    )?
                    .progress_chars("#>-"),
            );
            pb.set_message(name.clone());
            Some(pb)
        } else {
            None
        };

        tracing::debug!(
            "Prepared run '{}' over {} points with {} trainable parameters",
            name,
            data.len(),
            model.parameter_count()
        );

        Ok(Self {
            name,
            model,
            input,
            target: data.target(),
            optimizer,
            config: config.clone(),
            trajectory: LossTrajectory::with_capacity(config.epochs),
            state: RunState::Initialized,
            progress,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn trajectory(&self) -> &LossTrajectory {
        &self.trajectory
    }

    /// Take one full-batch step and return the loss before the update.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::NonFiniteLoss`] when aborting on a non-finite loss, or
    /// a training error if the run has already finished.
    pub fn step(&mut self) -> Result<f32> {
        if self.state.is_terminal() {
            return Err(QuasimotoError::training(format!(
                "run '{}' already finished in state {:?}",
                self.name, self.state
            )));
        }
        let step = self.trajectory.len();

        let pred = self.model.forward(&self.input)?;
        let loss = mse_loss(&pred, self.target)?;
        let loss_value = loss.to_scalar::<f32>()?;

        if !loss_value.is_finite() {
            if self.config.abort_on_non_finite {
                self.state = RunState::Aborted { step };
                if let Some(pb) = &self.progress {
                    pb.abandon_with_message(format!("{} aborted", self.name));
                }
                tracing::error!("[{}] non-finite loss at step {}", self.name, step);
                return Err(QuasimotoError::NonFiniteLoss {
                    model: self.name.clone(),
                    step,
                    loss: loss_value,
                });
            }
            if self.trajectory.all_finite() {
                tracing::warn!(
                    "[{}] loss became non-finite at step {}; continuing",
                    self.name,
                    step
                );
            }
        }

        self.optimizer.step(&loss)?;
        self.trajectory.push(loss_value);

        if step % self.config.log_every == 0 {
            tracing::info!("[{}] Step {} Loss: {:.6}", self.name, step, loss_value);
        }
        if let Some(pb) = &self.progress {
            pb.set_message(format!("{} {:.6}", self.name, loss_value));
            pb.inc(1);
        }

        let done = self.trajectory.len();
        self.state = if done >= self.config.epochs {
            RunState::Exhausted
        } else {
            RunState::Running { step: done }
        };
        Ok(loss_value)
    }

    /// Step until the budget is spent.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`TrainingRun::step`].
    pub fn run(mut self) -> Result<TrainingOutcome> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("{} complete", self.name));
        }
        self.into_outcome()
    }

    /// Step until the run stops, keeping a run aborted on a non-finite loss.
    ///
    /// An aborted run returns its trajectory so far with state
    /// [`RunState::Aborted`]; its `final_loss` is the offending value.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`TrainingRun::step`] other than
    /// [`QuasimotoError::NonFiniteLoss`].
    pub fn complete(mut self) -> Result<TrainingOutcome> {
        while !self.state.is_terminal() {
            match self.step() {
                Ok(_) => {}
                Err(QuasimotoError::NonFiniteLoss { model, step, loss }) => {
                    tracing::warn!(
                        "[{}] aborted at step {} with loss {}; keeping {} recorded steps",
                        model,
                        step,
                        loss,
                        self.trajectory.len()
                    );
                    if let Some(pb) = &self.progress {
                        pb.abandon_with_message(format!("{} aborted", self.name));
                    }
                    return Ok(self.outcome_with(loss));
                }
                Err(err) => return Err(err),
            }
        }
        if let Some(pb) = &self.progress {
            pb.finish_with_message(format!("{} complete", self.name));
        }
        self.into_outcome()
    }

    fn outcome_with(self, final_loss: f32) -> TrainingOutcome {
        TrainingOutcome {
            final_loss,
            steps: self.trajectory.len(),
            trajectory: self.trajectory,
            state: self.state,
        }
    }

    fn into_outcome(self) -> Result<TrainingOutcome> {
        let final_loss = self
            .trajectory
            .last()
            .ok_or_else(|| QuasimotoError::training(format!("run '{}' took no steps", self.name)))?;
        Ok(TrainingOutcome {
            final_loss,
            steps: self.trajectory.len(),
            trajectory: self.trajectory,
            state: self.state,
        })
    }
}

/// Fits models one after another with a shared configuration.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train `model` on `data` for the configured number of steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be prepared or a step fails.
    pub fn fit(
        &self,
        name: &str,
        model: &dyn SignalModel,
        data: &DatasetTensors,
    ) -> Result<TrainingOutcome> {
        tracing::info!("Training {} ({} steps)", name, self.config.epochs);
        let outcome = TrainingRun::new(name, model, data, &self.config)?.run()?;
        tracing::info!("[{}] Final loss: {:.8}", name, outcome.final_loss);
        Ok(outcome)
    }

    /// Like [`Trainer::fit`], but a run aborted on a non-finite loss comes back as an
    /// outcome in state [`RunState::Aborted`] instead of an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the run cannot be prepared or a step fails for any other reason.
    pub fn fit_complete(
        &self,
        name: &str,
        model: &dyn SignalModel,
        data: &DatasetTensors,
    ) -> Result<TrainingOutcome> {
        tracing::info!("Training {} ({} steps)", name, self.config.epochs);
        let outcome = TrainingRun::new(name, model, data, &self.config)?.complete()?;
        match outcome.state {
            RunState::Aborted { step } => {
                tracing::warn!("[{}] Aborted at step {}", name, step)
            }
            _ => tracing::info!("[{}] Final loss: {:.8}", name, outcome.final_loss),
        }
        Ok(outcome)
    }
}
