//! Adam optimizer over a model's parameter handles.

use candle_core::Tensor;
use candle_nn::{Optimizer, ParamsAdamW};
use serde::{Deserialize, Serialize};

use crate::error::{QuasimotoError, Result};
use crate::model::Parameter;

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Learning rate
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Beta1 for Adam
    #[serde(default = "default_beta1")]
    pub beta1: f64,
    /// Beta2 for Adam
    #[serde(default = "default_beta2")]
    pub beta2: f64,
    /// Epsilon for numerical stability
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Decoupled weight decay; zero gives plain Adam
    #[serde(default)]
    pub weight_decay: f64,
}

fn default_learning_rate() -> f64 {
    1e-3
}
fn default_beta1() -> f64 {
    0.9
}
fn default_beta2() -> f64 {
    0.999
}
fn default_eps() -> f64 {
    1e-8
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            beta1: default_beta1(),
            beta2: default_beta2(),
            eps: default_eps(),
            weight_decay: 0.0,
        }
    }
}

impl OptimizerConfig {
    /// Check that the hyperparameters describe a usable Adam.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] on out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(QuasimotoError::invalid_config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(QuasimotoError::invalid_config(format!(
                    "{name} must be in [0, 1), got {beta}"
                )));
            }
        }
        if !(self.eps > 0.0) {
            return Err(QuasimotoError::invalid_config("eps must be positive"));
        }
        if self.weight_decay < 0.0 {
            return Err(QuasimotoError::invalid_config(
                "weight_decay must be non-negative",
            ));
        }
        Ok(())
    }

    /// Create an Adam optimizer over `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if the optimizer cannot be created.
    pub fn build_adam(&self, params: &[Parameter]) -> Result<AdamOptimizer> {
        let vars = params.iter().map(|p| p.var().clone()).collect();
        let adam_params = ParamsAdamW {
            lr: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            weight_decay: self.weight_decay,
        };

        let opt = candle_nn::AdamW::new(vars, adam_params)
            .map_err(|e| QuasimotoError::training(format!("failed to create Adam: {e}")))?;

        Ok(AdamOptimizer { inner: opt })
    }
}

/// Adam optimizer wrapper.
pub struct AdamOptimizer {
    inner: candle_nn::AdamW,
}

impl AdamOptimizer {
    /// Backpropagate `loss` and apply one update.
    ///
    /// # Errors
    ///
    /// Returns an error if the step fails.
    pub fn step(&mut self, loss: &Tensor) -> Result<()> {
        self.inner
            .backward_step(loss)
            .map_err(|e| QuasimotoError::training(format!("optimizer step failed: {e}")))
    }

    /// Get current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.inner.learning_rate()
    }
}
