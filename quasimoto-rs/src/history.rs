//! Per-step loss trajectories and window statistics.
//!
//! A [`LossTrajectory`] is append-only: the trainer pushes one value per optimizer step.
//!
//! # Example
//!
//! ```
//! use quasimoto_rs::history::LossTrajectory;
//!
//! let mut trajectory = LossTrajectory::new();
//! for loss in [1.0, 0.8, 0.5, 0.3, 0.2] {
//!     trajectory.push(loss);
//! }
//!
//! assert_eq!(trajectory.initial(), Some(1.0));
//! assert_eq!(trajectory.last(), Some(0.2));
//! assert!(trajectory.is_improving(0.2));
//! ```

use serde::{Deserialize, Serialize};

/// Statistical summary of a window of losses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossStatistics {
    /// Number of measurements in window.
    pub count: usize,
    /// Mean loss value.
    pub mean: f32,
    /// Minimum loss value.
    pub min: f32,
    /// Maximum loss value.
    pub max: f32,
}

impl LossStatistics {
    fn from_window(window: &[f32]) -> Option<Self> {
        if window.is_empty() {
            return None;
        }
        let sum: f64 = window.iter().map(|&v| f64::from(v)).sum();
        let (min, max) = window
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Some(Self {
            count: window.len(),
            mean: (sum / window.len() as f64) as f32,
            min,
            max,
        })
    }
}

/// Loss value recorded at every training step, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LossTrajectory {
    losses: Vec<f32>,
}

impl LossTrajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(steps: usize) -> Self {
        Self {
            losses: Vec::with_capacity(steps),
        }
    }

    /// Append the loss of the next step.
    pub fn push(&mut self, loss: f32) {
        self.losses.push(loss);
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.losses
    }

    /// Loss of the first step.
    pub fn initial(&self) -> Option<f32> {
        self.losses.first().copied()
    }

    /// Loss of the latest step.
    pub fn last(&self) -> Option<f32> {
        self.losses.last().copied()
    }

    /// Smallest loss seen. NaN entries are skipped.
    pub fn min(&self) -> Option<f32> {
        self.losses
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(f32::min)
    }

    pub fn all_finite(&self) -> bool {
        self.losses.iter().all(|v| v.is_finite())
    }

    /// Index of the first NaN or infinite entry.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.losses.iter().position(|v| !v.is_finite())
    }

    fn window_len(&self, fraction: f64) -> usize {
        let len = self.losses.len();
        ((len as f64 * fraction).round() as usize).clamp(1, len.max(1))
    }

    /// Statistics over the first `fraction` of steps (at least one step).
    pub fn head(&self, fraction: f64) -> Option<LossStatistics> {
        let n = self.window_len(fraction).min(self.losses.len());
        LossStatistics::from_window(&self.losses[..n])
    }

    /// Statistics over the last `fraction` of steps (at least one step).
    pub fn tail(&self, fraction: f64) -> Option<LossStatistics> {
        let len = self.losses.len();
        let n = self.window_len(fraction).min(len);
        LossStatistics::from_window(&self.losses[len - n..])
    }

    /// Mean loss over the first `fraction` of steps.
    pub fn head_mean(&self, fraction: f64) -> Option<f32> {
        self.head(fraction).map(|s| s.mean)
    }

    /// Mean loss over the last `fraction` of steps.
    pub fn tail_mean(&self, fraction: f64) -> Option<f32> {
        self.tail(fraction).map(|s| s.mean)
    }

    /// Whether the tail window's mean is no worse than the head window's.
    pub fn is_improving(&self, fraction: f64) -> bool {
        match (self.head_mean(fraction), self.tail_mean(fraction)) {
            (Some(head), Some(tail)) => tail <= head,
            _ => false,
        }
    }

    /// Statistics over the whole trajectory.
    pub fn statistics(&self) -> Option<LossStatistics> {
        LossStatistics::from_window(&self.losses)
    }
}

impl From<Vec<f32>> for LossTrajectory {
    fn from(losses: Vec<f32>) -> Self {
        Self { losses }
    }
}
