//! Common model interface.
//!
//! Every model declares which coordinates it consumes through a [`CoordinateArity`] tag,
//! and the harness hands it the matching [`ModelInput`] variant. Trainable state is
//! exposed as a flat list of named [`Parameter`] handles.

use candle_core::{Device, Tensor, Var};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ensemble::{QuasimotoEnsemble, QuasimotoEnsemble3D};
use crate::error::{QuasimotoError, Result};
use crate::fourier::RandomFourierFeatures;
use crate::siren::SirenNetwork;
use crate::wave::{QuasimotoWave, QuasimotoWave3D};

/// Coordinate signature a model consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateArity {
    /// One spatial coordinate plus time: `(x, t)`
    SpaceTime1D,
    /// Three spatial coordinates plus time: `(x, y, z, t)`
    SpaceTime3D,
    /// Stacked spatial coordinates only: `(N, d)`
    SpaceOnly,
}

/// Borrowed coordinates for one forward pass.
///
/// Per-axis tensors have shape `(N,)`; `points` has shape `(N, d)`.
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    SpaceTime1D {
        x: &'a Tensor,
        t: &'a Tensor,
    },
    SpaceTime3D {
        x: &'a Tensor,
        y: &'a Tensor,
        z: &'a Tensor,
        t: &'a Tensor,
    },
    SpaceOnly {
        points: &'a Tensor,
    },
}

impl ModelInput<'_> {
    /// Arity tag of this input.
    pub fn arity(&self) -> CoordinateArity {
        match self {
            ModelInput::SpaceTime1D { .. } => CoordinateArity::SpaceTime1D,
            ModelInput::SpaceTime3D { .. } => CoordinateArity::SpaceTime3D,
            ModelInput::SpaceOnly { .. } => CoordinateArity::SpaceOnly,
        }
    }

    /// Number of sample points.
    pub fn len(&self) -> usize {
        match self {
            ModelInput::SpaceTime1D { t, .. } | ModelInput::SpaceTime3D { t, .. } => t.dims()[0],
            ModelInput::SpaceOnly { points } => points.dims()[0],
        }
    }

    /// Whether the input holds no sample points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Error for a model expecting `expected` but handed this input.
    pub(crate) fn mismatch(&self, expected: CoordinateArity) -> QuasimotoError {
        QuasimotoError::ArityMismatch {
            expected,
            got: self.arity(),
        }
    }
}

/// Named handle to a trainable tensor.
///
/// Names are dotted paths such as `waves.3.wavenumber` or `head.weight`.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    var: Var,
}

impl Parameter {
    pub fn new(name: impl Into<String>, var: Var) -> Self {
        Self {
            name: name.into(),
            var,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    /// Number of scalar entries.
    pub fn elem_count(&self) -> usize {
        self.var.elem_count()
    }

    /// Current values, flattened.
    pub fn values(&self) -> Result<Vec<f32>> {
        Ok(self.var.flatten_all()?.to_vec1()?)
    }

    /// Prefix the name with `scope.`.
    pub(crate) fn scoped(self, scope: &str) -> Self {
        Self {
            name: format!("{scope}.{}", self.name),
            var: self.var,
        }
    }
}

/// A parameterized function from coordinates to one prediction per point.
pub trait SignalModel {
    /// Short family label used in logs.
    fn name_hint(&self) -> &'static str;

    /// Coordinates this model consumes.
    fn arity(&self) -> CoordinateArity;

    /// Predict every point of `input`. Output shape `(N, 1)`.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::ArityMismatch`] when `input` has the wrong variant.
    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor>;

    /// Trainable parameters. Frozen buffers are not included.
    fn parameters(&self) -> Vec<Parameter>;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(Parameter::elem_count).sum()
    }
}

fn default_ensemble_width() -> usize {
    16
}
fn default_hidden() -> usize {
    64
}
fn default_siren_layers() -> usize {
    2
}
fn default_w0() -> f64 {
    30.0
}
fn default_features() -> usize {
    128
}
fn default_bandwidth() -> f64 {
    5.0
}

/// Model family and hyperparameters, as written in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// A single 1D wave unit
    Wave,
    /// A single volumetric wave unit
    #[serde(rename = "wave3d")]
    Wave3D,
    /// `width` 1D wave units behind an affine head
    WaveEnsemble {
        #[serde(default = "default_ensemble_width")]
        width: usize,
    },
    /// `width` volumetric wave units behind an affine head
    #[serde(rename = "wave_ensemble3d")]
    WaveEnsemble3D {
        #[serde(default = "default_ensemble_width")]
        width: usize,
    },
    /// Sine-activated MLP
    Siren {
        #[serde(default = "default_hidden")]
        hidden: usize,
        /// Number of sine layers
        #[serde(default = "default_siren_layers")]
        layers: usize,
        #[serde(default = "default_w0")]
        w0: f64,
    },
    /// Frozen random projection with a trainable readout
    RandomFourier {
        #[serde(default = "default_features")]
        features: usize,
        #[serde(default = "default_bandwidth")]
        bandwidth: f64,
    },
}

impl ModelSpec {
    /// SIREN with the benchmark defaults (two 64-wide layers, `w0 = 30`).
    pub fn siren() -> Self {
        Self::Siren {
            hidden: default_hidden(),
            layers: default_siren_layers(),
            w0: default_w0(),
        }
    }

    /// Random Fourier features with the benchmark defaults (128 features, bandwidth 5).
    pub fn random_fourier() -> Self {
        Self::RandomFourier {
            features: default_features(),
            bandwidth: default_bandwidth(),
        }
    }

    /// Coordinates the built model will consume.
    pub fn arity(&self) -> CoordinateArity {
        match self {
            ModelSpec::Wave | ModelSpec::WaveEnsemble { .. } => CoordinateArity::SpaceTime1D,
            ModelSpec::Wave3D | ModelSpec::WaveEnsemble3D { .. } => CoordinateArity::SpaceTime3D,
            ModelSpec::Siren { .. } | ModelSpec::RandomFourier { .. } => {
                CoordinateArity::SpaceOnly
            }
        }
    }

    /// Check hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] for empty layers or non-positive scales.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ModelSpec::Wave | ModelSpec::Wave3D => Ok(()),
            ModelSpec::WaveEnsemble { width } | ModelSpec::WaveEnsemble3D { width } => {
                if width == 0 {
                    return Err(QuasimotoError::invalid_config(
                        "ensemble width must be at least 1",
                    ));
                }
                Ok(())
            }
            ModelSpec::Siren { hidden, layers, w0 } => {
                if hidden == 0 || layers == 0 {
                    return Err(QuasimotoError::invalid_config(
                        "siren needs at least one hidden layer of width >= 1",
                    ));
                }
                if !(w0.is_finite() && w0 > 0.0) {
                    return Err(QuasimotoError::invalid_config(format!(
                        "siren w0 must be positive, got {w0}"
                    )));
                }
                Ok(())
            }
            ModelSpec::RandomFourier {
                features,
                bandwidth,
            } => {
                if features == 0 {
                    return Err(QuasimotoError::invalid_config(
                        "random fourier features must be at least 1",
                    ));
                }
                if !(bandwidth.is_finite() && bandwidth > 0.0) {
                    return Err(QuasimotoError::invalid_config(format!(
                        "random fourier bandwidth must be positive, got {bandwidth}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Whether a dataset with `spatial_dims` axes can feed this model.
    pub fn supports_dims(&self, spatial_dims: usize) -> bool {
        match self.arity() {
            CoordinateArity::SpaceTime1D => spatial_dims == 1,
            CoordinateArity::SpaceTime3D => spatial_dims == 3,
            CoordinateArity::SpaceOnly => spatial_dims >= 1,
        }
    }
}

/// Build a freshly initialized model for a dataset with `spatial_dims` axes.
///
/// # Errors
///
/// Returns [`QuasimotoError::InvalidConfig`] if `spec` is invalid or cannot consume
/// the dataset's coordinates.
pub fn build_model<R: Rng>(
    spec: &ModelSpec,
    spatial_dims: usize,
    rng: &mut R,
    device: &Device,
) -> Result<Box<dyn SignalModel>> {
    spec.validate()?;
    if !spec.supports_dims(spatial_dims) {
        return Err(QuasimotoError::invalid_config(format!(
            "model {spec:?} cannot consume a dataset with {spatial_dims} spatial axes"
        )));
    }

    let model: Box<dyn SignalModel> = match *spec {
        ModelSpec::Wave => Box::new(QuasimotoWave::new(rng, device)?),
        ModelSpec::Wave3D => Box::new(QuasimotoWave3D::new(rng, device)?),
        ModelSpec::WaveEnsemble { width } => Box::new(QuasimotoEnsemble::new(width, rng, device)?),
        ModelSpec::WaveEnsemble3D { width } => {
            Box::new(QuasimotoEnsemble3D::new(width, rng, device)?)
        }
        ModelSpec::Siren { hidden, layers, w0 } => Box::new(SirenNetwork::new(
            spatial_dims,
            hidden,
            layers,
            w0,
            rng,
            device,
        )?),
        ModelSpec::RandomFourier {
            features,
            bandwidth,
        } => Box::new(RandomFourierFeatures::new(
            spatial_dims,
            features,
            bandwidth,
            rng,
            device,
        )?),
    };

    debug!(
        "Built {} model with {} trainable parameters",
        model.name_hint(),
        model.parameter_count()
    );
    Ok(model)
}
