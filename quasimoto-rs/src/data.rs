//! Synthetic benchmark signals.
//!
//! Two deterministic ground-truth generators:
//! - [`generate_1d`] - the "glitchy chirp": a Gaussian-damped chirp with a short
//!   high-frequency anomaly injected into the middle of the sequence
//! - [`generate_volumetric`] - a Gaussian bump over a dense 3D grid, modulated by
//!   per-axis sinusoids, sampled at a single time snapshot
//!
//! Generators produce host-side [`Dataset`] values. [`Dataset::to_tensors`] moves them
//! onto a device once per benchmark so every model trains on the same tensors.
//!
//! # Example
//!
//! ```
//! use quasimoto_rs::data::{generate_1d, generate_volumetric};
//!
//! let chirp = generate_1d();
//! assert_eq!(chirp.len(), 1000);
//! assert_eq!(chirp.glitch_range(), Some(500..550));
//!
//! let volume = generate_volumetric(10);
//! assert_eq!(volume.len(), 1000);
//! assert_eq!(volume.spatial_dims(), 3);
//! ```

use std::ops::Range;

use candle_core::{Device, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::{QuasimotoError, Result};
use crate::model::{CoordinateArity, ModelInput};

/// Placement and shape of the injected high-frequency anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    /// Start of the glitch as a fraction of the sequence length
    pub start_fraction: f64,
    /// End (exclusive) of the glitch as a fraction of the sequence length
    pub end_fraction: f64,
    /// Amplitude of the added sine
    pub amplitude: f32,
    /// Angular frequency of the added sine
    pub frequency: f32,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            start_fraction: 0.5,
            end_fraction: 0.55,
            amplitude: 0.5,
            frequency: 20.0,
        }
    }
}

impl GlitchConfig {
    /// Index range covered by the glitch for a sequence of `len` points.
    pub fn range(&self, len: usize) -> Range<usize> {
        let start = ((self.start_fraction * len as f64) as usize).min(len);
        let end = ((self.end_fraction * len as f64) as usize).clamp(start, len);
        start..end
    }
}

/// Configuration for the 1D glitchy chirp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChirpConfig {
    /// Number of evenly spaced sample points
    #[serde(default = "default_chirp_points")]
    pub points: usize,
    /// Lower end of the sampled interval
    #[serde(default = "default_chirp_start")]
    pub start: f64,
    /// Upper end of the sampled interval
    #[serde(default = "default_chirp_end")]
    pub end: f64,
    /// Injected anomaly
    #[serde(default)]
    pub glitch: GlitchConfig,
}

fn default_chirp_points() -> usize {
    1000
}
fn default_chirp_start() -> f64 {
    -10.0
}
fn default_chirp_end() -> f64 {
    10.0
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            points: default_chirp_points(),
            start: default_chirp_start(),
            end: default_chirp_end(),
            glitch: GlitchConfig::default(),
        }
    }
}

/// Configuration for the volumetric (3D space + time) field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Points per axis; the grid holds `grid_size³` samples
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    /// Half-width of the cubic interval `[-extent, extent]³`
    #[serde(default = "default_extent")]
    pub extent: f64,
}

fn default_grid_size() -> usize {
    20
}
fn default_extent() -> f64 {
    5.0
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            grid_size: default_grid_size(),
            extent: default_extent(),
        }
    }
}

/// Ordered coordinate tuples paired with target values.
///
/// Every axis, the time vector, and the target vector have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    axes: Vec<Vec<f32>>,
    time: Vec<f32>,
    target: Vec<f32>,
    glitch: Option<Range<usize>>,
}

impl Dataset {
    /// Create a dataset, checking that all sequences have equal length.
    pub fn new(
        name: impl Into<String>,
        axes: Vec<Vec<f32>>,
        time: Vec<f32>,
        target: Vec<f32>,
    ) -> Result<Self> {
        if axes.is_empty() {
            return Err(QuasimotoError::invalid_config(
                "dataset needs at least one spatial axis",
            ));
        }
        let len = target.len();
        for (i, axis) in axes.iter().enumerate() {
            if axis.len() != len {
                return Err(QuasimotoError::shape_mismatch(
                    format!("axis {i} of length {len}"),
                    axis.len().to_string(),
                ));
            }
        }
        if time.len() != len {
            return Err(QuasimotoError::shape_mismatch(
                format!("time of length {len}"),
                time.len().to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            axes,
            time,
            target,
            glitch: None,
        })
    }

    fn with_glitch(mut self, range: Range<usize>) -> Self {
        self.glitch = Some(range);
        self
    }

    /// Dataset label used in logs and artifact titles.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Whether the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Number of spatial axes (1 for the chirp, 3 for the volume).
    pub fn spatial_dims(&self) -> usize {
        self.axes.len()
    }

    /// Coordinates along spatial axis `i`.
    pub fn axis(&self, i: usize) -> Option<&[f32]> {
        self.axes.get(i).map(Vec::as_slice)
    }

    /// Time coordinate of each sample.
    pub fn time(&self) -> &[f32] {
        &self.time
    }

    /// Ground-truth values.
    pub fn target(&self) -> &[f32] {
        &self.target
    }

    /// Indices carrying the injected anomaly, if any.
    pub fn glitch_range(&self) -> Option<Range<usize>> {
        self.glitch.clone()
    }

    /// Materialize the dataset as tensors on `device`.
    pub fn to_tensors(&self, device: &Device) -> Result<DatasetTensors> {
        let len = self.len();
        let axes = self
            .axes
            .iter()
            .map(|axis| Tensor::from_slice(axis.as_slice(), len, device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let points = Tensor::stack(&axes, 1)?;
        let time = Tensor::from_slice(self.time.as_slice(), len, device)?;
        let target = Tensor::from_slice(self.target.as_slice(), (len, 1), device)?;

        Ok(DatasetTensors {
            axes,
            points,
            time,
            target,
        })
    }
}

/// Device-resident view of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct DatasetTensors {
    /// One `(N,)` tensor per spatial axis
    axes: Vec<Tensor>,
    /// All spatial axes stacked: `(N, d)`
    points: Tensor,
    /// `(N,)`
    time: Tensor,
    /// `(N, 1)`
    target: Tensor,
}

impl DatasetTensors {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.dims()[0]
    }

    /// Whether the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of spatial axes.
    pub fn spatial_dims(&self) -> usize {
        self.axes.len()
    }

    /// Targets, shape `(N, 1)`.
    pub fn target(&self) -> &Tensor {
        &self.target
    }

    /// Whether coordinates for `arity` can be produced from this dataset.
    pub fn supports(&self, arity: CoordinateArity) -> bool {
        match arity {
            CoordinateArity::SpaceTime1D => self.axes.len() == 1,
            CoordinateArity::SpaceTime3D => self.axes.len() == 3,
            CoordinateArity::SpaceOnly => !self.axes.is_empty(),
        }
    }

    /// Build the model input matching `arity`.
    pub fn input(&self, arity: CoordinateArity) -> Result<ModelInput<'_>> {
        match (arity, self.axes.as_slice()) {
            (CoordinateArity::SpaceTime1D, [x]) => Ok(ModelInput::SpaceTime1D { x, t: &self.time }),
            (CoordinateArity::SpaceTime3D, [x, y, z]) => Ok(ModelInput::SpaceTime3D {
                x,
                y,
                z,
                t: &self.time,
            }),
            (CoordinateArity::SpaceOnly, _) => Ok(ModelInput::SpaceOnly {
                points: &self.points,
            }),
            _ => Err(QuasimotoError::shape_mismatch(
                format!("coordinates for {arity:?}"),
                format!("{} spatial axes", self.axes.len()),
            )),
        }
    }
}

/// `n` evenly spaced values over `[start, end]`.
///
/// The lower half is measured from `start` and the upper half from `end`, so on a
/// symmetric interval `lin[n - 1 - i] == -lin[i]` holds exactly.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start as f32],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let halfway = n / 2;
            (0..n)
                .map(|i| {
                    if i < halfway {
                        (start + step * i as f64) as f32
                    } else {
                        (end - step * (n - 1 - i) as f64) as f32
                    }
                })
                .collect()
        }
    }
}

/// Damped chirp without the anomaly: `sin(0.5·x²)·exp(-0.1·x²)`.
pub fn chirp(x: f32) -> f32 {
    let x2 = x * x;
    (0.5 * x2).sin() * (-0.1 * x2).exp()
}

/// Volumetric field: `exp(-0.5·r²)·sin(2x)·cos(2y)·sin(2z)`.
///
/// Odd under `x → -x`, even under `y → -y`, odd under `z → -z`.
pub fn volumetric_field(x: f32, y: f32, z: f32) -> f32 {
    let r2 = x * x + y * y + z * z;
    (-0.5 * r2).exp() * (2.0 * x).sin() * (2.0 * y).cos() * (2.0 * z).sin()
}

/// The default glitchy chirp: 1000 points over `[-10, 10]`, glitch on `[500, 550)`.
pub fn generate_1d() -> Dataset {
    generate_1d_with(&ChirpConfig::default())
}

/// Glitchy chirp with explicit configuration. Time is zero everywhere.
pub fn generate_1d_with(config: &ChirpConfig) -> Dataset {
    let x = linspace(config.start, config.end, config.points);
    let glitch = config.glitch.range(x.len());

    let target: Vec<f32> = x
        .iter()
        .enumerate()
        .map(|(i, &xi)| {
            let base = chirp(xi);
            if glitch.contains(&i) {
                base + config.glitch.amplitude * (config.glitch.frequency * xi).sin()
            } else {
                base
            }
        })
        .collect();
    let time = vec![0.0; x.len()];

    Dataset {
        name: "glitchy-chirp".into(),
        axes: vec![x],
        time,
        target,
        glitch: None,
    }
    .with_glitch(glitch)
}

/// Volumetric field on a `grid_size³` grid over `[-5, 5]³`.
pub fn generate_volumetric(grid_size: usize) -> Dataset {
    generate_volumetric_with(&VolumeConfig {
        grid_size,
        ..VolumeConfig::default()
    })
}

/// Volumetric field with explicit configuration.
///
/// The grid uses `ij` indexing flattened row-major: sample `i·g² + j·g + k` sits at
/// `(lin[i], lin[j], lin[k])`. Time is zero everywhere.
pub fn generate_volumetric_with(config: &VolumeConfig) -> Dataset {
    let g = config.grid_size;
    let lin = linspace(-config.extent, config.extent, g);
    let total = g * g * g;

    let mut xs = Vec::with_capacity(total);
    let mut ys = Vec::with_capacity(total);
    let mut zs = Vec::with_capacity(total);
    let mut target = Vec::with_capacity(total);
    for &x in &lin {
        for &y in &lin {
            for &z in &lin {
                xs.push(x);
                ys.push(y);
                zs.push(z);
                target.push(volumetric_field(x, y, z));
            }
        }
    }

    Dataset {
        name: "volumetric".into(),
        axes: vec![xs, ys, zs],
        time: vec![0.0; total],
        target,
        glitch: None,
    }
}
