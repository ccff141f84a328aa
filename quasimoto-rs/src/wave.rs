//! Quasimoto wave units.
//!
//! A wave unit is a travelling cosine carrier under a Gaussian envelope that drifts with
//! velocity `v`, multiplied by a slowly varying phase modulation:
//!
//! ```text
//! ψ(x, t) = A · cos(k·x − ω·t) · exp(−½((x − v·t)/σ)²) · sin(φ + ε·cos(λ·x))
//! ```
//!
//! The width is stored as `log_sigma` and evaluated as `σ = exp(clamp(log_sigma))`, which
//! keeps σ strictly positive and finite for every real `log_sigma`.
//!
//! [`QuasimotoWave3D`] extends the carrier, envelope and modulation to three spatial axes.

use candle_core::{Device, Tensor, Var};
use rand::Rng;

use crate::error::Result;
use crate::linear::{randn_scalar_var, scalar_var};
use crate::model::{CoordinateArity, ModelInput, Parameter, SignalModel};

/// Lower clamp applied to `log_sigma` before exponentiation.
pub const LOG_SIGMA_MIN: f32 = -20.0;
/// Upper clamp applied to `log_sigma` before exponentiation.
pub const LOG_SIGMA_MAX: f32 = 20.0;

const INITIAL_EPSILON: f32 = 0.1;

/// Envelope width for a given `log_sigma`.
pub fn width_from_log_sigma(log_sigma: f32) -> f32 {
    log_sigma.clamp(LOG_SIGMA_MIN, LOG_SIGMA_MAX).exp()
}

fn width_tensor(log_sigma: &Tensor) -> Result<Tensor> {
    Ok(log_sigma.clamp(LOG_SIGMA_MIN, LOG_SIGMA_MAX)?.exp()?)
}

fn scalar_value(var: &Var) -> Result<f32> {
    Ok(var.as_tensor().squeeze(0)?.to_scalar::<f32>()?)
}

/// Trainable scalars of a 1D wave unit. Each is a one-element Var.
#[derive(Debug, Clone)]
pub struct WaveParams {
    pub amplitude: Var,
    pub wavenumber: Var,
    pub omega: Var,
    pub velocity: Var,
    pub log_sigma: Var,
    pub phi: Var,
    pub epsilon: Var,
    pub lambda: Var,
}

impl WaveParams {
    /// `A = 1`, `log_sigma = 0`, `φ = 0`, `ε = 0.1`; `k`, `ω`, `v`, `λ` from `N(0, 1)`.
    pub fn new<R: Rng>(rng: &mut R, device: &Device) -> Result<Self> {
        Ok(Self {
            amplitude: scalar_var(1.0, device)?,
            wavenumber: randn_scalar_var(rng, device)?,
            omega: randn_scalar_var(rng, device)?,
            velocity: randn_scalar_var(rng, device)?,
            log_sigma: scalar_var(0.0, device)?,
            phi: scalar_var(0.0, device)?,
            epsilon: scalar_var(INITIAL_EPSILON, device)?,
            lambda: randn_scalar_var(rng, device)?,
        })
    }

    fn named(&self) -> [(&'static str, &Var); 8] {
        [
            ("amplitude", &self.amplitude),
            ("wavenumber", &self.wavenumber),
            ("omega", &self.omega),
            ("velocity", &self.velocity),
            ("log_sigma", &self.log_sigma),
            ("phi", &self.phi),
            ("epsilon", &self.epsilon),
            ("lambda", &self.lambda),
        ]
    }
}

/// Single 1D wave unit consuming `(x, t)`.
#[derive(Debug, Clone)]
pub struct QuasimotoWave {
    params: WaveParams,
}

impl QuasimotoWave {
    pub fn new<R: Rng>(rng: &mut R, device: &Device) -> Result<Self> {
        Ok(Self::from_params(WaveParams::new(rng, device)?))
    }

    pub fn from_params(params: WaveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &WaveParams {
        &self.params
    }

    /// Current envelope width σ.
    pub fn width(&self) -> Result<f32> {
        Ok(width_from_log_sigma(scalar_value(&self.params.log_sigma)?))
    }

    /// Evaluate on `(N,)` coordinates, returning `(N,)`.
    pub fn evaluate(&self, x: &Tensor, t: &Tensor) -> Result<Tensor> {
        let p = &self.params;
        let sigma = width_tensor(&p.log_sigma)?;

        let phase = (x.broadcast_mul(&p.wavenumber)? - t.broadcast_mul(&p.omega)?)?;
        let drift = (x - t.broadcast_mul(&p.velocity)?)?.broadcast_div(&sigma)?;
        let envelope = (drift.sqr()? * -0.5)?.exp()?;
        let modulation = x
            .broadcast_mul(&p.lambda)?
            .cos()?
            .broadcast_mul(&p.epsilon)?
            .broadcast_add(&p.phi)?
            .sin()?;

        let wave = ((phase.cos()? * envelope)? * modulation)?;
        Ok(wave.broadcast_mul(&p.amplitude)?)
    }
}

impl SignalModel for QuasimotoWave {
    fn name_hint(&self) -> &'static str {
        "quasimoto-wave"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceTime1D
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceTime1D { x, t } => Ok(self.evaluate(x, t)?.unsqueeze(1)?),
            _ => Err(input.mismatch(CoordinateArity::SpaceTime1D)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.params
            .named()
            .into_iter()
            .map(|(name, var)| Parameter::new(name, var.clone()))
            .collect()
    }
}

/// Trainable scalars of a volumetric wave unit.
#[derive(Debug, Clone)]
pub struct Wave3DParams {
    pub amplitude: Var,
    pub kx: Var,
    pub ky: Var,
    pub kz: Var,
    pub omega: Var,
    pub vx: Var,
    pub vy: Var,
    pub vz: Var,
    pub log_sigma: Var,
    pub phi: Var,
    pub epsilon: Var,
    pub lambda_x: Var,
    pub lambda_y: Var,
    pub lambda_z: Var,
}

impl Wave3DParams {
    /// Same scheme as [`WaveParams::new`], applied per axis.
    pub fn new<R: Rng>(rng: &mut R, device: &Device) -> Result<Self> {
        Ok(Self {
            amplitude: scalar_var(1.0, device)?,
            kx: randn_scalar_var(rng, device)?,
            ky: randn_scalar_var(rng, device)?,
            kz: randn_scalar_var(rng, device)?,
            omega: randn_scalar_var(rng, device)?,
            vx: randn_scalar_var(rng, device)?,
            vy: randn_scalar_var(rng, device)?,
            vz: randn_scalar_var(rng, device)?,
            log_sigma: scalar_var(0.0, device)?,
            phi: scalar_var(0.0, device)?,
            epsilon: scalar_var(INITIAL_EPSILON, device)?,
            lambda_x: randn_scalar_var(rng, device)?,
            lambda_y: randn_scalar_var(rng, device)?,
            lambda_z: randn_scalar_var(rng, device)?,
        })
    }

    fn named(&self) -> [(&'static str, &Var); 14] {
        [
            ("amplitude", &self.amplitude),
            ("kx", &self.kx),
            ("ky", &self.ky),
            ("kz", &self.kz),
            ("omega", &self.omega),
            ("vx", &self.vx),
            ("vy", &self.vy),
            ("vz", &self.vz),
            ("log_sigma", &self.log_sigma),
            ("phi", &self.phi),
            ("epsilon", &self.epsilon),
            ("lambda_x", &self.lambda_x),
            ("lambda_y", &self.lambda_y),
            ("lambda_z", &self.lambda_z),
        ]
    }
}

/// Single volumetric wave unit consuming `(x, y, z, t)`.
#[derive(Debug, Clone)]
pub struct QuasimotoWave3D {
    params: Wave3DParams,
}

impl QuasimotoWave3D {
    pub fn new<R: Rng>(rng: &mut R, device: &Device) -> Result<Self> {
        Ok(Self::from_params(Wave3DParams::new(rng, device)?))
    }

    pub fn from_params(params: Wave3DParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Wave3DParams {
        &self.params
    }

    /// Current envelope width σ.
    pub fn width(&self) -> Result<f32> {
        Ok(width_from_log_sigma(scalar_value(&self.params.log_sigma)?))
    }

    /// Evaluate on `(N,)` coordinates, returning `(N,)`.
    ///
    /// Phase `kx·x + ky·y + kz·z − ω·t`, isotropic envelope around the drifting centre
    /// `(vx·t, vy·t, vz·t)`, modulation `sin(φ + ε·cos(λx·x + λy·y + λz·z))`.
    pub fn evaluate(&self, x: &Tensor, y: &Tensor, z: &Tensor, t: &Tensor) -> Result<Tensor> {
        let p = &self.params;
        let sigma = width_tensor(&p.log_sigma)?;

        let phase = (((x.broadcast_mul(&p.kx)? + y.broadcast_mul(&p.ky)?)?
            + z.broadcast_mul(&p.kz)?)?
            - t.broadcast_mul(&p.omega)?)?;

        let dx = (x - t.broadcast_mul(&p.vx)?)?;
        let dy = (y - t.broadcast_mul(&p.vy)?)?;
        let dz = (z - t.broadcast_mul(&p.vz)?)?;
        let dist2 = ((dx.sqr()? + dy.sqr()?)? + dz.sqr()?)?;
        let envelope = (dist2.broadcast_div(&sigma.sqr()?)? * -0.5)?.exp()?;

        let spatial = ((x.broadcast_mul(&p.lambda_x)? + y.broadcast_mul(&p.lambda_y)?)?
            + z.broadcast_mul(&p.lambda_z)?)?;
        let modulation = spatial
            .cos()?
            .broadcast_mul(&p.epsilon)?
            .broadcast_add(&p.phi)?
            .sin()?;

        let wave = ((phase.cos()? * envelope)? * modulation)?;
        Ok(wave.broadcast_mul(&p.amplitude)?)
    }
}

impl SignalModel for QuasimotoWave3D {
    fn name_hint(&self) -> &'static str {
        "quasimoto-wave-3d"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceTime3D
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceTime3D { x, y, z, t } => Ok(self.evaluate(x, y, z, t)?.unsqueeze(1)?),
            _ => Err(input.mismatch(CoordinateArity::SpaceTime3D)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.params
            .named()
            .into_iter()
            .map(|(name, var)| Parameter::new(name, var.clone()))
            .collect()
    }
}
