//! Ensembles of wave units behind a trainable affine head.

use candle_core::{Device, Tensor};
use candle_nn::Module;
use rand::Rng;

use crate::error::{QuasimotoError, Result};
use crate::linear::Affine;
use crate::model::{CoordinateArity, ModelInput, Parameter, SignalModel};
use crate::wave::{QuasimotoWave, QuasimotoWave3D};

fn check_width(width: usize) -> Result<()> {
    if width == 0 {
        return Err(QuasimotoError::invalid_config(
            "ensemble width must be at least 1",
        ));
    }
    Ok(())
}

fn scoped_parameters(units: Vec<Vec<Parameter>>, head: &Affine) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = units
        .into_iter()
        .enumerate()
        .flat_map(|(i, unit)| {
            let scope = format!("waves.{i}");
            unit.into_iter()
                .map(move |p| p.scoped(&scope))
                .collect::<Vec<_>>()
        })
        .collect();
    params.extend(head.parameters("head"));
    params
}

/// `n` independent 1D wave units mixed by an affine head `n → 1`.
#[derive(Debug, Clone)]
pub struct QuasimotoEnsemble {
    waves: Vec<QuasimotoWave>,
    head: Affine,
}

impl QuasimotoEnsemble {
    /// Create an ensemble of `width` freshly initialized units.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] if `width` is zero.
    pub fn new<R: Rng>(width: usize, rng: &mut R, device: &Device) -> Result<Self> {
        check_width(width)?;
        let waves = (0..width)
            .map(|_| QuasimotoWave::new(rng, device))
            .collect::<Result<Vec<_>>>()?;
        let head = Affine::new(width, 1, rng, device)?;
        Ok(Self { waves, head })
    }

    /// Number of wave units.
    pub fn width(&self) -> usize {
        self.waves.len()
    }

    pub fn waves(&self) -> &[QuasimotoWave] {
        &self.waves
    }

    pub fn head(&self) -> &Affine {
        &self.head
    }

    /// Per-unit outputs stacked as columns, shape `(N, n)`.
    pub fn features(&self, x: &Tensor, t: &Tensor) -> Result<Tensor> {
        let columns = self
            .waves
            .iter()
            .map(|w| w.evaluate(x, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(&columns, 1)?)
    }
}

impl SignalModel for QuasimotoEnsemble {
    fn name_hint(&self) -> &'static str {
        "quasimoto-ensemble"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceTime1D
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceTime1D { x, t } => Ok(self.head.forward(&self.features(x, t)?)?),
            _ => Err(input.mismatch(CoordinateArity::SpaceTime1D)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let units = self.waves.iter().map(SignalModel::parameters).collect();
        scoped_parameters(units, &self.head)
    }
}

/// `n` independent volumetric wave units mixed by an affine head `n → 1`.
#[derive(Debug, Clone)]
pub struct QuasimotoEnsemble3D {
    waves: Vec<QuasimotoWave3D>,
    head: Affine,
}

impl QuasimotoEnsemble3D {
    /// Create an ensemble of `width` freshly initialized units.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] if `width` is zero.
    pub fn new<R: Rng>(width: usize, rng: &mut R, device: &Device) -> Result<Self> {
        check_width(width)?;
        let waves = (0..width)
            .map(|_| QuasimotoWave3D::new(rng, device))
            .collect::<Result<Vec<_>>>()?;
        let head = Affine::new(width, 1, rng, device)?;
        Ok(Self { waves, head })
    }

    pub fn width(&self) -> usize {
        self.waves.len()
    }

    pub fn waves(&self) -> &[QuasimotoWave3D] {
        &self.waves
    }

    /// Per-unit outputs stacked as columns, shape `(N, n)`.
    pub fn features(&self, x: &Tensor, y: &Tensor, z: &Tensor, t: &Tensor) -> Result<Tensor> {
        let columns = self
            .waves
            .iter()
            .map(|w| w.evaluate(x, y, z, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(&columns, 1)?)
    }
}

impl SignalModel for QuasimotoEnsemble3D {
    fn name_hint(&self) -> &'static str {
        "quasimoto-ensemble-3d"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceTime3D
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceTime3D { x, y, z, t } => {
                Ok(self.head.forward(&self.features(x, y, z, t)?)?)
            }
            _ => Err(input.mismatch(CoordinateArity::SpaceTime3D)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let units = self.waves.iter().map(SignalModel::parameters).collect();
        scoped_parameters(units, &self.head)
    }
}
