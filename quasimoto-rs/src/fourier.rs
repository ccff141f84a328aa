//! Random Fourier feature baseline.
//!
//! Coordinates are projected through a frozen Gaussian matrix `B`, mapped to
//! `[sin(xB), cos(xB)]`, and read out by a trainable affine layer. Only the readout is
//! trained.

use candle_core::{Device, Tensor};
use candle_nn::Module;
use rand::Rng;

use crate::error::{QuasimotoError, Result};
use crate::linear::{normal_tensor, Affine};
use crate::model::{CoordinateArity, ModelInput, Parameter, SignalModel};

/// Fixed random projection followed by a trainable readout `2F → 1`.
#[derive(Debug, Clone)]
pub struct RandomFourierFeatures {
    /// Frozen projection, shape `(d, F)`
    projection: Tensor,
    readout: Affine,
    bandwidth: f64,
}

impl RandomFourierFeatures {
    /// Draw `B ~ N(0, 1)·bandwidth` with shape `(input_dim, features)`.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] if either dimension is zero.
    pub fn new<R: Rng>(
        input_dim: usize,
        features: usize,
        bandwidth: f64,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        if input_dim == 0 || features == 0 {
            return Err(QuasimotoError::invalid_config(format!(
                "random fourier features need input_dim >= 1 and features >= 1, got {input_dim} and {features}"
            )));
        }
        let projection = normal_tensor((input_dim, features), bandwidth, rng, device)?;
        let readout = Affine::new(2 * features, 1, rng, device)?;
        Ok(Self {
            projection,
            readout,
            bandwidth,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.projection.dims()[0]
    }

    pub fn num_features(&self) -> usize {
        self.projection.dims()[1]
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// The frozen projection matrix.
    pub fn projection(&self) -> &Tensor {
        &self.projection
    }

    /// Sine and cosine features, shape `(N, 2F)`.
    pub fn features(&self, points: &Tensor) -> Result<Tensor> {
        let (_, dim) = points.dims2()?;
        if dim != self.input_dim() {
            return Err(QuasimotoError::shape_mismatch(
                format!("points with {} columns", self.input_dim()),
                format!("{dim} columns"),
            ));
        }
        let projected = points.matmul(&self.projection)?;
        Ok(Tensor::cat(&[projected.sin()?, projected.cos()?], 1)?)
    }
}

impl SignalModel for RandomFourierFeatures {
    fn name_hint(&self) -> &'static str {
        "random-fourier"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceOnly
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceOnly { points } => Ok(self.readout.forward(&self.features(points)?)?),
            _ => Err(input.mismatch(CoordinateArity::SpaceOnly)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.readout.parameters("readout")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rff_shapes() {
        let device = Device::Cpu;
        let rff =
            RandomFourierFeatures::new(3, 16, 5.0, &mut ChaCha8Rng::seed_from_u64(0), &device)
                .unwrap();
        let points = Tensor::randn(0.0f32, 1.0, (10, 3), &device).unwrap();

        assert_eq!(rff.features(&points).unwrap().dims(), &[10, 32]);
        let out = rff.forward(&ModelInput::SpaceOnly { points: &points }).unwrap();
        assert_eq!(out.dims(), &[10, 1]);
    }

    #[test]
    fn test_rff_only_readout_is_trainable() {
        let device = Device::Cpu;
        let rff =
            RandomFourierFeatures::new(1, 128, 5.0, &mut ChaCha8Rng::seed_from_u64(1), &device)
                .unwrap();
        let names: Vec<String> = rff
            .parameters()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["readout.weight", "readout.bias"]);
        assert_eq!(rff.parameter_count(), 2 * 128 + 1);
    }

    #[test]
    fn test_rff_features_bounded() {
        let device = Device::Cpu;
        let rff =
            RandomFourierFeatures::new(1, 8, 5.0, &mut ChaCha8Rng::seed_from_u64(2), &device)
                .unwrap();
        let points = Tensor::new(&[[-10.0f32], [0.0], [10.0]], &device).unwrap();
        let feats: Vec<Vec<f32>> = rff.features(&points).unwrap().to_vec2().unwrap();

        // at the origin sin = 0 and cos = 1
        assert!(feats[1][..8].iter().all(|&v| v == 0.0));
        assert!(feats[1][8..].iter().all(|&v| v == 1.0));
        assert!(feats.iter().flatten().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_rff_projection_seeded() {
        let device = Device::Cpu;
        let a = RandomFourierFeatures::new(2, 4, 5.0, &mut ChaCha8Rng::seed_from_u64(3), &device)
            .unwrap();
        let b = RandomFourierFeatures::new(2, 4, 5.0, &mut ChaCha8Rng::seed_from_u64(3), &device)
            .unwrap();
        let pa: Vec<Vec<f32>> = a.projection().to_vec2().unwrap();
        let pb: Vec<Vec<f32>> = b.projection().to_vec2().unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_rff_projection_not_updated_by_gradients() {
        let device = Device::Cpu;
        let rff =
            RandomFourierFeatures::new(1, 4, 5.0, &mut ChaCha8Rng::seed_from_u64(4), &device)
                .unwrap();
        let points = Tensor::new(&[[0.5f32], [1.5]], &device).unwrap();
        let loss = rff
            .forward(&ModelInput::SpaceOnly { points: &points })
            .unwrap()
            .sqr()
            .unwrap()
            .sum_all()
            .unwrap();
        let grads = loss.backward().unwrap();
        assert!(grads.get(rff.projection()).is_none());
        for param in rff.parameters() {
            assert!(grads.get(param.var()).is_some());
        }
    }

    #[test]
    fn test_rff_rejects_wrong_width() {
        let device = Device::Cpu;
        let rff =
            RandomFourierFeatures::new(3, 4, 5.0, &mut ChaCha8Rng::seed_from_u64(5), &device)
                .unwrap();
        let points = Tensor::zeros((2, 1), candle_core::DType::F32, &device).unwrap();
        assert!(matches!(
            rff.features(&points),
            Err(QuasimotoError::ShapeMismatch { .. })
        ));
    }
}
