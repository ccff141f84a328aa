//! Sinusoidal representation network (SIREN) baseline.

use candle_core::{Device, Tensor};
use candle_nn::Module;
use rand::Rng;

use crate::error::{QuasimotoError, Result};
use crate::linear::{uniform_tensor, Affine};
use crate::model::{CoordinateArity, ModelInput, Parameter, SignalModel};

/// Default frequency scale applied before the sine.
pub const DEFAULT_W0: f64 = 30.0;

/// Affine map followed by `sin(w0 · z)`.
#[derive(Debug, Clone)]
pub struct SirenLayer {
    linear: Affine,
    w0: f64,
    is_first: bool,
}

impl SirenLayer {
    /// Create a layer with SIREN weight initialization.
    ///
    /// The first layer draws weights from `U(-1/in, 1/in)`; later layers from
    /// `U(-√(6/in)/w0, √(6/in)/w0)`. Biases use the standard affine initialization.
    pub fn new<R: Rng>(
        in_features: usize,
        out_features: usize,
        w0: f64,
        is_first: bool,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        let fan_in = in_features as f64;
        let bound = if is_first {
            1.0 / fan_in
        } else {
            (6.0 / fan_in).sqrt() / w0
        };
        let weight = uniform_tensor((out_features, in_features), bound, rng, device)?;
        let linear = Affine::with_weight(weight, in_features, rng, device)?;
        Ok(Self {
            linear,
            w0,
            is_first,
        })
    }

    pub fn linear(&self) -> &Affine {
        &self.linear
    }

    pub fn w0(&self) -> f64 {
        self.w0
    }

    pub fn is_first(&self) -> bool {
        self.is_first
    }
}

impl Module for SirenLayer {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        (self.linear.forward(x)? * self.w0)?.sin()
    }
}

/// Stack of SIREN layers with a final affine readout `hidden → 1`.
#[derive(Debug, Clone)]
pub struct SirenNetwork {
    layers: Vec<SirenLayer>,
    head: Affine,
}

impl SirenNetwork {
    /// Build `layers` sine layers of width `hidden` over `input_dim` coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`QuasimotoError::InvalidConfig`] for zero-sized dimensions.
    pub fn new<R: Rng>(
        input_dim: usize,
        hidden: usize,
        layers: usize,
        w0: f64,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        if input_dim == 0 || hidden == 0 || layers == 0 {
            return Err(QuasimotoError::invalid_config(format!(
                "siren needs non-zero sizes, got input_dim={input_dim} hidden={hidden} layers={layers}"
            )));
        }

        let mut stack = Vec::with_capacity(layers);
        stack.push(SirenLayer::new(input_dim, hidden, w0, true, rng, device)?);
        for _ in 1..layers {
            stack.push(SirenLayer::new(hidden, hidden, w0, false, rng, device)?);
        }
        let head = Affine::new(hidden, 1, rng, device)?;

        Ok(Self {
            layers: stack,
            head,
        })
    }

    pub fn layers(&self) -> &[SirenLayer] {
        &self.layers
    }

    /// Run the network on `(N, d)` points.
    pub fn evaluate(&self, points: &Tensor) -> Result<Tensor> {
        let mut hidden = points.clone();
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }
        Ok(self.head.forward(&hidden)?)
    }
}

impl SignalModel for SirenNetwork {
    fn name_hint(&self) -> &'static str {
        "siren"
    }

    fn arity(&self) -> CoordinateArity {
        CoordinateArity::SpaceOnly
    }

    fn forward(&self, input: &ModelInput<'_>) -> Result<Tensor> {
        match *input {
            ModelInput::SpaceOnly { points } => self.evaluate(points),
            _ => Err(input.mismatch(CoordinateArity::SpaceOnly)),
        }
    }

    fn parameters(&self) -> Vec<Parameter> {
        let mut params: Vec<Parameter> = self
            .layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer.linear.parameters(&format!("layers.{i}")))
            .collect();
        params.extend(self.head.parameters("head"));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn max_abs(t: &Tensor) -> f32 {
        t.flatten_all()
            .unwrap()
            .to_vec1::<f32>()
            .unwrap()
            .iter()
            .fold(0.0, |m, v| m.max(v.abs()))
    }

    #[test]
    fn test_first_layer_init_bound() {
        let device = Device::Cpu;
        let layer =
            SirenLayer::new(4, 64, DEFAULT_W0, true, &mut ChaCha8Rng::seed_from_u64(0), &device)
                .unwrap();
        assert!(layer.is_first());
        assert!(max_abs(layer.linear().weight()) <= 0.25);
        assert!(max_abs(layer.linear().bias()) <= 0.5);
    }

    #[test]
    fn test_hidden_layer_init_bound() {
        let device = Device::Cpu;
        let layer =
            SirenLayer::new(64, 64, DEFAULT_W0, false, &mut ChaCha8Rng::seed_from_u64(1), &device)
                .unwrap();
        let bound = ((6.0f64 / 64.0).sqrt() / 30.0) as f32;
        assert!(max_abs(layer.linear().weight()) <= bound);
        assert!(max_abs(layer.linear().bias()) <= 0.125);
    }

    #[test]
    fn test_layer_output_in_sine_range() {
        let device = Device::Cpu;
        let layer =
            SirenLayer::new(1, 16, DEFAULT_W0, true, &mut ChaCha8Rng::seed_from_u64(2), &device)
                .unwrap();
        let x = Tensor::new(&[[-10.0f32], [0.0], [3.3]], &device).unwrap();
        let out = layer.forward(&x).unwrap();
        assert_eq!(out.dims(), &[3, 16]);
        assert!(max_abs(&out) <= 1.0);
    }

    #[test]
    fn test_network_shape_and_parameters() {
        let device = Device::Cpu;
        let net = SirenNetwork::new(1, 64, 2, DEFAULT_W0, &mut ChaCha8Rng::seed_from_u64(3), &device)
            .unwrap();
        assert_eq!(net.layers().len(), 2);
        assert_eq!(net.parameter_count(), (64 + 64) + (64 * 64 + 64) + (64 + 1));

        let names: Vec<String> = net.parameters().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "layers.0.weight",
                "layers.0.bias",
                "layers.1.weight",
                "layers.1.bias",
                "head.weight",
                "head.bias"
            ]
        );

        let points = Tensor::randn(0.0f32, 1.0, (7, 1), &device).unwrap();
        let out = net.forward(&ModelInput::SpaceOnly { points: &points }).unwrap();
        assert_eq!(out.dims(), &[7, 1]);
    }

    #[test]
    fn test_network_rejects_time_input() {
        let device = Device::Cpu;
        let net = SirenNetwork::new(1, 8, 1, DEFAULT_W0, &mut ChaCha8Rng::seed_from_u64(4), &device)
            .unwrap();
        let x = Tensor::zeros(3, candle_core::DType::F32, &device).unwrap();
        let err = net.forward(&ModelInput::SpaceTime1D { x: &x, t: &x });
        assert!(matches!(err, Err(QuasimotoError::ArityMismatch { .. })));
    }

    #[test]
    fn test_network_rejects_zero_sizes() {
        let device = Device::Cpu;
        let err = SirenNetwork::new(1, 8, 0, DEFAULT_W0, &mut ChaCha8Rng::seed_from_u64(5), &device);
        assert!(matches!(err, Err(QuasimotoError::InvalidConfig(_))));
    }
}
