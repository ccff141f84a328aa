//! Trainable affine layer and parameter initialization helpers.
//!
//! Weights are held as [`Var`]s so the optimizer can update them in place; the forward
//! pass goes through [`candle_nn::Linear`], which shares storage with the Vars.

use candle_core::{Device, Result, Shape, Tensor, Var};
use candle_nn::Module;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::model::Parameter;

/// Tensor of `U(-bound, bound)` samples drawn from `rng`.
pub(crate) fn uniform_tensor<R: Rng>(
    shape: impl Into<Shape>,
    bound: f64,
    rng: &mut R,
    device: &Device,
) -> Result<Tensor> {
    let shape = shape.into();
    let bound = bound as f32;
    let data: Vec<f32> = (0..shape.elem_count())
        .map(|_| {
            if bound > 0.0 {
                rng.gen_range(-bound..bound)
            } else {
                0.0
            }
        })
        .collect();
    Tensor::from_vec(data, shape, device)
}

/// Tensor of `N(0, 1)·scale` samples drawn from `rng`.
pub(crate) fn normal_tensor<R: Rng>(
    shape: impl Into<Shape>,
    scale: f64,
    rng: &mut R,
    device: &Device,
) -> Result<Tensor> {
    let shape = shape.into();
    let data: Vec<f32> = (0..shape.elem_count())
        .map(|_| {
            let val: f64 = rng.sample(StandardNormal);
            (val * scale) as f32
        })
        .collect();
    Tensor::from_vec(data, shape, device)
}

/// Trainable scalar stored as a one-element Var.
pub(crate) fn scalar_var(value: f32, device: &Device) -> Result<Var> {
    Var::from_tensor(&Tensor::new(&[value], device)?)
}

/// Trainable scalar initialized from `N(0, 1)`.
pub(crate) fn randn_scalar_var<R: Rng>(rng: &mut R, device: &Device) -> Result<Var> {
    let val: f64 = rng.sample(StandardNormal);
    scalar_var(val as f32, device)
}

/// Fully connected layer `y = x·Wᵀ + b`.
///
/// Input `(N, in_features)`, output `(N, out_features)`.
#[derive(Debug, Clone)]
pub struct Affine {
    weight: Var,
    bias: Var,
    inner: candle_nn::Linear,
}

impl Affine {
    /// Standard initialization: weight and bias from `U(-1/√in, 1/√in)`.
    pub fn new<R: Rng>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        let bound = 1.0 / (in_features as f64).sqrt();
        let weight = uniform_tensor((out_features, in_features), bound, rng, device)?;
        Self::with_weight(weight, in_features, rng, device)
    }

    /// Use `weight` as given and the standard bias initialization.
    pub fn with_weight<R: Rng>(
        weight: Tensor,
        in_features: usize,
        rng: &mut R,
        device: &Device,
    ) -> Result<Self> {
        let out_features = weight.dims2()?.0;
        let bound = 1.0 / (in_features as f64).sqrt();
        let bias = uniform_tensor(out_features, bound, rng, device)?;
        Self::from_tensors(&weight, &bias)
    }

    /// Build from explicit weight `(out, in)` and bias `(out,)` values.
    pub fn from_tensors(weight: &Tensor, bias: &Tensor) -> Result<Self> {
        let weight = Var::from_tensor(weight)?;
        let bias = Var::from_tensor(bias)?;
        let inner = candle_nn::Linear::new(
            weight.as_tensor().clone(),
            Some(bias.as_tensor().clone()),
        );
        Ok(Self {
            weight,
            bias,
            inner,
        })
    }

    /// Input width.
    pub fn in_features(&self) -> usize {
        self.weight.dims()[1]
    }

    /// Output width.
    pub fn out_features(&self) -> usize {
        self.weight.dims()[0]
    }

    /// Weight Var, shape `(out, in)`.
    pub fn weight(&self) -> &Var {
        &self.weight
    }

    /// Bias Var, shape `(out,)`.
    pub fn bias(&self) -> &Var {
        &self.bias
    }

    /// Parameter handles named `<prefix>.weight` and `<prefix>.bias`.
    pub fn parameters(&self, prefix: &str) -> Vec<Parameter> {
        vec![
            Parameter::new(format!("{prefix}.weight"), self.weight.clone()),
            Parameter::new(format!("{prefix}.bias"), self.bias.clone()),
        ]
    }
}

impl Module for Affine {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        self.inner.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_affine_shape() {
        let device = Device::Cpu;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let layer = Affine::new(16, 4, &mut rng, &device).unwrap();
        let x = Tensor::randn(0.0f32, 1.0, (10, 16), &device).unwrap();
        let out = layer.forward(&x).unwrap();

        assert_eq!(out.dims(), &[10, 4]);
        assert_eq!(layer.in_features(), 16);
        assert_eq!(layer.out_features(), 4);
    }

    #[test]
    fn test_affine_init_bounds() {
        let device = Device::Cpu;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let layer = Affine::new(64, 8, &mut rng, &device).unwrap();
        let bound = 1.0 / 8.0;

        let w: Vec<f32> = layer.weight().flatten_all().unwrap().to_vec1().unwrap();
        let b: Vec<f32> = layer.bias().to_vec1().unwrap();
        assert!(w.iter().chain(&b).all(|v| v.abs() <= bound));
    }

    #[test]
    fn test_affine_known_values() {
        let device = Device::Cpu;
        let weight = Tensor::new(&[[1.0f32, 2.0], [0.0, -1.0]], &device).unwrap();
        let bias = Tensor::new(&[0.5f32, 1.0], &device).unwrap();
        let layer = Affine::from_tensors(&weight, &bias).unwrap();

        let x = Tensor::new(&[[3.0f32, 4.0]], &device).unwrap();
        let out: Vec<Vec<f32>> = layer.forward(&x).unwrap().to_vec2().unwrap();
        assert_eq!(out, vec![vec![11.5, -3.0]]);
    }

    #[test]
    fn test_var_update_visible_in_forward() {
        let device = Device::Cpu;
        let weight = Tensor::new(&[[1.0f32]], &device).unwrap();
        let bias = Tensor::new(&[0.0f32], &device).unwrap();
        let layer = Affine::from_tensors(&weight, &bias).unwrap();

        layer
            .weight()
            .set(&Tensor::new(&[[2.0f32]], &device).unwrap())
            .unwrap();
        let x = Tensor::new(&[[3.0f32]], &device).unwrap();
        let out: Vec<Vec<f32>> = layer.forward(&x).unwrap().to_vec2().unwrap();
        assert_eq!(out, vec![vec![6.0]]);
    }

    #[test]
    fn test_parameter_names() {
        let device = Device::Cpu;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let layer = Affine::new(3, 1, &mut rng, &device).unwrap();
        let names: Vec<String> = layer
            .parameters("head")
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["head.weight", "head.bias"]);
    }

    #[test]
    fn test_normal_tensor_seeded() {
        let device = Device::Cpu;
        let a = normal_tensor((4, 4), 5.0, &mut ChaCha8Rng::seed_from_u64(9), &device).unwrap();
        let b = normal_tensor((4, 4), 5.0, &mut ChaCha8Rng::seed_from_u64(9), &device).unwrap();
        let a: Vec<f32> = a.flatten_all().unwrap().to_vec1().unwrap();
        let b: Vec<f32> = b.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(a, b);
    }
}
