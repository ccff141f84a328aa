//! Error types for quasimoto-rs.

use thiserror::Error;

use crate::model::CoordinateArity;

/// Result type alias for quasimoto-rs operations.
pub type Result<T> = std::result::Result<T, QuasimotoError>;

/// Errors that can occur while generating data, building models, or training.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuasimotoError {
    /// Tensor operation failed
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration file.
    #[error("invalid config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Shape mismatch
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// A model was handed coordinates it cannot consume.
    #[error("arity mismatch: model expects {expected:?}, input provides {got:?}")]
    ArityMismatch {
        expected: CoordinateArity,
        got: CoordinateArity,
    },

    /// The loss stopped being a finite number.
    #[error("non-finite loss {loss} for model '{model}' at step {step}")]
    NonFiniteLoss {
        model: String,
        step: usize,
        loss: f32,
    },

    /// Training error
    #[error("training error: {0}")]
    Training(String),

    /// Progress bar template error.
    #[error("template error: {0}")]
    Template(String),
}

impl QuasimotoError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a training error
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }
}

impl From<indicatif::style::TemplateError> for QuasimotoError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        QuasimotoError::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error_display() {
        let error = QuasimotoError::invalid_config("epochs must be > 0");
        assert_eq!(error.to_string(), "configuration error: epochs must be > 0");
    }

    #[test]
    fn test_shape_mismatch_display() {
        let error = QuasimotoError::shape_mismatch("1000", "999");
        assert_eq!(error.to_string(), "shape mismatch: expected 1000, got 999");
    }

    #[test]
    fn test_arity_mismatch_display() {
        let error = QuasimotoError::ArityMismatch {
            expected: CoordinateArity::SpaceTime3D,
            got: CoordinateArity::SpaceTime1D,
        };
        let msg = error.to_string();
        assert!(msg.contains("SpaceTime3D"));
        assert!(msg.contains("SpaceTime1D"));
    }

    #[test]
    fn test_non_finite_loss_display() {
        let error = QuasimotoError::NonFiniteLoss {
            model: "SIREN".into(),
            step: 12,
            loss: f32::NAN,
        };
        assert_eq!(
            error.to_string(),
            "non-finite loss NaN for model 'SIREN' at step 12"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: QuasimotoError = io_error.into();
        assert!(matches!(error, QuasimotoError::Io(_)));
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_config_parse_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: yaml: :::").unwrap_err();
        let error: QuasimotoError = yaml_error.into();
        assert!(error.to_string().contains("invalid config file"));
    }

    #[test]
    fn test_candle_error_conversion() {
        use candle_core::{DType, Device, Tensor};

        let a = Tensor::zeros((2, 3), DType::F32, &Device::Cpu).unwrap();
        let b = Tensor::zeros((3, 4), DType::F32, &Device::Cpu).unwrap();
        let candle_error = a.broadcast_add(&b).unwrap_err();
        let error: QuasimotoError = candle_error.into();
        assert!(error.to_string().contains("candle error"));
    }

    #[test]
    fn test_template_error_conversion() {
        use indicatif::ProgressStyle;

        if let Err(template_error) = ProgressStyle::default_bar().template("{wide_bar:.}") {
            let error: QuasimotoError = template_error.into();
            assert!(error.to_string().contains("template error"));
        }
    }
}
