//! Activation functions for LMU cells
//!
//! Cells name their nonlinearities in configuration (`"tanh"`, `"linear"`, ...).
//! [`Activation`] resolves those names once at construction and applies the
//! function to tensors of any rank.

use crate::error::{LMUError, LMUResult};
use burn::tensor::activation;
use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named elementwise nonlinearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Identity
    #[default]
    Linear,
    Tanh,
    Sigmoid,
    /// `clamp(0.2 * x + 0.5, 0, 1)`
    HardSigmoid,
    Relu,
    /// `1.7159 * tanh(0.666 * x)`, see [`LeCun`]
    LecunTanh,
}

impl Activation {
    /// Resolve an activation by name.
    pub fn from_name(name: &str) -> LMUResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "linear" | "identity" | "none" => Ok(Self::Linear),
            "tanh" => Ok(Self::Tanh),
            "sigmoid" => Ok(Self::Sigmoid),
            "hard_sigmoid" => Ok(Self::HardSigmoid),
            "relu" => Ok(Self::Relu),
            "lecun_tanh" | "lecun" => Ok(Self::LecunTanh),
            _ => Err(LMUError::UnknownActivation(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Tanh => "tanh",
            Self::Sigmoid => "sigmoid",
            Self::HardSigmoid => "hard_sigmoid",
            Self::Relu => "relu",
            Self::LecunTanh => "lecun_tanh",
        }
    }

    /// Apply element-wise.
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Linear => x,
            Self::Tanh => x.tanh(),
            Self::Sigmoid => activation::sigmoid(x),
            Self::HardSigmoid => x.mul_scalar(0.2).add_scalar(0.5).clamp(0.0, 1.0),
            Self::Relu => activation::relu(x),
            Self::LecunTanh => LeCun::forward(x),
        }
    }
}

impl FromStr for Activation {
    type Err = LMUError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// LeCun's tanh activation function.
///
/// This activation function is defined as:
/// `f(x) = 1.7159 * tanh(0.666 * x)`
///
/// # Example
///
/// ```rust
/// use burn::backend::NdArray;
/// use burn::tensor::Tensor;
/// use lmu::activation::LeCun;
///
/// type Backend = NdArray<f32>;
/// let device = Default::default();
///
/// let x = Tensor::<Backend, 1>::from_floats([0.0, 1.0, -1.0], &device);
/// let y = LeCun::forward(x);
/// ```
pub struct LeCun;

impl LeCun {
    pub fn forward<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
        let scaled = x * 0.666f32;
        scaled.tanh() * 1.7159f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type Backend = NdArray<f32>;

    fn values(t: Tensor<Backend, 1>) -> Vec<f32> {
        let n = t.dims()[0];
        (0..n).map(|i| t.clone().slice([i..i + 1]).into_scalar()).collect()
    }

    #[test]
    fn test_activation_names() {
        assert_eq!(Activation::from_name("tanh").unwrap(), Activation::Tanh);
        assert_eq!(Activation::from_name(" Linear ").unwrap(), Activation::Linear);
        assert_eq!("lecun_tanh".parse::<Activation>().unwrap(), Activation::LecunTanh);
        assert!(matches!(
            Activation::from_name("swish"),
            Err(LMUError::UnknownActivation(_))
        ));
    }

    #[test]
    fn test_name_round_trip() {
        for act in [
            Activation::Linear,
            Activation::Tanh,
            Activation::Sigmoid,
            Activation::HardSigmoid,
            Activation::Relu,
            Activation::LecunTanh,
        ] {
            assert_eq!(Activation::from_name(act.name()).unwrap(), act);
        }
    }

    #[test]
    fn test_hard_sigmoid() {
        let device = Default::default();
        let x = Tensor::<Backend, 1>::from_floats([-5.0f32, 0.0, 1.0, 5.0], &device);
        let y = values(Activation::HardSigmoid.forward(x));
        let expected = [0.0f32, 0.5, 0.7, 1.0];
        for (got, want) in y.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6, "got {}, expected {}", got, want);
        }
    }

    #[test]
    fn test_linear_is_identity() {
        let device = Default::default();
        let x = Tensor::<Backend, 1>::from_floats([-2.0f32, 0.25, 3.0], &device);
        assert_eq!(values(Activation::Linear.forward(x.clone())), values(x));
    }

    #[test]
    fn test_lecun_tanh_range() {
        let device = Default::default();
        for &val in &[-10.0f32, -1.0, 0.0, 1.0, 10.0] {
            let x = Tensor::<Backend, 1>::full([1], val, &device);
            let result = Activation::LecunTanh.forward(x).into_scalar();
            let expected = 1.7159f32 * (0.666f32 * val).tanh();
            assert!(
                (result - expected).abs() < 1e-5,
                "LeCun activation incorrect at x={}",
                val
            );
        }
    }
}
