//! Weight initializers
//!
//! Values are sampled host-side into an `ndarray` buffer from a seeded
//! [`StdRng`], then uploaded as a Burn parameter. A cell config and its seed
//! therefore fully determine the initial weights on every backend.
//!
//! Fan conventions follow Keras: a 2D shape is `[fan_in, fan_out]`, a 1D
//! shape uses its length for both.

use crate::error::{LMUError, LMUResult};
use burn::module::Param;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Standard deviation of a unit normal truncated to `[-2, 2]`.
const TRUNCATED_STD: f64 = 0.879_625_661_034_239_78;

/// Initial value distribution for a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Initializer {
    Zeros,
    Ones,
    Constant { value: f64 },
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std: f64 },
    /// `U(-sqrt(3 / fan_in), sqrt(3 / fan_in))`
    LecunUniform,
    /// `U(-sqrt(6 / (fan_in + fan_out)), ...)`
    GlorotUniform,
    /// Normal truncated at two standard deviations, scaled so the
    /// resulting spread is `sqrt(2 / (fan_in + fan_out))`
    GlorotNormal,
    /// Row `i` holds the Legendre polynomial `P_i` sampled on `linspace(-1, 1, cols)`.
    Legendre,
    /// Constant `value / shape[0]`.
    InputScaled { value: f64 },
}

impl Initializer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zeros => "zeros",
            Self::Ones => "ones",
            Self::Constant { .. } => "constant",
            Self::Uniform { .. } => "uniform",
            Self::Normal { .. } => "normal",
            Self::LecunUniform => "lecun_uniform",
            Self::GlorotUniform => "glorot_uniform",
            Self::GlorotNormal => "glorot_normal",
            Self::Legendre => "legendre",
            Self::InputScaled { .. } => "input_scaled",
        }
    }

    /// Sample a row-major array of the given shape.
    pub fn sample(&self, shape: &[usize], rng: &mut StdRng) -> LMUResult<ArrayD<f32>> {
        let len: usize = shape.iter().product();
        let values: Vec<f64> = match *self {
            Self::Zeros => vec![0.0; len],
            Self::Ones => vec![1.0; len],
            Self::Constant { value } => vec![value; len],
            Self::Uniform { min, max } => uniform(rng, len, min, max)?,
            Self::Normal { mean, std } => normal(rng, len, mean, std)?,
            Self::LecunUniform => {
                let (fan_in, _) = fans(shape);
                let limit = (3.0 / fan_in).sqrt();
                uniform(rng, len, -limit, limit)?
            }
            Self::GlorotUniform => {
                let (fan_in, fan_out) = fans(shape);
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                uniform(rng, len, -limit, limit)?
            }
            Self::GlorotNormal => {
                let (fan_in, fan_out) = fans(shape);
                let std = (2.0 / (fan_in + fan_out)).sqrt() / TRUNCATED_STD;
                truncated_normal(rng, len, 0.0, std)?
            }
            Self::Legendre => {
                if shape.len() != 2 {
                    return Err(LMUError::InitializerShape {
                        initializer: self.name(),
                        shape: shape.to_vec(),
                        reason: "shape must be 2D",
                    });
                }
                legendre_rows(shape[0], shape[1])
            }
            Self::InputScaled { value } => match shape.first() {
                Some(&rows) if rows > 0 => vec![value / rows as f64; len],
                _ => {
                    return Err(LMUError::InitializerShape {
                        initializer: self.name(),
                        shape: shape.to_vec(),
                        reason: "leading dimension must be non-empty",
                    })
                }
            },
        };

        let data: Vec<f32> = values.into_iter().map(|v| v as f32).collect();
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| LMUError::Config(format!("initializer buffer: {}", e)))
    }

    /// Sample and upload as a parameter with the given trainable flag.
    pub fn init<B: Backend, const D: usize>(
        &self,
        shape: [usize; D],
        trainable: bool,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> LMUResult<Param<Tensor<B, D>>> {
        let array = self.sample(&shape, rng)?;
        Ok(param_from_array(&array, shape, trainable, device))
    }
}

/// Upload a row-major host array as a parameter.
pub(crate) fn param_from_array<B: Backend, const D: usize>(
    array: &ArrayD<f32>,
    shape: [usize; D],
    trainable: bool,
    device: &B::Device,
) -> Param<Tensor<B, D>> {
    let data: Vec<f32> = array.iter().copied().collect();
    let tensor: Tensor<B, D> = Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape(shape);
    Param::from_tensor(tensor).set_require_grad(trainable)
}

fn fans(shape: &[usize]) -> (f64, f64) {
    match shape {
        [] => (1.0, 1.0),
        [n] => (*n as f64, *n as f64),
        [rest @ .., fan_in, fan_out] => {
            let receptive: usize = rest.iter().product();
            (
                (*fan_in * receptive).max(1) as f64,
                (*fan_out * receptive).max(1) as f64,
            )
        }
    }
}

fn uniform(rng: &mut StdRng, len: usize, min: f64, max: f64) -> LMUResult<Vec<f64>> {
    if min.is_nan() || max.is_nan() || min >= max {
        return Err(LMUError::Config(format!(
            "uniform initializer needs min < max, got [{}, {}]",
            min, max
        )));
    }
    Ok((0..len).map(|_| rng.gen_range(min..max)).collect())
}

fn normal(rng: &mut StdRng, len: usize, mean: f64, std: f64) -> LMUResult<Vec<f64>> {
    let dist = Normal::new(mean, std)
        .map_err(|e| LMUError::Config(format!("normal initializer: {}", e)))?;
    Ok((0..len).map(|_| dist.sample(rng)).collect())
}

/// Draws from `N(mean, std)` restricted to `mean ± 2·std`, by rejection.
fn truncated_normal(rng: &mut StdRng, len: usize, mean: f64, std: f64) -> LMUResult<Vec<f64>> {
    let dist = Normal::new(mean, std)
        .map_err(|e| LMUError::Config(format!("truncated normal initializer: {}", e)))?;
    let bound = 2.0 * std;
    let mut values = Vec::with_capacity(len);
    while values.len() < len {
        let v = dist.sample(rng);
        if (v - mean).abs() <= bound {
            values.push(v);
        }
    }
    Ok(values)
}

fn legendre_rows(rows: usize, cols: usize) -> Vec<f64> {
    let grid: Vec<f64> = match cols {
        0 => Vec::new(),
        1 => vec![-1.0],
        _ => (0..cols)
            .map(|j| -1.0 + 2.0 * j as f64 / (cols - 1) as f64)
            .collect(),
    };

    let mut out = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        out.extend(grid.iter().map(|&x| legendre(i, x)));
    }
    out
}

/// Bonnet recursion: `(n+1)·P_{n+1} = (2n+1)·x·P_n − n·P_{n−1}`
fn legendre(degree: usize, x: f64) -> f64 {
    let (mut prev, mut current) = (1.0, x);
    if degree == 0 {
        return prev;
    }
    for n in 1..degree {
        let next = ((2 * n + 1) as f64 * x * current - n as f64 * prev) / (n + 1) as f64;
        prev = current;
        current = next;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_legendre_values() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = Initializer::Legendre.sample(&[3, 3], &mut rng).unwrap();
        // P0 = 1, P1 = x, P2 = (3x^2 - 1) / 2 on [-1, 0, 1]
        let expected = [1.0, 1.0, 1.0, -1.0, 0.0, 1.0, 1.0, -0.5, 1.0];
        for (got, want) in a.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_legendre_requires_2d() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = Initializer::Legendre.sample(&[4], &mut rng).unwrap_err();
        assert!(matches!(err, LMUError::InitializerShape { .. }));

        let err = Initializer::Legendre.sample(&[2, 2, 2], &mut rng).unwrap_err();
        assert!(matches!(err, LMUError::InitializerShape { .. }));
    }

    #[test]
    fn test_input_scaled() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = Initializer::InputScaled { value: 1.0 }
            .sample(&[4, 3], &mut rng)
            .unwrap();
        assert!(a.iter().all(|&v| (v - 0.25).abs() < 1e-7));
    }

    #[test]
    fn test_lecun_uniform_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Initializer::LecunUniform.sample(&[12, 5], &mut rng).unwrap();
        let limit = (3.0f32 / 12.0).sqrt();
        assert!(a.iter().all(|&v| v.abs() <= limit));
        assert!(a.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_glorot_normal_is_truncated() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Initializer::GlorotNormal.sample(&[200, 100], &mut rng).unwrap();
        let target = (2.0f64 / 300.0).sqrt();
        let limit = 2.0 * target / TRUNCATED_STD;
        assert!(a.iter().all(|&v| (v as f64).abs() <= limit + 1e-6));

        let n = a.len() as f64;
        let mean = a.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = a.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.01);
        assert!((var.sqrt() / target - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_seed_determinism() {
        let sample = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            Initializer::GlorotNormal.sample(&[6, 6], &mut rng).unwrap()
        };
        assert_eq!(sample(3), sample(3));
        assert_ne!(sample(3), sample(4));
    }

    #[test]
    fn test_invalid_uniform_range() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Initializer::Uniform { min: 1.0, max: 1.0 }
            .sample(&[2], &mut rng)
            .is_err());
    }

    #[test]
    fn test_serde_tagged() {
        let init: Initializer = serde_json::from_str(r#"{"kind":"constant","value":0.5}"#).unwrap();
        assert_eq!(init, Initializer::Constant { value: 0.5 });
        let text = serde_json::to_string(&Initializer::LecunUniform).unwrap();
        assert_eq!(text, r#"{"kind":"lecun_uniform"}"#);
    }
}
