//! Continuous-time delay realizations.
//!
//! Reference: Voelker & Eliasmith, "Improving spiking dynamical networks:
//! Accurate delays, higher-order synapses, and time cells", Neural Computation 2018

use crate::error::{LMUError, LMUResult};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Largest `|D|` accepted for a strictly proper system.
pub const STRICTLY_PROPER_TOLERANCE: f64 = 1e-10;

/// Single-input single-output continuous LTI system `(A, B, C, D)`.
///
/// Always strictly proper: construction fails when `D` is not (numerically) zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSystem {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    c: DMatrix<f64>,
    d: DMatrix<f64>,
}

impl ContinuousSystem {
    /// Build a system, checking shapes and that `D ≈ 0`.
    ///
    /// Expected shapes: `A` is `N×N`, `B` is `N×1`, `C` is `1×N`, `D` is `1×1`.
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        c: DMatrix<f64>,
        d: DMatrix<f64>,
    ) -> LMUResult<Self> {
        let n = a.nrows();
        if n == 0 || a.ncols() != n {
            return Err(LMUError::Config(format!(
                "A must be a non-empty square matrix, got {}x{}",
                a.nrows(),
                a.ncols()
            )));
        }
        if b.shape() != (n, 1) || c.shape() != (1, n) || d.shape() != (1, 1) {
            return Err(LMUError::Config(format!(
                "expected B {}x1, C 1x{}, D 1x1; got B {:?}, C {:?}, D {:?}",
                n,
                n,
                b.shape(),
                c.shape(),
                d.shape()
            )));
        }

        let norm = d.norm();
        if norm.is_nan() || norm > STRICTLY_PROPER_TOLERANCE {
            return Err(LMUError::NotStrictlyProper {
                norm,
                tolerance: STRICTLY_PROPER_TOLERANCE,
            });
        }

        Ok(Self { a, b, c, d })
    }

    /// State dimension `N`
    pub fn order(&self) -> usize {
        self.a.nrows()
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn c(&self) -> &DMatrix<f64> {
        &self.c
    }

    pub fn d(&self) -> &DMatrix<f64> {
        &self.d
    }

    /// Change of basis `x = T·x'`: `(T⁻¹AT, T⁻¹B, CT, D)`.
    ///
    /// The transfer function, and so every Markov parameter, is unchanged.
    pub fn similarity(&self, transform: &DMatrix<f64>) -> LMUResult<Self> {
        let n = self.order();
        if transform.shape() != (n, n) {
            return Err(LMUError::Config(format!(
                "similarity transform must be {}x{}, got {:?}",
                n,
                n,
                transform.shape()
            )));
        }
        let inverse = transform.clone().try_inverse().ok_or_else(|| {
            LMUError::SingularTransform("realizer similarity transform".to_string())
        })?;

        Self::new(
            &inverse * &self.a * transform,
            &inverse * &self.b,
            &self.c * transform,
            self.d.clone(),
        )
    }

    /// First `count` Markov parameters `C·Aᵏ·B`, the moments of the impulse response.
    pub fn markov_parameters(&self, count: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(count);
        let mut ak_b = self.b.clone();
        for _ in 0..count {
            out.push((&self.c * &ak_b)[(0, 0)]);
            ak_b = &self.a * ak_b;
        }
        out
    }
}

/// Delay approximation used to generate the canonical continuous system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayKind {
    /// Shifted-Legendre basis: the memory holds Legendre coefficients of the window.
    #[default]
    Legendre,
    /// `[N-1/N]` Padé approximant of `exp(-theta·s)` in controllable canonical form.
    Pade,
}

impl DelayKind {
    /// Canonical system of this kind for the given order and window length.
    pub fn system(self, order: usize, theta: f64) -> LMUResult<ContinuousSystem> {
        match self {
            DelayKind::Legendre => legendre_delay(order, theta),
            DelayKind::Pade => pade_delay(order, theta),
        }
    }
}

/// Change of internal coordinates applied after the delay is generated.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Realizer {
    /// Keep the generator's canonical form.
    #[default]
    Identity,
    /// Similarity transform by the given invertible `N×N` matrix.
    Similarity(DMatrix<f64>),
}

impl Realizer {
    pub fn apply(&self, system: ContinuousSystem) -> LMUResult<ContinuousSystem> {
        match self {
            Realizer::Identity => Ok(system),
            Realizer::Similarity(transform) => system.similarity(transform),
        }
    }
}

/// Realize an order-`order` approximation of a `theta`-step delay.
pub fn realize(
    order: usize,
    theta: f64,
    delay: DelayKind,
    realizer: &Realizer,
) -> LMUResult<ContinuousSystem> {
    if order == 0 {
        return Err(LMUError::Config("order must be >= 1".to_string()));
    }
    if !theta.is_finite() || theta <= 0.0 {
        return Err(LMUError::Config(format!(
            "theta must be finite and > 0, got {}",
            theta
        )));
    }

    let system = realizer.apply(delay.system(order, theta)?)?;
    log::debug!(
        "Realized {:?} delay: order={}, theta={}, realizer={}",
        delay,
        order,
        theta,
        match realizer {
            Realizer::Identity => "identity",
            Realizer::Similarity(_) => "similarity",
        }
    );
    Ok(system)
}

fn legendre_delay(order: usize, theta: f64) -> LMUResult<ContinuousSystem> {
    let sign = |k: usize| if k % 2 == 0 { 1.0 } else { -1.0 };

    let a = DMatrix::from_fn(order, order, |i, j| {
        let r = (2 * i + 1) as f64 / theta;
        if i < j {
            -r
        } else {
            sign(i - j + 1) * r
        }
    });
    let b = DMatrix::from_fn(order, 1, |i, _| sign(i) * (2 * i + 1) as f64 / theta);
    let c = DMatrix::from_element(1, order, 1.0);
    let d = DMatrix::zeros(1, 1);

    ContinuousSystem::new(a, b, c, d)
}

fn pade_delay(order: usize, theta: f64) -> LMUResult<ContinuousSystem> {
    let q = order;
    let p = order - 1;
    let factorial = |n: usize| (1..=n).fold(1.0f64, |acc, k| acc * k as f64);

    // Ascending-power coefficients of numerator and denominator
    let num: Vec<f64> = (0..=p)
        .map(|k| {
            factorial(p + q - k) * factorial(p)
                / (factorial(p + q) * factorial(k) * factorial(p - k))
                * (-theta).powi(k as i32)
        })
        .collect();
    let den: Vec<f64> = (0..=q)
        .map(|k| {
            factorial(p + q - k) * factorial(q)
                / (factorial(p + q) * factorial(k) * factorial(q - k))
                * theta.powi(k as i32)
        })
        .collect();

    let lead = den[q];
    // Monic denominator s^q + a_1 s^(q-1) + ... + a_q, descending order
    let a_coef = |j: usize| den[q - j] / lead;
    let b_coef = |j: usize| {
        let power = q - j;
        if power <= p {
            num[power] / lead
        } else {
            0.0
        }
    };

    let a = DMatrix::from_fn(q, q, |i, j| {
        if i == 0 {
            -a_coef(j + 1)
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    let b = DMatrix::from_fn(q, 1, |i, _| if i == 0 { 1.0 } else { 0.0 });
    let c = DMatrix::from_fn(1, q, |_, j| b_coef(j + 1));
    let d = DMatrix::from_element(1, 1, b_coef(0));

    ContinuousSystem::new(a, b, c, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_legendre_order_one() {
        let sys = realize(1, 4.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
        assert_relative_eq!(sys.a()[(0, 0)], -0.25);
        assert_relative_eq!(sys.b()[(0, 0)], 0.25);
        assert_relative_eq!(sys.c()[(0, 0)], 1.0);
    }

    #[test]
    fn test_legendre_matrix_pattern() {
        let sys = realize(3, 1.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
        let expected_a = DMatrix::from_row_slice(
            3,
            3,
            &[-1.0, -1.0, -1.0, 3.0, -3.0, -3.0, -5.0, 5.0, -5.0],
        );
        assert_relative_eq!(sys.a(), &expected_a);
        let expected_b = DMatrix::from_row_slice(3, 1, &[1.0, -3.0, 5.0]);
        assert_relative_eq!(sys.b(), &expected_b);
    }

    #[test]
    fn test_pade_matches_legendre_transfer_function() {
        let legendre = realize(5, 3.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
        let pade = realize(5, 3.0, DelayKind::Pade, &Realizer::Identity).unwrap();

        let ml = legendre.markov_parameters(10);
        let mp = pade.markov_parameters(10);
        for (k, (l, p)) in ml.iter().zip(mp.iter()).enumerate() {
            assert_relative_eq!(l, p, max_relative = 1e-7, epsilon = 1e-10);
            assert!(l.is_finite(), "Markov parameter {} should be finite", k);
        }
    }

    #[test]
    fn test_similarity_preserves_markov_parameters() {
        let sys = realize(4, 2.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
        let t = DMatrix::from_fn(4, 4, |i, j| if i == j { 2.0 } else { 0.1 * (i + j) as f64 });
        let moved = Realizer::Similarity(t).apply(sys.clone()).unwrap();

        assert_ne!(moved.a(), sys.a());
        for (x, y) in sys
            .markov_parameters(8)
            .iter()
            .zip(moved.markov_parameters(8).iter())
        {
            assert_relative_eq!(x, y, max_relative = 1e-9, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_singular_similarity_rejected() {
        let sys = realize(2, 1.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let err = Realizer::Similarity(singular).apply(sys).unwrap_err();
        assert!(matches!(err, LMUError::SingularTransform(_)));
    }

    #[test]
    fn test_not_strictly_proper_rejected() {
        let a = DMatrix::from_element(1, 1, -1.0);
        let b = DMatrix::from_element(1, 1, 1.0);
        let c = DMatrix::from_element(1, 1, 1.0);

        let d = DMatrix::from_element(1, 1, 1e-6);
        let err = ContinuousSystem::new(a.clone(), b.clone(), c.clone(), d).unwrap_err();
        assert!(matches!(err, LMUError::NotStrictlyProper { .. }));

        assert!(ContinuousSystem::new(a, b, c, DMatrix::from_element(1, 1, 1e-12)).is_ok());
    }

    #[test]
    fn test_invalid_order_and_theta() {
        assert!(realize(0, 1.0, DelayKind::Legendre, &Realizer::Identity).is_err());
        assert!(realize(3, 0.0, DelayKind::Legendre, &Realizer::Identity).is_err());
        assert!(realize(3, f64::NAN, DelayKind::Pade, &Realizer::Identity).is_err());
    }
}
