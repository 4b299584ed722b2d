//! Continuous-to-discrete conversion of a [`ContinuousSystem`].

use super::system::ContinuousSystem;
use crate::error::{LMUError, LMUResult};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discretization method
///
/// `Euler`, `BackwardDiff` and `Bilinear` are the generalized bilinear
/// transform with `alpha` = 0, 1 and ½.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discretization {
    /// Zero-order hold: exact for piecewise-constant input.
    #[default]
    Zoh,
    /// Forward Euler: `A_d = I + dt·A`, `B_d = dt·B`
    Euler,
    /// Backward Euler
    BackwardDiff,
    /// Tustin / bilinear transform
    Bilinear,
    /// Generalized bilinear transform with weight `alpha` in `[0, 1]`
    Gbt { alpha: f64 },
}

impl Discretization {
    /// Parse a method name. Accepts `zoh`, `euler` (`forward_diff`),
    /// `backward_diff`, `bilinear` (`tustin`) and `gbt:<alpha>` with
    /// `alpha` in `[0, 1]`.
    pub fn from_name(name: &str) -> LMUResult<Self> {
        let key = name.trim().to_ascii_lowercase();
        if let Some(alpha) = key.strip_prefix("gbt:") {
            return match alpha.trim().parse::<f64>() {
                Ok(alpha) if (0.0..=1.0).contains(&alpha) => Ok(Self::Gbt { alpha }),
                _ => Err(LMUError::UnknownMethod(name.to_string())),
            };
        }
        match key.as_str() {
            "zoh" => Ok(Self::Zoh),
            "euler" | "forward_diff" => Ok(Self::Euler),
            "backward_diff" => Ok(Self::BackwardDiff),
            "bilinear" | "tustin" => Ok(Self::Bilinear),
            _ => Err(LMUError::UnknownMethod(name.to_string())),
        }
    }

    /// Family label, without the `alpha` of [`Discretization::Gbt`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Zoh => "zoh",
            Self::Euler => "euler",
            Self::BackwardDiff => "backward_diff",
            Self::Bilinear => "bilinear",
            Self::Gbt { .. } => "gbt",
        }
    }

    fn gbt_alpha(&self) -> Option<f64> {
        match *self {
            Self::Zoh => None,
            Self::Euler => Some(0.0),
            Self::BackwardDiff => Some(1.0),
            Self::Bilinear => Some(0.5),
            Self::Gbt { alpha } => Some(alpha),
        }
    }
}

impl FromStr for Discretization {
    type Err = LMUError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for Discretization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gbt { alpha } => write!(f, "gbt:{}", alpha),
            other => f.write_str(other.name()),
        }
    }
}

/// Discrete-time update pair `x[k+1] = A_d·x[k] + B_d·u[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSystem {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    dt: f64,
    method: Discretization,
}

impl DiscreteSystem {
    /// Discretize `system` with sample interval `dt`.
    pub fn from_continuous(
        system: &ContinuousSystem,
        dt: f64,
        method: Discretization,
    ) -> LMUResult<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(LMUError::Config(format!(
                "dt must be finite and > 0, got {}",
                dt
            )));
        }

        let (a, b) = match method.gbt_alpha() {
            None => zoh(system.a(), system.b(), dt),
            Some(alpha) => gbt(system.a(), system.b(), dt, alpha)?,
        };

        log::debug!(
            "Discretized order-{} system with {} (dt={})",
            system.order(),
            method,
            dt
        );
        Ok(Self { a, b, dt, method })
    }

    pub fn order(&self) -> usize {
        self.a.nrows()
    }

    /// Transition matrix `A_d` (`N×N`)
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// Input matrix `B_d` (`N×1`)
    pub fn b(&self) -> &DMatrix<f64> {
        &self.b
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn method(&self) -> Discretization {
        self.method
    }

    /// Delta form `ΔA = A_d − I`, so that `m += ΔA·m + B_d·u`.
    pub fn delta_a(&self) -> DMatrix<f64> {
        let n = self.order();
        &self.a - DMatrix::<f64>::identity(n, n)
    }

    /// `A_d·m + B_d·u`
    pub fn step(&self, memory: &DVector<f64>, u: f64) -> DVector<f64> {
        &self.a * memory + self.b.column(0) * u
    }

    /// `m + ΔA·m + B_d·u`
    pub fn step_delta(&self, memory: &DVector<f64>, u: f64) -> DVector<f64> {
        memory + self.delta_a() * memory + self.b.column(0) * u
    }
}

fn zoh(a: &DMatrix<f64>, b: &DMatrix<f64>, dt: f64) -> (DMatrix<f64>, DMatrix<f64>) {
    let n = a.nrows();
    let mut augmented = DMatrix::<f64>::zeros(n + 1, n + 1);
    augmented.view_mut((0, 0), (n, n)).copy_from(&(a * dt));
    augmented.view_mut((0, n), (n, 1)).copy_from(&(b * dt));

    let e = augmented.exp();
    (
        e.view((0, 0), (n, n)).into_owned(),
        e.view((0, n), (n, 1)).into_owned(),
    )
}

fn gbt(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    dt: f64,
    alpha: f64,
) -> LMUResult<(DMatrix<f64>, DMatrix<f64>)> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(LMUError::Config(format!(
            "gbt alpha must be in [0, 1], got {}",
            alpha
        )));
    }

    let n = a.nrows();
    let identity = DMatrix::<f64>::identity(n, n);
    if alpha == 0.0 {
        return Ok((&identity + a * dt, b * dt));
    }

    let ima = &identity - a * (alpha * dt);
    let inverse = ima.try_inverse().ok_or_else(|| {
        LMUError::SingularTransform(format!("I - {}·dt·A is not invertible", alpha))
    })?;

    Ok((
        &inverse * (&identity + a * ((1.0 - alpha) * dt)),
        &inverse * (b * dt),
    ))
}
