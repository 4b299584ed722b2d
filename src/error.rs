//! Error type shared by every construction path in the crate.
//!
//! All failures are raised while a cell is being built. Once a cell exists its
//! per-step transition is a pure tensor computation and cannot fail.

use thiserror::Error;

/// Root error type for LMU construction failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LMUError {
    /// The continuous system has a direct input-to-output path (D ≠ 0).
    #[error("system is not strictly proper: |D| = {norm:e} exceeds {tolerance:e}")]
    NotStrictlyProper { norm: f64, tolerance: f64 },

    /// Discretization method name was not recognised.
    #[error("unknown discretization method '{0}'")]
    UnknownMethod(String),

    /// The method exists but cannot be recomputed per pass from trainable parameters.
    #[error("method '{0}' cannot be used with trainable dt/A/B (expected 'euler' or 'zoh')")]
    UnsupportedDynamicMethod(String),

    /// Activation name was not recognised.
    #[error("unknown activation '{0}'")]
    UnknownActivation(String),

    /// A shape-dependent initializer was asked for a shape it cannot fill.
    #[error("{initializer} initializer cannot fill shape {shape:?}: {reason}")]
    InitializerShape {
        initializer: &'static str,
        shape: Vec<usize>,
        reason: &'static str,
    },

    /// A matrix that has to be inverted is singular.
    #[error("singular matrix: {0}")]
    SingularTransform(String),

    /// Invalid configuration values.
    #[error("config error: {0}")]
    Config(String),
}

pub type LMUResult<T> = Result<T, LMUError>;
