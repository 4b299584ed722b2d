//! # Linear Time-Invariant Delay Systems
//!
//! Host-side construction of the continuous system that approximates a pure
//! delay of `theta` steps, and its conversion to a per-step update.
//!
//! | Stage | Type | Description |
//! |-------|------|-------------|
//! | Realize | [`ContinuousSystem`] | `(A, B, C, D)` with `D = 0` |
//! | Discretize | [`DiscreteSystem`] | `(A_d, B_d)` for a sample interval `dt` |
//! | Recompute | [`expm`] | Matrix exponential on Burn tensors (trainable path) |
//!
//! Everything in [`system`] and [`discretize`] runs in `f64` through `nalgebra`
//! once per cell. Only [`expm`] takes part in the autodiff graph.

pub mod discretize;
pub mod expm;
pub mod system;

pub use discretize::{DiscreteSystem, Discretization};
pub use expm::expm;
pub use system::{realize, ContinuousSystem, DelayKind, Realizer, STRICTLY_PROPER_TOLERANCE};
