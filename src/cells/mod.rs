//! # LMU Cells
//!
//! Single-timestep cells. The sequence layers in [`crate::rnn`] unroll them
//! over time; use a cell directly when you need custom state handling.
//!
//! | Cell | Variant | State | Output |
//! |------|---------|-------|--------|
//! | [`LMUCell`] | [`CellVariant::Base`] | `(hidden [b, units], memory [b, order])` | `units` |
//! | [`LMUCell`] with a forget gate | [`CellVariant::Gated`] | same as base | `units` |
//! | [`LMUODECell`] | [`CellVariant::Ode`] | `[b, units·order]` | `units` or `units·order` |
//!
//! ## Recurrences
//!
//! Base:
//! ```text
//! u  = σ_in(x·E_x + h·E_h + m·E_m)
//! m' = m + m·ΔAᵀ + u·B_dᵀ
//! h' = σ_h(x·K_x + h·K_h + m'·K_m)
//! ```
//! Gated scales the injection per memory dimension:
//! ```text
//! f  = σ_g(x·F_x + h·F_h + b_f)
//! m' = m + m·ΔAᵀ + f ⊙ (u·B_dᵀ)
//! ```
//! ODE keeps one memory trace per unit:
//! ```text
//! u   = x·E                        [b, units]
//! X'  = X·A_dᵀ + u ⊗ B_dᵀ          [b, units, order]
//! X'' = σ_h(flatten(X'))
//! y   = σ_o(X''·Dec)
//! ```
//!
//! ## Stepping
//!
//! [`RecurrentCell::prepare`] produces the discrete pair once per sequence
//! pass; [`RecurrentCell::step`] is then applied at every timestep.
//!
//! ```ignore
//! let cell = LMUCell::<Backend>::new(LMUCellConfig::new(32, 8, 50.0), 4, &device)?;
//! let pair = cell.prepare();
//! let mut state = cell.initial_state(batch, &device);
//! for x in steps {
//!     let (h, next) = cell.step(&pair, x, state);
//!     state = next;
//! }
//! ```

pub mod lmu_cell;
pub mod ode_cell;

pub use lmu_cell::{LMUCell, LMUState};
pub use ode_cell::LMUODECell;

use crate::dynamics::DiscretePair;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Which recurrence equation set a cell runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellVariant {
    Base,
    Ode,
    Gated,
}

/// Per-sample state shape declared at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateShape {
    /// `(units, order)`: separate hidden and memory vectors
    HiddenMemory { units: usize, order: usize },
    /// A single flattened vector
    Flat(usize),
}

impl StateShape {
    pub fn dims(&self) -> Vec<usize> {
        match *self {
            StateShape::HiddenMemory { units, order } => vec![units, order],
            StateShape::Flat(size) => vec![size],
        }
    }
}

/// Per-step transition contract used by the sequence layers.
pub trait RecurrentCell<B: Backend> {
    type State: Clone;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    fn state_shape(&self) -> StateShape;

    fn variant(&self) -> CellVariant;

    /// Zero state for `batch_size` sequences.
    fn initial_state(&self, batch_size: usize, device: &B::Device) -> Self::State;

    /// Discrete pair for one sequence pass. Depends only on parameters.
    fn prepare(&self) -> DiscretePair<B>;

    /// One timestep: `input` is `[batch, input_size]`.
    fn step(
        &self,
        pair: &DiscretePair<B>,
        input: Tensor<B, 2>,
        state: Self::State,
    ) -> (Tensor<B, 2>, Self::State);
}
