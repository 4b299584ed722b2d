//! # Sequence Layers
//!
//! Layers that unroll an LMU cell over a whole sequence.
//!
//! | Layer | Cell | State |
//! |-------|------|-------|
//! | [`LMU`] | [`LMUCell`](crate::cells::LMUCell) (base or gated) | [`LMUState`](crate::cells::LMUState) |
//! | [`LMUODE`] | [`LMUODECell`](crate::cells::LMUODECell) | `[batch, units·order]` |
//!
//! The discrete pair is prepared once per call to `forward`, then every
//! timestep reuses it. A sequence of length zero yields an output with a
//! zero-length time axis and returns the initial state unchanged.
//!
//! ## Tensor Shapes
//!
//! | Format | Input | Output (`return_sequences=true`) | Output (`false`) |
//! |--------|-------|----------------------------------|------------------|
//! | Batch-first (default) | `[batch, seq, features]` | `[batch, seq, out]` | `[batch, 1, out]` |
//! | Sequence-first | `[seq, batch, features]` | `[seq, batch, out]` | `[1, batch, out]` |
//!
//! ```ignore
//! use lmu::prelude::*;
//!
//! let lmu = LMU::<Backend>::new(LMUCellConfig::new(32, 8, 50.0), 4, &device)?
//!     .with_return_sequences(false);
//!
//! let input: Tensor<Backend, 3> = Tensor::zeros([16, 100, 4], &device);
//! let (output, state) = lmu.forward(input, None);
//! // output: [16, 1, 32]
//! // state.memory: [16, 8]
//! ```

pub mod lmu;
pub mod lmu_ode;

pub use lmu::LMU;
pub use lmu_ode::LMUODE;

use crate::cells::RecurrentCell;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Run `cell` over every timestep of `input`.
pub(crate) fn unroll<B: Backend, C: RecurrentCell<B>>(
    cell: &C,
    input: Tensor<B, 3>,
    state: Option<C::State>,
    batch_first: bool,
    return_sequences: bool,
) -> (Tensor<B, 3>, C::State) {
    let device = input.device();
    let [d0, d1, _] = input.dims();
    let (batch_size, seq_len) = if batch_first { (d0, d1) } else { (d1, d0) };
    let time_dim = if batch_first { 1 } else { 0 };

    let mut current_state = state.unwrap_or_else(|| cell.initial_state(batch_size, &device));
    let pair = cell.prepare();

    let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(seq_len);
    for t in 0..seq_len {
        let step_input = input.clone().narrow(time_dim, t, 1).squeeze(time_dim);

        let (output, new_state) = cell.step(&pair, step_input, current_state);
        current_state = new_state;

        if return_sequences || t + 1 == seq_len {
            outputs.push(output);
        }
    }

    if outputs.is_empty() {
        // Empty sequence: no step ran, the state passes through
        let shape = if batch_first {
            [batch_size, 0, cell.output_size()]
        } else {
            [0, batch_size, cell.output_size()]
        };
        return (Tensor::zeros(shape, &device), current_state);
    }

    (Tensor::stack(outputs, time_dim), current_state)
}
