//! LMU sequence layer over the base or gated cell.

use super::unroll;
use crate::cells::{LMUCell, LMUState, RecurrentCell};
use crate::config::LMUCellConfig;
use crate::error::LMUResult;
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// LMU RNN Layer
///
/// # Type Parameters
/// * `B` - The backend type
#[derive(Module, Debug)]
pub struct LMU<B: Backend> {
    cell: LMUCell<B>,
    /// Whether input is batch-first
    #[module(skip)]
    batch_first: bool,
    /// Whether to return full sequence or just last timestep
    #[module(skip)]
    return_sequences: bool,
}

impl<B: Backend> LMU<B> {
    /// Create a layer; gating is enabled when `config.forget_gate` is set.
    pub fn new(config: LMUCellConfig, input_size: usize, device: &B::Device) -> LMUResult<Self> {
        Ok(Self::from_cell(LMUCell::new(config, input_size, device)?))
    }

    pub fn from_cell(cell: LMUCell<B>) -> Self {
        Self {
            cell,
            batch_first: true,
            return_sequences: true,
        }
    }

    pub fn with_batch_first(mut self, batch_first: bool) -> Self {
        self.batch_first = batch_first;
        self
    }

    pub fn with_return_sequences(mut self, return_sequences: bool) -> Self {
        self.return_sequences = return_sequences;
        self
    }

    pub fn cell(&self) -> &LMUCell<B> {
        &self.cell
    }

    pub fn input_size(&self) -> usize {
        self.cell.input_size()
    }

    pub fn output_size(&self) -> usize {
        self.cell.output_size()
    }

    /// Forward pass through the layer
    ///
    /// # Arguments
    /// * `input` - `[batch, seq, features]`, or `[seq, batch, features]` if not batch-first
    /// * `state` - Optional initial state, zeros otherwise
    ///
    /// # Returns
    /// Tuple of (output, final_state)
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<LMUState<B>>,
    ) -> (Tensor<B, 3>, LMUState<B>) {
        unroll(&self.cell, input, state, self.batch_first, self.return_sequences)
    }
}
