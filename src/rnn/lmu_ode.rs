//! LMU sequence layer over the ODE cell.

use super::unroll;
use crate::cells::{LMUODECell, RecurrentCell};
use crate::config::LMUODECellConfig;
use crate::error::LMUResult;
use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// LMU ODE RNN Layer
///
/// With trainable `dt`, `A` or `B` the discrete pair is recomputed once per
/// `forward` call and shared by all timesteps and sequences in the batch.
#[derive(Module, Debug)]
pub struct LMUODE<B: Backend> {
    cell: LMUODECell<B>,
    #[module(skip)]
    batch_first: bool,
    #[module(skip)]
    return_sequences: bool,
}

impl<B: Backend> LMUODE<B> {
    pub fn new(config: LMUODECellConfig, input_size: usize, device: &B::Device) -> LMUResult<Self> {
        Ok(Self::from_cell(LMUODECell::new(config, input_size, device)?))
    }

    pub fn from_cell(cell: LMUODECell<B>) -> Self {
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

    pub fn cell(&self) -> &LMUODECell<B> {
        &self.cell
    }

    pub fn input_size(&self) -> usize {
        self.cell.input_size()
    }

    pub fn output_size(&self) -> usize {
        self.cell.output_size()
    }

    /// Returns (output, final flattened memory).
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<Tensor<B, 2>>,
    ) -> (Tensor<B, 3>, Tensor<B, 2>) {
        unroll(&self.cell, input, state, self.batch_first, self.return_sequences)
    }
}
