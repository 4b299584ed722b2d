//! # LMU - Legendre Memory Units for Burn
//!
//! Recurrent memory cells that compress a sliding window of their input into an
//! order-`N` linear time-invariant system, then decode that memory nonlinearly.
//!
//! ## Features
//!
//! - **Delay systems**: Legendre and Padé realizations of a `theta`-step delay
//! - **Discretization**: zero-order hold, Euler, backward difference, bilinear
//! - **LMUCell**: base cell with delta-form memory update
//! - **Gated LMUCell**: per-dimension forget gate on the memory injection
//! - **LMUODECell**: per-unit memory with trainable `dt`, `A`, `B`
//! - **Layers**: [`LMU`](rnn::LMU) and [`LMUODE`](rnn::LMUODE) unroll cells over sequences
//!
//! ## Quick Start
//!
//! ```rust
//! use lmu::prelude::*;
//!
//! let system = realize(6, 20.0, DelayKind::Legendre, &Realizer::Identity).unwrap();
//! let discrete = DiscreteSystem::from_continuous(&system, 1.0, Discretization::Zoh).unwrap();
//!
//! assert_eq!(system.order(), 6);
//! assert_eq!(discrete.delta_a().nrows(), 6);
//! ```
//!
//! ## Layer Usage
//!
//! ```ignore
//! use lmu::prelude::*;
//!
//! let config = LMUCellConfig::new(64, 8, 100.0).with_forget_gate(ForgetGateConfig::default());
//! let lmu = LMU::<Backend>::new(config, 16, &device)?;
//!
//! let (output, state) = lmu.forward(input, None);
//! ```

pub mod activation;
pub mod cells;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod initializers;
pub mod lti;
pub mod projection;
pub mod rnn;

pub mod prelude {
    pub use crate::activation::{Activation, LeCun};
    pub use crate::cells::{CellVariant, LMUCell, LMUODECell, LMUState, RecurrentCell, StateShape};
    pub use crate::config::{ForgetGateConfig, LMUCellConfig, LMUODECellConfig, WeightConfig};
    pub use crate::dynamics::{DiscretePair, SolverStrategy, TrainableDynamics};
    pub use crate::error::{LMUError, LMUResult};
    pub use crate::initializers::Initializer;
    pub use crate::lti::{
        realize, ContinuousSystem, DelayKind, DiscreteSystem, Discretization, Realizer,
    };
    pub use crate::rnn::{LMU, LMUODE};
}
