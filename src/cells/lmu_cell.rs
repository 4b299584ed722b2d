//! Base and gated LMU cells
//!
//! Both variants share one module: the gated cell is the base cell with a
//! [`ForgetGate`] on the memory injection. The delay system is discretized
//! once with `dt = 1` (theta is already expressed in steps) and kept in delta
//! form, so the memory update stays centered on zero.

use super::{CellVariant, RecurrentCell, StateShape};
use crate::activation::Activation;
use crate::config::LMUCellConfig;
use crate::dynamics::{DeltaDynamics, DiscretePair};
use crate::error::{LMUError, LMUResult};
use crate::lti::{realize, ContinuousSystem, Realizer};
use crate::projection::{ForgetGate, LMUProjections};
use burn::module::{Ignored, Module};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Hidden and memory state of the base and gated cells
#[derive(Debug, Clone)]
pub struct LMUState<B: Backend> {
    /// `[batch, units]`
    pub hidden: Tensor<B, 2>,
    /// `[batch, order]`
    pub memory: Tensor<B, 2>,
}

impl<B: Backend> LMUState<B> {
    pub fn zeros(batch_size: usize, units: usize, order: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, units], device),
            memory: Tensor::zeros([batch_size, order], device),
        }
    }
}

/// A layer of LMU memory units sharing one delay system.
///
/// # Type Parameters
/// * `B` - The backend type
#[derive(Module, Debug)]
pub struct LMUCell<B: Backend> {
    projections: LMUProjections<B>,
    forget_gate: Option<ForgetGate<B>>,
    dynamics: DeltaDynamics<B>,
    config: Ignored<LMUCellConfig>,
    #[module(skip)]
    input_size: usize,
    hidden_activation: Ignored<Activation>,
    /// Applied to the drive of the gated variant only
    input_activation: Ignored<Activation>,
}

impl<B: Backend> LMUCell<B> {
    /// Create a cell over the configured delay system.
    ///
    /// # Arguments
    /// * `config` - Cell configuration; a `forget_gate` makes it the gated variant
    /// * `input_size` - Number of input features
    /// * `device` - Device to create the module on
    ///
    /// # Returns
    /// The cell, or the first configuration error found
    pub fn new(config: LMUCellConfig, input_size: usize, device: &B::Device) -> LMUResult<Self> {
        config.validate()?;
        let system = realize(config.order, config.theta, config.delay, &Realizer::Identity)?;
        Self::with_system(config, system, input_size, device)
    }

    /// Create a cell over an explicit continuous system, e.g. one passed
    /// through a similarity [`Realizer`].
    ///
    /// # Arguments
    /// * `config` - Cell configuration; `config.order` must match the system
    /// * `system` - Continuous delay system to discretize
    /// * `input_size` - Number of input features
    /// * `device` - Device to create the module on
    pub fn with_system(
        config: LMUCellConfig,
        system: ContinuousSystem,
        input_size: usize,
        device: &B::Device,
    ) -> LMUResult<Self> {
        config.validate()?;
        if system.order() != config.order {
            return Err(LMUError::Config(format!(
                "system order {} does not match configured order {}",
                system.order(),
                config.order
            )));
        }
        if input_size == 0 {
            return Err(LMUError::Config("input_size must be >= 1".to_string()));
        }
        if config.theta < 1.0 {
            log::warn!(
                "theta={} is shorter than one step, the window is under-resolved",
                config.theta
            );
        }

        let method = config.discretization()?;
        let hidden_activation = Activation::from_name(&config.hidden_activation)?;
        let input_activation = Activation::from_name(&config.input_activation)?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let projections = LMUProjections::new(&config, input_size, &mut rng, device)?;
        let forget_gate = match &config.forget_gate {
            Some(gate) => Some(ForgetGate::new(
                gate,
                input_size,
                config.units,
                config.order,
                &mut rng,
                device,
            )?),
            None => None,
        };
        let dynamics =
            DeltaDynamics::new(&system, method, config.trainable_a, config.trainable_b, device)?;

        log::debug!(
            "Built {:?} LMU cell: input={}, units={}, order={}, theta={}, method={}",
            config.variant(),
            input_size,
            config.units,
            config.order,
            config.theta,
            method
        );

        Ok(Self {
            projections,
            forget_gate,
            dynamics,
            config: Ignored(config),
            input_size,
            hidden_activation: Ignored(hidden_activation),
            input_activation: Ignored(input_activation),
        })
    }

    pub fn config(&self) -> &LMUCellConfig {
        &self.config.0
    }

    pub fn units(&self) -> usize {
        self.config.units
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub fn projections(&self) -> &LMUProjections<B> {
        &self.projections
    }

    pub fn forget_gate(&self) -> Option<&ForgetGate<B>> {
        self.forget_gate.as_ref()
    }

    /// Single step with a freshly prepared pair.
    ///
    /// Prefer [`RecurrentCell::prepare`] + [`RecurrentCell::step`] when stepping
    /// through a sequence.
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        state: Option<LMUState<B>>,
    ) -> (Tensor<B, 2>, LMUState<B>) {
        let state = state.unwrap_or_else(|| {
            let [batch_size, _] = input.dims();
            self.initial_state(batch_size, &input.device())
        });
        self.step(&self.prepare(), input, state)
    }
}

impl<B: Backend> RecurrentCell<B> for LMUCell<B> {
    type State = LMUState<B>;

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.config.units
    }

    fn state_shape(&self) -> StateShape {
        StateShape::HiddenMemory {
            units: self.config.units,
            order: self.config.order,
        }
    }

    fn variant(&self) -> CellVariant {
        self.config.variant()
    }

    fn initial_state(&self, batch_size: usize, device: &B::Device) -> LMUState<B> {
        LMUState::zeros(batch_size, self.config.units, self.config.order, device)
    }

    fn prepare(&self) -> DiscretePair<B> {
        self.dynamics.pair()
    }

    fn step(
        &self,
        pair: &DiscretePair<B>,
        input: Tensor<B, 2>,
        state: LMUState<B>,
    ) -> (Tensor<B, 2>, LMUState<B>) {
        let LMUState { hidden, memory } = state;

        let drive = self.projections.drive(input.clone(), hidden.clone(), memory.clone());

        // [batch, 1]·[1, order]
        let injection = match &self.forget_gate {
            Some(gate) => {
                let u = self.input_activation.forward(drive);
                gate.forward(input.clone(), hidden.clone()) * u.matmul(pair.b.clone())
            }
            None => drive.matmul(pair.b.clone()),
        };
        let memory = memory.clone() + memory.matmul(pair.a_t.clone()) + injection;

        let pre = self.projections.hidden_preactivation(input, hidden, memory.clone());
        let hidden = self.hidden_activation.forward(pre);

        (hidden.clone(), LMUState { hidden, memory })
    }
}
