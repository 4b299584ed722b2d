//! LMU cell with continuous-time dynamics
//!
//! Every unit keeps its own order-`N` memory trace of a scalar drive. The
//! sample interval `dt` and the continuous `A`, `B` can be trained, in which
//! case the discrete pair is recomputed from them at the start of every pass.

use super::{CellVariant, RecurrentCell, StateShape};
use crate::activation::Activation;
use crate::config::{LMUODECellConfig, WeightConfig};
use crate::dynamics::{DiscretePair, DynamicsSolver, TrainableDynamics};
use crate::error::{LMUError, LMUResult};
use crate::lti::{realize, ContinuousSystem, Realizer};
use crate::projection::Projection;
use burn::module::{Ignored, Module};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Initial sample interval; theta is expressed in steps.
const INITIAL_DT: f64 = 1.0;

/// ODE variant of the LMU cell.
///
/// State is the flattened `[batch, units * order]` memory.
#[derive(Module, Debug)]
pub struct LMUODECell<B: Backend> {
    encoders: Projection<B>,
    decoders: Projection<B>,
    dynamics: DynamicsSolver<B>,
    config: Ignored<LMUODECellConfig>,
    #[module(skip)]
    input_size: usize,
    hidden_activation: Ignored<Activation>,
    output_activation: Ignored<Activation>,
}

impl<B: Backend> LMUODECell<B> {
    /// Create a cell whose dynamics are the delay system named by the config.
    ///
    /// # Arguments
    ///
    /// * `config` - Cell configuration, validated before anything is built
    /// * `input_size` - Number of features per time step
    /// * `device` - Device for the parameters
    ///
    /// # Returns
    ///
    /// The cell, or an error for an invalid config or unknown name.
    pub fn new(config: LMUODECellConfig, input_size: usize, device: &B::Device) -> LMUResult<Self> {
        config.validate()?;
        let system = realize(config.order, config.theta, config.delay, &Realizer::Identity)?;
        Self::with_system(config, system, input_size, device)
    }

    /// Create a cell from an explicit continuous system.
    ///
    /// # Arguments
    ///
    /// * `config` - Cell configuration
    /// * `system` - Continuous `(A, B)` of order `config.order`
    /// * `input_size` - Number of features per time step
    /// * `device` - Device for the parameters
    ///
    /// # Returns
    ///
    /// The cell, or an error when the system order does not match the config.
    pub fn with_system(
        config: LMUODECellConfig,
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
        if config.theta < INITIAL_DT {
            log::warn!(
                "theta={} is shorter than one sample interval (dt={}), the window is under-resolved",
                config.theta,
                INITIAL_DT
            );
        }

        let method = config.discretization()?;
        let hidden_activation = Activation::from_name(&config.hidden_activation)?;
        let output_activation = Activation::from_name(&config.output_activation)?;
        let (units, order) = (config.units, config.order);
        let output_size = config.output_size();

        let mut rng = StdRng::seed_from_u64(config.seed);
        let encoders =
            Projection::new("encoders", [input_size, units], &config.encoders, &mut rng, device)?;
        let decoders = match &config.decoder_initializer {
            Some(initializer) => Projection::new(
                "decoders",
                [units * order, output_size],
                &WeightConfig {
                    initializer: initializer.clone(),
                    trainable: config.trainable_decoders,
                },
                &mut rng,
                device,
            )?,
            None => Projection::from_matrix(
                "decoders",
                &default_decoders(&system, units, config.return_states),
                config.trainable_decoders,
                device,
            ),
        };

        let trainable = TrainableDynamics {
            dt: config.trainable_dt,
            a: config.trainable_a,
            b: config.trainable_b,
        };
        let dynamics = DynamicsSolver::new(&system, method, trainable, INITIAL_DT, device)?;

        log::debug!(
            "Built LMU ODE cell: input={}, units={}, order={}, theta={}, output={}",
            input_size,
            units,
            order,
            config.theta,
            output_size
        );

        Ok(Self {
            encoders,
            decoders,
            dynamics,
            config: Ignored(config),
            input_size,
            hidden_activation: Ignored(hidden_activation),
            output_activation: Ignored(output_activation),
        })
    }

    pub fn config(&self) -> &LMUODECellConfig {
        &self.config.0
    }

    pub fn dynamics(&self) -> &DynamicsSolver<B> {
        &self.dynamics
    }

    pub fn encoders(&self) -> &Projection<B> {
        &self.encoders
    }

    pub fn decoders(&self) -> &Projection<B> {
        &self.decoders
    }

    /// Single step with a freshly prepared pair.
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        state: Option<Tensor<B, 2>>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let state = state.unwrap_or_else(|| {
            let [batch_size, _] = input.dims();
            self.initial_state(batch_size, &input.device())
        });
        self.step(&self.prepare(), input, state)
    }
}

/// Read out each unit's trace with the system's `C` row, or pass the whole
/// state through when `return_states` is set.
fn default_decoders(system: &ContinuousSystem, units: usize, return_states: bool) -> DMatrix<f64> {
    let order = system.order();
    if return_states {
        return DMatrix::identity(units * order, units * order);
    }
    let c = system.c();
    DMatrix::from_fn(units * order, units, |row, col| {
        if row / order == col {
            c[(0, row % order)]
        } else {
            0.0
        }
    })
}

impl<B: Backend> RecurrentCell<B> for LMUODECell<B> {
    type State = Tensor<B, 2>;

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.config.output_size()
    }

    fn state_shape(&self) -> StateShape {
        StateShape::Flat(self.config.units * self.config.order)
    }

    fn variant(&self) -> CellVariant {
        CellVariant::Ode
    }

    fn initial_state(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch_size, self.config.units * self.config.order], device)
    }

    fn prepare(&self) -> DiscretePair<B> {
        self.dynamics.discretize()
    }

    fn step(
        &self,
        pair: &DiscretePair<B>,
        input: Tensor<B, 2>,
        state: Tensor<B, 2>,
    ) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch_size, _] = input.dims();
        let (units, order) = (self.config.units, self.config.order);
        let rows = batch_size * units;

        let u = self.encoders.forward(input).reshape([rows, 1]);
        let traces = state.reshape([rows, order]);
        let traces = traces.matmul(pair.a_t.clone()) + u.matmul(pair.b.clone());

        let state = self.hidden_activation.forward(traces.reshape([batch_size, units * order]));
        let output = self.output_activation.forward(self.decoders.forward(state.clone()));

        (output, state)
    }
}
