//! Named linear projections used by the cells.
//!
//! Weights are stored `[in, out]` and applied as `x·W` on `[batch, in]` rows.
//! Each projection carries its own initializer and trainable flag, so a frozen
//! weight simply never asks for gradients.

use crate::activation::Activation;
use crate::config::{ForgetGateConfig, LMUCellConfig, WeightConfig};
use crate::dynamics::param_from_matrix;
use crate::error::LMUResult;
use burn::module::{Ignored, Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;
use rand::rngs::StdRng;

/// A bias-free linear map with a name.
#[derive(Module, Debug)]
pub struct Projection<B: Backend> {
    weight: Param<Tensor<B, 2>>,
    #[module(skip)]
    name: String,
    #[module(skip)]
    trainable: bool,
}

impl<B: Backend> Projection<B> {
    /// Sample a `[in, out]` weight from `config`.
    ///
    /// # Arguments
    /// * `name` - Weight name, e.g. `"input_kernel"`
    /// * `shape` - `[in, out]`
    /// * `config` - Initializer and trainable flag
    /// * `rng` - Seeded generator shared by all weights of a cell
    /// * `device` - Device to create the weight on
    pub fn new(
        name: &str,
        shape: [usize; 2],
        config: &WeightConfig,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> LMUResult<Self> {
        let weight = config.initializer.init(shape, config.trainable, rng, device)?;
        Ok(Self {
            weight,
            name: name.to_string(),
            trainable: config.trainable,
        })
    }

    /// Use fixed initial values.
    ///
    /// # Arguments
    /// * `name` - Weight name
    /// * `matrix` - `[in, out]` initial values
    /// * `trainable` - Whether the weight receives gradients
    /// * `device` - Device to create the weight on
    pub fn from_matrix(
        name: &str,
        matrix: &DMatrix<f64>,
        trainable: bool,
        device: &B::Device,
    ) -> Self {
        Self {
            weight: param_from_matrix(matrix, trainable, device),
            name: name.to_string(),
            trainable,
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        x.matmul(self.weight.val())
    }

    pub fn weight(&self) -> Tensor<B, 2> {
        self.weight.val()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    /// `[in, out]`
    pub fn shape(&self) -> [usize; 2] {
        self.weight.dims()
    }
}

/// Encoders and kernels of the base and gated cells
#[derive(Module, Debug)]
pub struct LMUProjections<B: Backend> {
    pub input_encoders: Projection<B>,
    pub hidden_encoders: Projection<B>,
    pub memory_encoders: Projection<B>,
    pub input_kernel: Projection<B>,
    pub hidden_kernel: Projection<B>,
    pub memory_kernel: Projection<B>,
}

impl<B: Backend> LMUProjections<B> {
    /// Sample encoders first, then kernels, in field order.
    ///
    /// # Arguments
    /// * `config` - Cell configuration providing shapes and initializers
    /// * `input_size` - Number of input features
    /// * `rng` - Seeded generator
    /// * `device` - Device to create the weights on
    pub fn new(
        config: &LMUCellConfig,
        input_size: usize,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> LMUResult<Self> {
        let (units, order) = (config.units, config.order);
        Ok(Self {
            input_encoders: Projection::new(
                "input_encoders",
                [input_size, 1],
                &config.input_encoders,
                rng,
                device,
            )?,
            hidden_encoders: Projection::new(
                "hidden_encoders",
                [units, 1],
                &config.hidden_encoders,
                rng,
                device,
            )?,
            memory_encoders: Projection::new(
                "memory_encoders",
                [order, 1],
                &config.memory_encoders,
                rng,
                device,
            )?,
            input_kernel: Projection::new(
                "input_kernel",
                [input_size, units],
                &config.input_kernel,
                rng,
                device,
            )?,
            hidden_kernel: Projection::new(
                "hidden_kernel",
                [units, units],
                &config.hidden_kernel,
                rng,
                device,
            )?,
            memory_kernel: Projection::new(
                "memory_kernel",
                [order, units],
                &config.memory_kernel,
                rng,
                device,
            )?,
        })
    }

    /// Scalar drive `x·E_x + h·E_h + m·E_m`, `[batch, 1]`
    pub fn drive(&self, x: Tensor<B, 2>, h: Tensor<B, 2>, m: Tensor<B, 2>) -> Tensor<B, 2> {
        self.input_encoders.forward(x)
            + self.hidden_encoders.forward(h)
            + self.memory_encoders.forward(m)
    }

    /// `x·K_x + h·K_h + m·K_m`, `[batch, units]`
    pub fn hidden_preactivation(
        &self,
        x: Tensor<B, 2>,
        h: Tensor<B, 2>,
        m: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        self.input_kernel.forward(x)
            + self.hidden_kernel.forward(h)
            + self.memory_kernel.forward(m)
    }
}

/// Per-dimension forget gate on the memory injection.
#[derive(Module, Debug)]
pub struct ForgetGate<B: Backend> {
    pub input_kernel: Projection<B>,
    pub hidden_kernel: Projection<B>,
    bias: Param<Tensor<B, 2>>,
    activation: Ignored<Activation>,
}

impl<B: Backend> ForgetGate<B> {
    /// Create the gate for a cell of `units` hidden and `order` memory dimensions.
    ///
    /// # Arguments
    /// * `config` - Gate kernels, bias and activation name
    /// * `input_size` - Number of input features
    /// * `units` - Hidden size
    /// * `order` - Memory size, one gate value per dimension
    /// * `rng` - Seeded generator, continued after the cell's projections
    /// * `device` - Device to create the weights on
    pub fn new(
        config: &ForgetGateConfig,
        input_size: usize,
        units: usize,
        order: usize,
        rng: &mut StdRng,
        device: &B::Device,
    ) -> LMUResult<Self> {
        let activation = Activation::from_name(&config.gate_activation)?;
        let input_kernel = Projection::new(
            "forget_input_kernel",
            [input_size, order],
            &config.input_kernel,
            rng,
            device,
        )?;
        let hidden_kernel = Projection::new(
            "forget_hidden_kernel",
            [units, order],
            &config.hidden_kernel,
            rng,
            device,
        )?;
        let bias = config.bias.initializer.init([1, order], config.bias.trainable, rng, device)?;

        Ok(Self {
            input_kernel,
            hidden_kernel,
            bias,
            activation: Ignored(activation),
        })
    }

    /// `f = σ_g(x·F_x + h·F_h + b_f)`, `[batch, order]`
    pub fn forward(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        let pre =
            self.input_kernel.forward(x) + self.hidden_kernel.forward(h) + self.bias.val();
        self.activation.forward(pre)
    }

    pub fn activation(&self) -> Activation {
        *self.activation
    }
}
