//! Cell configuration
//!
//! Plain serde structs holding everything needed to build a cell. Names for
//! the discretization method and activations are kept as strings and resolved
//! at construction, where an unknown name is a hard error.

use crate::activation::Activation;
use crate::cells::CellVariant;
use crate::error::{LMUError, LMUResult};
use crate::initializers::Initializer;
use crate::lti::{DelayKind, Discretization};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Initializer and trainable flag for one named weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub initializer: Initializer,
    #[serde(default = "default_true")]
    pub trainable: bool,
}

impl WeightConfig {
    pub fn trainable(initializer: Initializer) -> Self {
        Self {
            initializer,
            trainable: true,
        }
    }

    pub fn frozen(initializer: Initializer) -> Self {
        Self {
            initializer,
            trainable: false,
        }
    }
}

/// Forget gate of the gated variant.
///
/// `f = gate_activation(x·W_fx + h·W_fh + b_f)`, one value per memory dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgetGateConfig {
    #[serde(default = "ForgetGateConfig::default_kernel")]
    pub input_kernel: WeightConfig,
    #[serde(default = "ForgetGateConfig::default_kernel")]
    pub hidden_kernel: WeightConfig,
    #[serde(default = "ForgetGateConfig::default_bias")]
    pub bias: WeightConfig,
    #[serde(default = "default_linear")]
    pub gate_activation: String,
}

impl ForgetGateConfig {
    fn default_kernel() -> WeightConfig {
        WeightConfig::frozen(Initializer::Constant { value: 1.0 })
    }

    fn default_bias() -> WeightConfig {
        WeightConfig::frozen(Initializer::Zeros)
    }

    pub fn with_gate_activation(mut self, name: &str) -> Self {
        self.gate_activation = name.to_string();
        self
    }
}

impl Default for ForgetGateConfig {
    fn default() -> Self {
        Self {
            input_kernel: Self::default_kernel(),
            hidden_kernel: Self::default_kernel(),
            bias: Self::default_bias(),
            gate_activation: default_linear(),
        }
    }
}

fn default_linear() -> String {
    "linear".to_string()
}

fn default_tanh() -> String {
    "tanh".to_string()
}

fn default_zoh() -> String {
    "zoh".to_string()
}

fn default_euler() -> String {
    "euler".to_string()
}

fn default_lecun() -> WeightConfig {
    WeightConfig::trainable(Initializer::LecunUniform)
}

fn default_glorot() -> WeightConfig {
    WeightConfig::trainable(Initializer::GlorotNormal)
}

fn default_memory_encoders() -> WeightConfig {
    WeightConfig::trainable(Initializer::Zeros)
}

fn default_seed() -> u64 {
    42
}

/// Configuration of the base cell, or of the gated cell when `forget_gate` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LMUCellConfig {
    /// Width of the hidden state and of the output
    pub units: usize,
    /// Memory dimension `N`
    pub order: usize,
    /// Window length, in steps
    pub theta: f64,
    #[serde(default = "default_zoh")]
    pub method: String,
    #[serde(default)]
    pub delay: DelayKind,
    #[serde(default = "default_lecun")]
    pub input_encoders: WeightConfig,
    #[serde(default = "default_lecun")]
    pub hidden_encoders: WeightConfig,
    #[serde(default = "default_memory_encoders")]
    pub memory_encoders: WeightConfig,
    #[serde(default = "default_glorot")]
    pub input_kernel: WeightConfig,
    #[serde(default = "default_glorot")]
    pub hidden_kernel: WeightConfig,
    #[serde(default = "default_glorot")]
    pub memory_kernel: WeightConfig,
    #[serde(default)]
    pub trainable_a: bool,
    #[serde(default)]
    pub trainable_b: bool,
    #[serde(default = "default_tanh")]
    pub hidden_activation: String,
    /// Activation on the scalar drive. The base cell injects the drive
    /// unchanged, so anything but `linear` requires a forget gate.
    #[serde(default = "default_linear")]
    pub input_activation: String,
    #[serde(default)]
    pub forget_gate: Option<ForgetGateConfig>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl LMUCellConfig {
    pub fn new(units: usize, order: usize, theta: f64) -> Self {
        Self {
            units,
            order,
            theta,
            method: default_zoh(),
            delay: DelayKind::default(),
            input_encoders: default_lecun(),
            hidden_encoders: default_lecun(),
            memory_encoders: default_memory_encoders(),
            input_kernel: default_glorot(),
            hidden_kernel: default_glorot(),
            memory_kernel: default_glorot(),
            trainable_a: false,
            trainable_b: false,
            hidden_activation: default_tanh(),
            input_activation: default_linear(),
            forget_gate: None,
            seed: default_seed(),
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_delay(mut self, delay: DelayKind) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_forget_gate(mut self, gate: ForgetGateConfig) -> Self {
        self.forget_gate = Some(gate);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn variant(&self) -> CellVariant {
        if self.forget_gate.is_some() {
            CellVariant::Gated
        } else {
            CellVariant::Base
        }
    }

    pub fn discretization(&self) -> LMUResult<Discretization> {
        Discretization::from_name(&self.method)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> LMUResult<()> {
        validate_shape(self.units, self.order, self.theta)?;
        self.discretization()?;
        Activation::from_name(&self.hidden_activation)?;
        let input_activation = Activation::from_name(&self.input_activation)?;
        match &self.forget_gate {
            Some(gate) => {
                Activation::from_name(&gate.gate_activation)?;
            }
            None if input_activation != Activation::Linear => {
                return Err(LMUError::Config(format!(
                    "input_activation '{}' needs a forget gate, the base cell has none",
                    self.input_activation
                )));
            }
            None => {}
        }
        Ok(())
    }
}

/// Configuration of the ODE cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LMUODECellConfig {
    pub units: usize,
    pub order: usize,
    #[serde(default = "LMUODECellConfig::default_theta")]
    pub theta: f64,
    #[serde(default = "default_euler")]
    pub method: String,
    #[serde(default)]
    pub delay: DelayKind,
    /// Output the whole flattened memory (`units * order`) instead of `units`.
    #[serde(default)]
    pub return_states: bool,
    #[serde(default = "LMUODECellConfig::default_encoders")]
    pub encoders: WeightConfig,
    /// `None` decodes each unit's memory with the system's `C` row.
    #[serde(default)]
    pub decoder_initializer: Option<Initializer>,
    #[serde(default = "default_true")]
    pub trainable_decoders: bool,
    #[serde(default)]
    pub trainable_dt: bool,
    #[serde(default)]
    pub trainable_a: bool,
    #[serde(default)]
    pub trainable_b: bool,
    #[serde(default = "default_linear")]
    pub hidden_activation: String,
    #[serde(default = "default_tanh")]
    pub output_activation: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl LMUODECellConfig {
    fn default_theta() -> f64 {
        100.0
    }

    fn default_encoders() -> WeightConfig {
        WeightConfig::trainable(Initializer::InputScaled { value: 1.0 })
    }

    pub fn new(units: usize, order: usize) -> Self {
        Self {
            units,
            order,
            theta: Self::default_theta(),
            method: default_euler(),
            delay: DelayKind::default(),
            return_states: false,
            encoders: Self::default_encoders(),
            decoder_initializer: None,
            trainable_decoders: true,
            trainable_dt: false,
            trainable_a: false,
            trainable_b: false,
            hidden_activation: default_linear(),
            output_activation: default_tanh(),
            seed: default_seed(),
        }
    }

    pub fn with_theta(mut self, theta: f64) -> Self {
        self.theta = theta;
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_return_states(mut self, return_states: bool) -> Self {
        self.return_states = return_states;
        self
    }

    /// Mark `dt`, `A` and `B` trainable.
    pub fn with_trainable_dynamics(mut self, dt: bool, a: bool, b: bool) -> Self {
        self.trainable_dt = dt;
        self.trainable_a = a;
        self.trainable_b = b;
        self
    }

    pub fn discretization(&self) -> LMUResult<Discretization> {
        Discretization::from_name(&self.method)
    }

    pub fn output_size(&self) -> usize {
        if self.return_states {
            self.units * self.order
        } else {
            self.units
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> LMUResult<()> {
        validate_shape(self.units, self.order, self.theta)?;
        self.discretization()?;
        Activation::from_name(&self.hidden_activation)?;
        Activation::from_name(&self.output_activation)?;
        Ok(())
    }
}

fn validate_shape(units: usize, order: usize, theta: f64) -> LMUResult<()> {
    if units < 1 {
        return Err(LMUError::Config(format!("units must be >= 1, got {}", units)));
    }
    if order < 1 {
        return Err(LMUError::Config(format!("order must be >= 1, got {}", order)));
    }
    if !theta.is_finite() || theta <= 0.0 {
        return Err(LMUError::Config(format!(
            "theta must be finite and > 0, got {}",
            theta
        )));
    }
    Ok(())
}
