//! Discrete dynamics providers
//!
//! Both providers hand the cells a [`DiscretePair`] in row-vector form: the
//! memory update reads `m·a_t + u·b`.
//!
//! - [`DynamicsSolver`] backs the ODE cell. With dt, A and B frozen the pair is
//!   discretized once on the host and cached. Otherwise it is recomputed from
//!   the current parameter values with tensor ops, so gradients reach dt, A, B.
//! - [`DeltaDynamics`] backs the base and gated cells: the delta-form pair is
//!   discretized once with `dt = 1` and stored as (optionally trainable) weights.

use crate::error::{LMUError, LMUResult};
use crate::initializers::param_from_array;
use crate::lti::{expm, ContinuousSystem, DiscreteSystem, Discretization};
use burn::module::{Ignored, Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use nalgebra::DMatrix;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-step transition in row-vector form.
///
/// `a_t` is `[order, order]` and holds the transposed transition (or the
/// transposed `ΔA` for delta-form cells); `b` is the `[1, order]` input row.
#[derive(Debug, Clone)]
pub struct DiscretePair<B: Backend> {
    pub a_t: Tensor<B, 2>,
    pub b: Tensor<B, 2>,
}

/// How [`DynamicsSolver`] produces its pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStrategy {
    /// Discretized once at construction
    Static,
    /// `A_d = I + dt·A`, `B_d = dt·B` recomputed every pass
    Euler,
    /// Augmented matrix exponential recomputed every pass
    Zoh,
}

/// Which of the continuous-time parameters receive gradients
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainableDynamics {
    pub dt: bool,
    pub a: bool,
    pub b: bool,
}

impl TrainableDynamics {
    pub fn any(&self) -> bool {
        self.dt || self.a || self.b
    }
}

/// Continuous `(dt, A, B)` parameters plus the strategy turning them into a pair.
#[derive(Module, Debug)]
pub struct DynamicsSolver<B: Backend> {
    /// `Aᵀ`, `[order, order]`
    a_t: Param<Tensor<B, 2>>,
    /// `Bᵀ`, `[1, order]`
    b: Param<Tensor<B, 2>>,
    /// Shared sample interval, `[1]`
    dt: Param<Tensor<B, 1>>,
    /// Frozen host discretization of the initial values
    initial_a_t: Param<Tensor<B, 2>>,
    initial_b: Param<Tensor<B, 2>>,
    strategy: Ignored<SolverStrategy>,
    trainable: Ignored<TrainableDynamics>,
    #[module(skip)]
    order: usize,
}

impl<B: Backend> DynamicsSolver<B> {
    /// Build the solver for `system`, starting from sample interval `dt`.
    ///
    /// When nothing is trainable any `method` is accepted and applied on the
    /// host. Otherwise only `euler` and `zoh` can be recomputed per pass.
    ///
    /// # Arguments
    /// * `system` - Continuous system providing the initial `A` and `B`
    /// * `method` - Discretization method
    /// * `trainable` - Which of `dt`, `A`, `B` receive gradients
    /// * `dt` - Initial sample interval
    /// * `device` - Device to create the parameters on
    ///
    /// # Returns
    /// The solver, or [`LMUError::UnsupportedDynamicMethod`] when a trainable
    /// parameter is combined with a method that cannot be recomputed.
    pub fn new(
        system: &ContinuousSystem,
        method: Discretization,
        trainable: TrainableDynamics,
        dt: f64,
        device: &B::Device,
    ) -> LMUResult<Self> {
        let order = system.order();
        let a_t = param_from_matrix(&system.a().transpose(), trainable.a, device);
        let b = param_from_matrix(&system.b().transpose(), trainable.b, device);
        let dt_param = Param::from_tensor(Tensor::<B, 1>::from_floats([dt as f32], device))
            .set_require_grad(trainable.dt);

        let strategy = match (trainable.any(), method) {
            (false, _) => SolverStrategy::Static,
            (true, Discretization::Euler) => SolverStrategy::Euler,
            (true, Discretization::Zoh) => SolverStrategy::Zoh,
            (true, other) => return Err(LMUError::UnsupportedDynamicMethod(other.to_string())),
        };
        let initial = DiscreteSystem::from_continuous(system, dt, method)?;

        log::debug!(
            "Dynamics solver: strategy={:?}, method={}, order={}, trainable={:?}",
            strategy,
            method,
            order,
            trainable
        );

        Ok(Self {
            a_t,
            b,
            dt: dt_param,
            initial_a_t: param_from_matrix(&initial.a().transpose(), false, device),
            initial_b: param_from_matrix(&initial.b().transpose(), false, device),
            strategy: Ignored(strategy),
            trainable: Ignored(trainable),
            order,
        })
    }

    pub fn strategy(&self) -> SolverStrategy {
        *self.strategy
    }

    pub fn trainable(&self) -> TrainableDynamics {
        *self.trainable
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Current sample interval, `[1]`
    pub fn dt(&self) -> Tensor<B, 1> {
        self.dt.val()
    }

    /// Pair discretized on the host from the initial `dt`, `A`, `B`.
    pub fn initial_pair(&self) -> DiscretePair<B> {
        DiscretePair {
            a_t: self.initial_a_t.val(),
            b: self.initial_b.val(),
        }
    }

    /// Discrete pair for the next sequence pass.
    pub fn discretize(&self) -> DiscretePair<B> {
        match *self.strategy {
            SolverStrategy::Static => self.initial_pair(),
            SolverStrategy::Euler => self.euler(),
            SolverStrategy::Zoh => self.zoh(),
        }
    }

    fn euler(&self) -> DiscretePair<B> {
        let dt = self.dt.val().reshape([1, 1]);
        let identity = Tensor::<B, 2>::eye(self.order, &self.a_t.device());
        DiscretePair {
            a_t: identity + self.a_t.val() * dt.clone(),
            b: self.b.val() * dt,
        }
    }

    fn zoh(&self) -> DiscretePair<B> {
        let n = self.order;
        let device = self.a_t.device();
        let top = Tensor::cat(vec![self.a_t.val().transpose(), self.b.val().transpose()], 1);
        let augmented = Tensor::cat(vec![top, Tensor::zeros([1, n + 1], &device)], 0);

        let exp = expm(augmented * self.dt.val().reshape([1, 1]));
        DiscretePair {
            a_t: exp.clone().slice([0..n, 0..n]).transpose(),
            b: exp.slice([0..n, n..n + 1]).transpose(),
        }
    }
}

/// Delta-form pair `(ΔAᵀ, B_dᵀ)` stored directly as weights.
#[derive(Module, Debug)]
pub struct DeltaDynamics<B: Backend> {
    delta_a_t: Param<Tensor<B, 2>>,
    b: Param<Tensor<B, 2>>,
}

impl<B: Backend> DeltaDynamics<B> {
    /// Discretize `system` with `dt = 1` and keep `ΔA = A_d − I`.
    ///
    /// # Arguments
    /// * `system` - Continuous delay system
    /// * `method` - Any [`Discretization`]; applied once on the host
    /// * `trainable_a` - Whether `ΔA` receives gradients
    /// * `trainable_b` - Whether `B_d` receives gradients
    /// * `device` - Device to create the parameters on
    pub fn new(
        system: &ContinuousSystem,
        method: Discretization,
        trainable_a: bool,
        trainable_b: bool,
        device: &B::Device,
    ) -> LMUResult<Self> {
        let discrete = DiscreteSystem::from_continuous(system, 1.0, method)?;
        Ok(Self {
            delta_a_t: param_from_matrix(&discrete.delta_a().transpose(), trainable_a, device),
            b: param_from_matrix(&discrete.b().transpose(), trainable_b, device),
        })
    }

    pub fn pair(&self) -> DiscretePair<B> {
        DiscretePair {
            a_t: self.delta_a_t.val(),
            b: self.b.val(),
        }
    }
}

/// Upload a host matrix as a `[rows, cols]` parameter.
pub(crate) fn param_from_matrix<B: Backend>(
    matrix: &DMatrix<f64>,
    trainable: bool,
    device: &B::Device,
) -> Param<Tensor<B, 2>> {
    let shape = [matrix.nrows(), matrix.ncols()];
    let array = Array2::from_shape_fn((shape[0], shape[1]), |(i, j)| matrix[(i, j)] as f32);
    param_from_array(&array.into_dyn(), shape, trainable, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lti::{realize, DelayKind, Realizer};
    use burn::backend::NdArray;

    type Backend = NdArray<f32>;

    fn values(tensor: Tensor<Backend, 2>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap()
    }

    fn host_row_major(matrix: &DMatrix<f64>) -> Vec<f32> {
        matrix.transpose().iter().map(|&v| v as f32).collect()
    }

    fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{} vs {}", a, e);
        }
    }

    fn system() -> ContinuousSystem {
        realize(4, 6.0, DelayKind::Legendre, &Realizer::Identity).unwrap()
    }

    #[test]
    fn test_strategy_selection() {
        let device = Default::default();
        let sys = system();

        let frozen = DynamicsSolver::<Backend>::new(
            &sys,
            Discretization::Bilinear,
            TrainableDynamics::default(),
            1.0,
            &device,
        )
        .unwrap();
        assert_eq!(frozen.strategy(), SolverStrategy::Static);

        let trainable = TrainableDynamics {
            dt: true,
            ..Default::default()
        };
        let euler =
            DynamicsSolver::<Backend>::new(&sys, Discretization::Euler, trainable, 1.0, &device)
                .unwrap();
        assert_eq!(euler.strategy(), SolverStrategy::Euler);

        let err = DynamicsSolver::<Backend>::new(
            &sys,
            Discretization::Bilinear,
            trainable,
            1.0,
            &device,
        )
        .unwrap_err();
        assert_eq!(err, LMUError::UnsupportedDynamicMethod("bilinear".to_string()));
    }

    #[test]
    fn test_dynamic_matches_host() {
        let device = Default::default();
        let sys = system();
        let trainable = TrainableDynamics {
            dt: true,
            a: true,
            b: true,
        };

        for method in [Discretization::Euler, Discretization::Zoh] {
            let host = DiscreteSystem::from_continuous(&sys, 0.5, method).unwrap();
            let solver =
                DynamicsSolver::<Backend>::new(&sys, method, trainable, 0.5, &device).unwrap();
            let pair = solver.discretize();

            assert_eq!(pair.a_t.dims(), [4, 4]);
            assert_eq!(pair.b.dims(), [1, 4]);
            assert_close(&values(pair.a_t), &host_row_major(&host.a().transpose()), 1e-5);
            assert_close(&values(pair.b), &host_row_major(&host.b().transpose()), 1e-5);
        }
    }

    #[test]
    fn test_static_pair_is_cached_host_result() {
        let device = Default::default();
        let sys = system();
        let host = DiscreteSystem::from_continuous(&sys, 1.0, Discretization::Zoh).unwrap();
        let solver = DynamicsSolver::<Backend>::new(
            &sys,
            Discretization::Zoh,
            TrainableDynamics::default(),
            1.0,
            &device,
        )
        .unwrap();

        let pair = solver.discretize();
        assert_close(&values(pair.a_t), &host_row_major(&host.a().transpose()), 1e-6);
        assert_close(&values(pair.b), &host_row_major(&host.b().transpose()), 1e-6);
    }

    #[test]
    fn test_every_strategy_starts_from_initial_pair() {
        let device = Default::default();
        let sys = system();
        let cases = [
            (Discretization::Bilinear, TrainableDynamics::default()),
            (Discretization::Euler, TrainableDynamics { a: true, ..Default::default() }),
            (Discretization::Zoh, TrainableDynamics { b: true, ..Default::default() }),
        ];

        for (method, trainable) in cases {
            let solver =
                DynamicsSolver::<Backend>::new(&sys, method, trainable, 1.0, &device).unwrap();
            let initial = solver.initial_pair();
            let pair = solver.discretize();
            assert_close(&values(pair.a_t), &values(initial.a_t), 1e-5);
            assert_close(&values(pair.b), &values(initial.b), 1e-5);
        }
    }

    #[test]
    fn test_delta_dynamics_subtracts_identity() {
        let device = Default::default();
        let sys = system();
        let host = DiscreteSystem::from_continuous(&sys, 1.0, Discretization::Zoh).unwrap();
        let delta =
            DeltaDynamics::<Backend>::new(&sys, Discretization::Zoh, false, false, &device).unwrap();

        let pair = delta.pair();
        let a_t = values(pair.a_t);
        let expected = host_row_major(&host.a().transpose());
        for i in 0..4 {
            for j in 0..4 {
                let shift = if i == j { 1.0 } else { 0.0 };
                assert!((a_t[i * 4 + j] + shift - expected[i * 4 + j]).abs() < 1e-6);
            }
        }
    }
}
