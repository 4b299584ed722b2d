//! ODE cell: static and recomputed dynamics, gradients, configuration

use burn::backend::{Autodiff, NdArray};
use burn::tensor::{Distribution, Tensor};
use lmu::cells::RecurrentCell;
use lmu::config::{ForgetGateConfig, LMUCellConfig, LMUODECellConfig};
use lmu::dynamics::SolverStrategy;
use lmu::error::LMUError;
use lmu::rnn::LMUODE;

type Backend = NdArray<f32>;
type AutodiffBackend = Autodiff<NdArray<f32>>;

fn ode_config(method: &str) -> LMUODECellConfig {
    LMUODECellConfig::new(4, 4).with_theta(30.0).with_method(method)
}

#[test]
fn test_static_and_dynamic_paths_agree() {
    let device = Default::default();
    let input =
        Tensor::<Backend, 3>::random([3, 40, 2], Distribution::Uniform(-1.0, 1.0), &device);

    for (method, strategy, tolerance) in [
        ("euler", SolverStrategy::Euler, 1e-5),
        ("zoh", SolverStrategy::Zoh, 1e-4),
    ] {
        let frozen = LMUODE::<Backend>::new(ode_config(method), 2, &device).unwrap();
        let trainable = LMUODE::<Backend>::new(
            ode_config(method).with_trainable_dynamics(true, true, true),
            2,
            &device,
        )
        .unwrap();
        assert_eq!(frozen.cell().dynamics().strategy(), SolverStrategy::Static);
        assert_eq!(trainable.cell().dynamics().strategy(), strategy);

        let (out_static, state_static) = frozen.forward(input.clone(), None);
        let (out_dynamic, state_dynamic) = trainable.forward(input.clone(), None);

        let diff = (out_static - out_dynamic).abs().max().into_scalar();
        assert!(diff < tolerance, "{}: outputs differ by {}", method, diff);
        let diff = (state_static - state_dynamic).abs().max().into_scalar();
        assert!(diff < tolerance, "{}: states differ by {}", method, diff);
    }
}

#[test]
fn test_prepared_pair_is_reused_per_pass() {
    let device = Default::default();
    let config = ode_config("zoh").with_trainable_dynamics(true, false, false);
    let layer = LMUODE::<Backend>::new(config, 1, &device).unwrap();
    let cell = layer.cell();

    let first = cell.prepare();
    let second = cell.prepare();
    let diff = (first.a_t - second.a_t).abs().max().into_scalar();
    assert_eq!(diff, 0.0);
}

#[test]
fn test_gradient_reaches_dt() {
    let device = Default::default();

    for method in ["euler", "zoh"] {
        let layer = LMUODE::<AutodiffBackend>::new(
            ode_config(method).with_trainable_dynamics(true, false, false),
            2,
            &device,
        )
        .unwrap();

        let input = Tensor::<AutodiffBackend, 3>::ones([2, 10, 2], &device);
        let (output, _) = layer.forward(input, None);
        let grads = output.sum().backward();

        let grad = layer
            .cell()
            .dynamics()
            .dt()
            .grad(&grads)
            .expect("dt should receive a gradient");
        let value = grad.into_scalar();
        assert!(value.is_finite() && value != 0.0, "{}: d/d(dt) = {}", method, value);
    }
}

#[test]
fn test_frozen_dt_has_no_gradient() {
    let device = Default::default();
    let layer = LMUODE::<AutodiffBackend>::new(ode_config("zoh"), 2, &device).unwrap();

    let input = Tensor::<AutodiffBackend, 3>::ones([1, 5, 2], &device);
    let (output, _) = layer.forward(input, None);
    let grads = output.sum().backward();

    assert!(layer.cell().dynamics().dt().grad(&grads).is_none());
}

#[test]
fn test_unsupported_dynamic_method() {
    let device = Default::default();
    let config = ode_config("bilinear").with_trainable_dynamics(false, true, false);
    let err = LMUODE::<Backend>::new(config, 2, &device).unwrap_err();
    assert_eq!(err, LMUError::UnsupportedDynamicMethod("bilinear".to_string()));

    // Frozen dynamics accept any method
    assert!(LMUODE::<Backend>::new(ode_config("bilinear"), 2, &device).is_ok());
}

#[test]
fn test_config_round_trip() {
    let cell = LMUCellConfig::new(16, 6, 40.0)
        .with_method("bilinear")
        .with_forget_gate(ForgetGateConfig::default().with_gate_activation("sigmoid"));
    let json = serde_json::to_string(&cell).unwrap();
    let back: LMUCellConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cell);

    let ode = LMUODECellConfig::new(3, 5).with_return_states(true);
    let json = serde_json::to_value(&ode).unwrap();
    assert_eq!(json["method"], "euler");
    assert_eq!(json["encoders"]["initializer"]["kind"], "input_scaled");
    let back: LMUODECellConfig = serde_json::from_value(json).unwrap();
    assert_eq!(back, ode);
}

#[test]
fn test_cell_keeps_its_config() {
    let device = Default::default();
    let config = ode_config("euler").with_return_states(true);
    let layer = LMUODE::<Backend>::new(config.clone(), 2, &device).unwrap();
    assert_eq!(layer.cell().config(), &config);
    assert_eq!(layer.output_size(), 16);
}
