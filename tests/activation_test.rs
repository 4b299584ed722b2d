//! Tests for the named activations used by the cells

use burn::backend::NdArray;
use burn::tensor::Tensor;
use lmu::activation::{Activation, LeCun};
use lmu::error::LMUError;

type Backend = NdArray<f32>;

fn apply(activation: Activation, values: &[f32]) -> Vec<f32> {
    let device = Default::default();
    let x = Tensor::<Backend, 1>::from_floats(values, &device);
    activation.forward(x).into_data().to_vec::<f32>().unwrap()
}

#[test]
fn test_activation_values() {
    let inputs = [-3.0f32, -0.5, 0.0, 0.5, 3.0];

    let cases: [(Activation, fn(f32) -> f32); 6] = [
        (Activation::Linear, |x| x),
        (Activation::Tanh, |x| x.tanh()),
        (Activation::Sigmoid, |x| 1.0 / (1.0 + (-x).exp())),
        (Activation::HardSigmoid, |x| (0.2 * x + 0.5).clamp(0.0, 1.0)),
        (Activation::Relu, |x| x.max(0.0)),
        (Activation::LecunTanh, |x| 1.7159 * (0.666 * x).tanh()),
    ];

    for (activation, reference) in cases {
        let outputs = apply(activation, &inputs);
        for (x, y) in inputs.iter().zip(outputs) {
            assert!(
                (y - reference(*x)).abs() < 1e-5,
                "{} incorrect at x={}: got {}",
                activation.name(),
                x,
                y
            );
        }
    }
}

#[test]
fn test_activation_names_resolve() {
    for name in ["linear", "tanh", "sigmoid", "hard_sigmoid", "relu", "lecun_tanh"] {
        let activation = Activation::from_name(name).unwrap();
        assert_eq!(activation.name(), name);
    }
    assert_eq!(Activation::from_name("identity").unwrap(), Activation::Linear);
    assert_eq!(
        Activation::from_name("gelu_fast"),
        Err(LMUError::UnknownActivation("gelu_fast".to_string()))
    );
}

#[test]
fn test_lecun_tanh_saturation() {
    let device = Default::default();

    let y_pos = LeCun::forward(Tensor::<Backend, 1>::full([1], 100.0f32, &device));
    assert!(y_pos.into_scalar() > 1.7);

    let y_neg = LeCun::forward(Tensor::<Backend, 1>::full([1], -100.0f32, &device));
    assert!(y_neg.into_scalar() < -1.7);
}

#[test]
fn test_activation_preserves_shape() {
    let device = Default::default();
    let x = Tensor::<Backend, 2>::random(
        [4, 8],
        burn::tensor::Distribution::Uniform(-2.0, 2.0),
        &device,
    );

    for activation in [Activation::HardSigmoid, Activation::LecunTanh] {
        let y = activation.forward(x.clone());
        assert_eq!(y.dims(), [4, 8]);
        let values = y.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.is_finite()));
    }
}
