//! Delay recall with an LMU memory
//!
//! Feeds a sine wave into the delay system on its own, then through the
//! sequence layers. Run with `RUST_LOG=debug` to see construction logs.

use burn::backend::NdArray;
use burn::tensor::Tensor;
use lmu::prelude::*;
use nalgebra::DVector;

const ORDER: usize = 8;
const THETA: f64 = 20.0;
const STEPS: usize = 200;

fn signal(t: f64) -> f64 {
    (t * 0.1).sin()
}

fn main() -> LMUResult<()> {
    env_logger::init();
    println!("=== LMU Delay Recall ===\n");

    type Backend = NdArray<f32>;
    let device = Default::default();

    // Part 1: the bare delay system
    println!("Part 1: Legendre delay of {} steps, order {}", THETA, ORDER);
    let system = realize(ORDER, THETA, DelayKind::Legendre, &Realizer::Identity)?;
    let discrete = DiscreteSystem::from_continuous(&system, 1.0, Discretization::Zoh)?;

    let mut memory = DVector::zeros(ORDER);
    let mut squared_error = 0.0;
    let mut counted = 0;
    for t in 0..STEPS {
        memory = discrete.step_delta(&memory, signal(t as f64));
        if t as f64 >= 2.0 * THETA {
            let recalled = (system.c() * &memory)[(0, 0)];
            squared_error += (recalled - signal(t as f64 - THETA + 1.0)).powi(2);
            counted += 1;
        }
    }
    println!("  RMS recall error: {:.4}", (squared_error / counted as f64).sqrt());
    println!();

    let values: Vec<f32> = (0..STEPS).map(|t| signal(t as f64) as f32).collect();
    let input =
        Tensor::<Backend, 1>::from_floats(values.as_slice(), &device).reshape([1, STEPS, 1]);

    // Part 2: gated LMU layer
    println!("Part 2: Gated LMU layer");
    let config =
        LMUCellConfig::new(16, ORDER, THETA).with_forget_gate(ForgetGateConfig::default());
    let lmu = LMU::<Backend>::new(config, 1, &device)?.with_return_sequences(false);
    let (output, state) = lmu.forward(input.clone(), None);
    println!("  Variant:      {:?}", lmu.cell().variant());
    println!("  Output shape: {:?}", output.dims());
    println!("  Memory shape: {:?}", state.memory.dims());
    println!();

    // Part 3: ODE layer exposing the full memory
    println!("Part 3: LMU ODE layer");
    let config = LMUODECellConfig::new(4, ORDER)
        .with_theta(THETA)
        .with_method("zoh")
        .with_return_states(true);
    let ode = LMUODE::<Backend>::new(config, 1, &device)?;
    let (output, state) = ode.forward(input, None);
    println!("  Strategy:     {:?}", ode.cell().dynamics().strategy());
    println!("  Output shape: {:?}", output.dims());
    println!("  State shape:  {:?}", state.dims());

    Ok(())
}
