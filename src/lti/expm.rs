//! Matrix exponential on Burn tensors.
//!
//! Used when `dt`, `A` or `B` are trainable and the zero-order-hold pair has to
//! be recomputed inside the autodiff graph. Scaling and squaring around a
//! degree-12 Taylor polynomial: the matrix is scaled by `2^-s` until its
//! ∞-norm is at most ½, where the truncation error is below `1e-14`.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

const TAYLOR_DEGREE: usize = 12;
const SCALED_NORM: f64 = 0.5;

/// `exp(M)` for a square matrix `M`.
///
/// Only the number of squarings is read back from the device. The result is
/// built from `matmul`, `add` and scalar ops, so gradients flow through it.
pub fn expm<B: Backend>(matrix: Tensor<B, 2>) -> Tensor<B, 2> {
    let [n, cols] = matrix.dims();
    assert_eq!(n, cols, "expm requires a square matrix, got [{}, {}]", n, cols);

    let device = matrix.device();
    let norm: f64 = matrix
        .clone()
        .abs()
        .sum_dim(1)
        .max()
        .into_scalar()
        .elem::<f64>();

    let squarings = if norm.is_finite() && norm > SCALED_NORM {
        (norm / SCALED_NORM).log2().ceil() as i32
    } else {
        0
    };
    let scaled = matrix.div_scalar(2f64.powi(squarings));

    // Horner: I + X(I + X/2(I + X/3(...)))
    let identity = Tensor::<B, 2>::eye(n, &device);
    let mut result = identity.clone();
    for k in (1..=TAYLOR_DEGREE).rev() {
        result = identity.clone() + scaled.clone().matmul(result).div_scalar(k as f64);
    }

    for _ in 0..squarings {
        result = result.clone().matmul(result);
    }
    result
}
