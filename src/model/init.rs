//! Parameter initialization

use crate::autograd::Tensor;
use rand::Rng;

/// Xavier/Glorot uniform initialization for a (fan_in × fan_out) weight matrix
///
/// Samples uniformly from [-limit, limit] with limit = sqrt(6 / (fan_in + fan_out)),
/// which keeps activation variance stable through tanh layers.
pub fn xavier_uniform<R: Rng>(fan_in: usize, fan_out: usize, rng: &mut R) -> Tensor {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    let data: Vec<f32> = (0..fan_in * fan_out)
        .map(|_| rng.random_range(-limit..limit))
        .collect();
    Tensor::from_vec(data, true)
}

/// Zero-initialized bias vector
pub fn zeros_bias(len: usize) -> Tensor {
    Tensor::zeros(len, true)
}
