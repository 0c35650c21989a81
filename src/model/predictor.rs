//! Prediction head

use crate::autograd::{ops, Tensor};
use crate::model::init;
use rand::Rng;

/// Linear projection plus tanh from hidden state to target space.
///
/// `prediction = tanh(hidden · W + b)`, so every output component lies in
/// [-1, 1]. Targets must be pre-scaled into the same range by the caller;
/// the head applies no further normalization.
pub struct Predictor {
    w: Tensor,
    b: Tensor,
    hidden_size: usize,
    n_class: usize,
}

impl Predictor {
    pub fn new<R: Rng>(hidden_size: usize, n_class: usize, rng: &mut R) -> Self {
        Self {
            w: init::xavier_uniform(hidden_size, n_class, rng),
            b: init::zeros_bias(n_class),
            hidden_size,
            n_class,
        }
    }

    pub fn n_class(&self) -> usize {
        self.n_class
    }

    /// Project a (batch × hidden) matrix to (batch × n_class) predictions
    pub fn forward(&self, hidden: &Tensor, batch: usize) -> Tensor {
        let projected = ops::matmul(hidden, &self.w, batch, self.hidden_size, self.n_class);
        let shifted = ops::add_bias(&projected, &self.b, batch, self.n_class);
        ops::tanh(&shifted)
    }

    /// Trainable parameters, aliased
    pub fn parameters(&self) -> Vec<Tensor> {
        vec![self.w.clone(), self.b.clone()]
    }
}
