//! Autograd operations for the sequence-regression graph

mod activations;
mod basic;
mod dropout;
mod matmul;
mod recurrence;

pub use activations::tanh;
pub use basic::add_bias;
pub use dropout::dropout;
pub use matmul::{matmul, transpose};
pub use recurrence::masked_rnn;
