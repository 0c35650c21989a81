//! Optimizers for the training loop

mod adam;
mod clip;
mod optimizer;
mod sgd;

pub use adam::Adam;
pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use sgd::SGD;
