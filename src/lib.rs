//! valorar: recurrent sequence regression for aspect-rating prediction
//!
//! Trains a single-layer recurrent model that maps variable-length sequences
//! of pre-trained word embeddings to fixed-size numeric target vectors,
//! minimizing a regularized squared-error loss and retaining the checkpoint
//! with the best held-out MSE.
//!
//! The moving parts:
//!
//! - [`data`] - padded dataset value objects and the infinite shuffled
//!   [`BatchSampler`](data::BatchSampler)
//! - [`model`] - fixed embedding table, length-aware recurrent
//!   [`Encoder`](model::Encoder), and tanh [`Predictor`](model::Predictor)
//!   head, composed into [`SequenceRegressor`](model::SequenceRegressor)
//! - [`autograd`] - the tape-based reverse-mode engine underneath
//! - [`optim`] - [`Adam`](optim::Adam) and [`SGD`](optim::SGD) parameter
//!   updates with optional gradient clipping
//! - [`train`] - loss, evaluation metric, and the epoch-driving
//!   [`Trainer`](train::Trainer)
//! - [`checkpoint`] - parameter snapshots and persistence sinks
//!
//! Corpus parsing, embedding-file loading, and durable checkpoint formats are
//! collaborator concerns; the constructors in [`data`] and [`model`] define
//! the array-shape contract those collaborators must satisfy.
//!
//! Predictions are bounded to [-1, 1] per component by the tanh head, so
//! targets must be pre-scaled into that range by the caller.

pub mod autograd;
pub mod checkpoint;
pub mod data;
pub mod error;
pub mod model;
pub mod optim;
pub mod train;

pub use autograd::Tensor;
pub use error::{Error, Result};
