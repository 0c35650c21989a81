//! Sequence-regression model
//!
//! Composition of the fixed embedding table, the masked recurrent encoder,
//! and the tanh prediction head. The model owns its parameters; the trainer
//! holds aliased handles to the trainable subset.

mod embedding;
mod encoder;
pub mod init;
mod predictor;

pub use embedding::Embedding;
pub use encoder::Encoder;
pub use predictor::Predictor;

use crate::autograd::Tensor;
use crate::checkpoint::Checkpoint;
use crate::error::{Error, Result};
use crate::train::Batch;
use rand::Rng;

/// Names for snapshot tensors, in `parameters()` order
const PARAM_NAMES: [&str; 5] = [
    "encoder.w_xh",
    "encoder.w_hh",
    "encoder.b_h",
    "predictor.w",
    "predictor.b",
];

/// Recurrent sequence-regression model.
///
/// Maps a batch of padded embedding-index sequences to target vectors in
/// [-1, 1] per component. `max_sentence`, the embedding dimensionality, and
/// the class count are fixed at construction; batches that disagree fail with
/// a shape-mismatch error.
pub struct SequenceRegressor {
    embedding: Embedding,
    encoder: Encoder,
    predictor: Predictor,
    max_sentence: usize,
}

impl SequenceRegressor {
    /// Build a model around a pre-trained embedding table.
    pub fn new<R: Rng>(
        embedding: Embedding,
        hidden_size: usize,
        n_class: usize,
        max_sentence: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if hidden_size == 0 {
            return Err(Error::InvalidConfig("hidden_size must be > 0".into()));
        }
        if n_class == 0 {
            return Err(Error::InvalidConfig("n_class must be > 0".into()));
        }
        if max_sentence == 0 {
            return Err(Error::InvalidConfig("max_sentence must be > 0".into()));
        }
        let encoder = Encoder::new(embedding.embed_dim(), hidden_size, rng);
        let predictor = Predictor::new(hidden_size, n_class, rng);
        Ok(Self {
            embedding,
            encoder,
            predictor,
            max_sentence,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.encoder.hidden_size()
    }

    pub fn n_class(&self) -> usize {
        self.predictor.n_class()
    }

    pub fn max_sentence(&self) -> usize {
        self.max_sentence
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Forward pass over one batch.
    ///
    /// Validates the batch against the dimensions fixed at construction, then
    /// runs lookup → masked recurrence (with dropout at `keep_prob`) → head.
    pub fn forward<R: Rng>(&self, batch: &Batch, keep_prob: f32, rng: &mut R) -> Result<Tensor> {
        let b = batch.len();
        if b == 0 {
            return Err(Error::ShapeMismatch {
                context: "batch size",
                expected: 1,
                got: 0,
            });
        }
        if batch.inputs.len() != b * self.max_sentence {
            return Err(Error::ShapeMismatch {
                context: "batch inputs",
                expected: b * self.max_sentence,
                got: batch.inputs.len(),
            });
        }
        if batch.masks.len() != b * self.max_sentence {
            return Err(Error::ShapeMismatch {
                context: "batch masks",
                expected: b * self.max_sentence,
                got: batch.masks.len(),
            });
        }
        for &len in &batch.lengths {
            if len == 0 || len > self.max_sentence {
                return Err(Error::ShapeMismatch {
                    context: "sequence length",
                    expected: self.max_sentence,
                    got: len,
                });
            }
        }

        let embedded = self.embedding.forward(&batch.inputs)?;
        let hidden = self.encoder.forward(
            &embedded,
            &batch.lengths,
            self.max_sentence,
            keep_prob,
            rng,
        );
        Ok(self.predictor.forward(&hidden, b))
    }

    /// Trainable parameters (cell + head), aliased. The embedding table is
    /// fixed and excluded.
    pub fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.encoder.parameters();
        params.extend(self.predictor.parameters());
        params
    }

    /// Capture a checkpoint of the trainable parameters
    pub fn snapshot(&self, epoch: usize, dev_mse: f32) -> Checkpoint {
        let tensors = PARAM_NAMES
            .iter()
            .zip(self.parameters())
            .map(|(name, p)| ((*name).to_string(), p.to_vec()))
            .collect();
        Checkpoint {
            epoch,
            dev_mse,
            tensors,
        }
    }

    /// Load parameter values back from a checkpoint, shape-checked
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        let params = self.parameters();
        for (name, param) in PARAM_NAMES.iter().zip(&params) {
            let values = checkpoint.tensor(name).ok_or_else(|| {
                Error::Checkpoint(format!("checkpoint is missing tensor '{name}'"))
            })?;
            if values.len() != param.len() {
                return Err(Error::ShapeMismatch {
                    context: "checkpoint tensor",
                    expected: param.len(),
                    got: values.len(),
                });
            }
            param
                .data_mut()
                .as_slice_mut()
                .expect("parameters are contiguous")
                .copy_from_slice(values);
        }
        Ok(())
    }
}
