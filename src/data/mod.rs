//! Dataset storage and batch sampling

mod dataset;
mod sampler;

pub use dataset::{SequenceDataset, SequencePartition};
pub use sampler::BatchSampler;
