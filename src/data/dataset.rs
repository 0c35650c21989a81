//! Dataset value objects
//!
//! The external loader returns padded index arrays, targets, masks, and true
//! lengths; the constructors here define that contract and reject anything
//! misaligned. Datasets are immutable after construction and passed by
//! reference into the trainer.

use crate::error::{Error, Result};

/// One partition (train or dev) of padded examples.
#[derive(Debug)]
pub struct SequencePartition {
    inputs: Vec<u32>,
    targets: Vec<f32>,
    lengths: Vec<usize>,
    masks: Vec<bool>,
    num_observations: usize,
    max_sentence: usize,
    n_class: usize,
}

impl SequencePartition {
    /// Build a partition from loader output.
    ///
    /// All four sequences must be parallel (same observation count); every
    /// input and mask row must share the partition's padded width, every
    /// target row its class count; lengths must lie in `1..=max_sentence`
    /// and each mask must mark exactly the first `length` positions.
    pub fn new(
        inputs: Vec<Vec<u32>>,
        targets: Vec<Vec<f32>>,
        lengths: Vec<usize>,
        masks: Vec<Vec<bool>>,
    ) -> Result<Self> {
        let n = inputs.len();
        if n == 0 {
            return Err(Error::DataFormat(
                "partition must contain at least one observation".into(),
            ));
        }
        if targets.len() != n || lengths.len() != n || masks.len() != n {
            return Err(Error::DataFormat(format!(
                "parallel arrays disagree: {n} inputs, {} targets, {} lengths, {} masks",
                targets.len(),
                lengths.len(),
                masks.len()
            )));
        }

        let max_sentence = inputs[0].len();
        if max_sentence == 0 {
            return Err(Error::DataFormat("padded width is zero".into()));
        }
        let n_class = targets[0].len();
        if n_class == 0 {
            return Err(Error::DataFormat("target width is zero".into()));
        }

        for (i, row) in inputs.iter().enumerate() {
            if row.len() != max_sentence {
                return Err(Error::DataFormat(format!(
                    "input row {i} has width {}, expected {max_sentence}",
                    row.len()
                )));
            }
        }
        for (i, row) in targets.iter().enumerate() {
            if row.len() != n_class {
                return Err(Error::DataFormat(format!(
                    "target row {i} has width {}, expected {n_class}",
                    row.len()
                )));
            }
        }
        for (i, &len) in lengths.iter().enumerate() {
            if len == 0 || len > max_sentence {
                return Err(Error::DataFormat(format!(
                    "length {len} of observation {i} is outside 1..={max_sentence}"
                )));
            }
        }
        for (i, row) in masks.iter().enumerate() {
            if row.len() != max_sentence {
                return Err(Error::DataFormat(format!(
                    "mask row {i} has width {}, expected {max_sentence}",
                    row.len()
                )));
            }
            for (t, &valid) in row.iter().enumerate() {
                if valid != (t < lengths[i]) {
                    return Err(Error::DataFormat(format!(
                        "mask of observation {i} disagrees with its length {} at position {t}",
                        lengths[i]
                    )));
                }
            }
        }

        Ok(Self {
            inputs: inputs.into_iter().flatten().collect(),
            targets: targets.into_iter().flatten().collect(),
            lengths,
            masks: masks.into_iter().flatten().collect(),
            num_observations: n,
            max_sentence,
            n_class,
        })
    }

    pub fn num_observations(&self) -> usize {
        self.num_observations
    }

    pub fn max_sentence(&self) -> usize {
        self.max_sentence
    }

    pub fn n_class(&self) -> usize {
        self.n_class
    }

    /// Padded indices of one observation
    pub fn input_row(&self, i: usize) -> &[u32] {
        &self.inputs[i * self.max_sentence..(i + 1) * self.max_sentence]
    }

    pub fn target_row(&self, i: usize) -> &[f32] {
        &self.targets[i * self.n_class..(i + 1) * self.n_class]
    }

    pub fn length(&self, i: usize) -> usize {
        self.lengths[i]
    }

    pub fn mask_row(&self, i: usize) -> &[bool] {
        &self.masks[i * self.max_sentence..(i + 1) * self.max_sentence]
    }
}

/// Train and dev partitions sharing one padded width and class count.
#[derive(Debug)]
pub struct SequenceDataset {
    train: SequencePartition,
    dev: SequencePartition,
}

impl SequenceDataset {
    pub fn new(train: SequencePartition, dev: SequencePartition) -> Result<Self> {
        if train.max_sentence() != dev.max_sentence() {
            return Err(Error::DataFormat(format!(
                "padded width differs between partitions: train {}, dev {}",
                train.max_sentence(),
                dev.max_sentence()
            )));
        }
        if train.n_class() != dev.n_class() {
            return Err(Error::DataFormat(format!(
                "class count differs between partitions: train {}, dev {}",
                train.n_class(),
                dev.n_class()
            )));
        }
        Ok(Self { train, dev })
    }

    pub fn train(&self) -> &SequencePartition {
        &self.train
    }

    pub fn dev(&self) -> &SequencePartition {
        &self.dev
    }

    pub fn max_sentence(&self) -> usize {
        self.train.max_sentence()
    }

    pub fn n_class(&self) -> usize {
        self.train.n_class()
    }
}
