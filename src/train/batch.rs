//! Batch data structure

/// One mini-batch of padded examples.
///
/// All rows share the dataset's padded width; `inputs` and `masks` are
/// flattened row-major (batch × max_sentence), `targets` is flattened
/// (batch × n_class).
#[derive(Clone, Debug)]
pub struct Batch {
    /// Padded vocabulary indices
    pub inputs: Vec<u32>,
    /// Target vectors
    pub targets: Vec<f32>,
    /// True sequence length per example
    pub lengths: Vec<usize>,
    /// Validity mask, true for the first `length` positions of each row
    pub masks: Vec<bool>,
}

impl Batch {
    pub fn new(inputs: Vec<u32>, targets: Vec<f32>, lengths: Vec<usize>, masks: Vec<bool>) -> Self {
        Self {
            inputs,
            targets,
            lengths,
            masks,
        }
    }

    /// Number of examples in the batch
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}
