//! Pre-trained embedding table with a reserved padding row

use crate::autograd::Tensor;
use crate::error::{Error, Result};

/// Fixed embedding table.
///
/// Rows `0..vocab_size-1` map to vocabulary tokens; the last row is the
/// reserved padding index. The table is loaded once and never trained, so
/// lookups produce detached tensors. The padding row's values are irrelevant:
/// the encoder's length-aware recurrence never lets a padded position reach
/// the hidden state.
#[derive(Debug)]
pub struct Embedding {
    weight: Tensor,
    vocab_size: usize,
    embed_dim: usize,
}

impl Embedding {
    /// Build the table from loader output (one row per vocabulary entry,
    /// padding row last).
    pub fn from_pretrained(table: &[Vec<f32>]) -> Result<Self> {
        if table.is_empty() {
            return Err(Error::DataFormat("embedding table is empty".into()));
        }
        let embed_dim = table[0].len();
        if embed_dim == 0 {
            return Err(Error::DataFormat("embedding rows are zero-width".into()));
        }
        let mut flat = Vec::with_capacity(table.len() * embed_dim);
        for (i, row) in table.iter().enumerate() {
            if row.len() != embed_dim {
                return Err(Error::DataFormat(format!(
                    "embedding row {i} has width {}, expected {embed_dim}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Ok(Self {
            weight: Tensor::from_vec(flat, false),
            vocab_size: table.len(),
            embed_dim,
        })
    }

    /// Reserved padding index (the last row)
    pub fn padding_index(&self) -> u32 {
        (self.vocab_size - 1) as u32
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    /// Look up rows for a slice of token ids.
    ///
    /// Returns a detached tensor of `token_ids.len() * embed_dim` values.
    /// An id outside the table is a hard error rather than a silent zero row.
    pub fn forward(&self, token_ids: &[u32]) -> Result<Tensor> {
        let weight = self.weight.data();
        let weight_slice = weight.as_slice().expect("embedding weight must be contiguous");

        let mut output = Vec::with_capacity(token_ids.len() * self.embed_dim);
        for &token_id in token_ids {
            let idx = token_id as usize;
            if idx >= self.vocab_size {
                return Err(Error::ShapeMismatch {
                    context: "embedding lookup index",
                    expected: self.vocab_size,
                    got: idx,
                });
            }
            let start = idx * self.embed_dim;
            output.extend_from_slice(&weight_slice[start..start + self.embed_dim]);
        }

        Ok(Tensor::from_vec(output, false))
    }
}
