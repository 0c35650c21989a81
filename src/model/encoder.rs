//! Masked recurrent encoder

use crate::autograd::{ops, Tensor};
use crate::model::init;
use rand::Rng;

/// Single-layer recurrent encoder over padded embedding sequences.
///
/// Summarizes each example into one hidden vector covering only its first
/// `length` positions. During training a dropout attenuation is applied to
/// the cell's output connections; evaluation passes use keep-probability 1.
pub struct Encoder {
    w_xh: Tensor,
    w_hh: Tensor,
    b_h: Tensor,
    embed_dim: usize,
    hidden_size: usize,
}

impl Encoder {
    /// Create an encoder with Xavier-initialized weights and zero bias
    pub fn new<R: Rng>(embed_dim: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            w_xh: init::xavier_uniform(embed_dim, hidden_size, rng),
            w_hh: init::xavier_uniform(hidden_size, hidden_size, rng),
            b_h: init::zeros_bias(hidden_size),
            embed_dim,
            hidden_size,
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Encode a batch of embedded sequences.
    ///
    /// * `embedded` - (batch × steps × embed_dim), flattened row-major
    /// * `lengths` - true sequence lengths, one per example
    /// * `keep_prob` - dropout keep-probability; 1.0 disables attenuation
    pub fn forward<R: Rng>(
        &self,
        embedded: &Tensor,
        lengths: &[usize],
        steps: usize,
        keep_prob: f32,
        rng: &mut R,
    ) -> Tensor {
        let state = ops::masked_rnn(
            embedded,
            &self.w_xh,
            &self.w_hh,
            &self.b_h,
            lengths,
            steps,
            self.embed_dim,
            self.hidden_size,
        );
        ops::dropout(&state, keep_prob, rng)
    }

    /// Trainable parameters, aliased
    pub fn parameters(&self) -> Vec<Tensor> {
        vec![self.w_xh.clone(), self.w_hh.clone(), self.b_h.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_encoder_output_shape() {
        let mut rng = StdRng::seed_from_u64(5);
        let encoder = Encoder::new(3, 4, &mut rng);

        let embedded = Tensor::from_vec(vec![0.1; 2 * 5 * 3], false);
        let out = encoder.forward(&embedded, &[5, 2], 5, 1.0, &mut rng);
        assert_eq!(out.len(), 2 * 4);
    }

    #[test]
    fn test_encoder_eval_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(6);
        let encoder = Encoder::new(2, 3, &mut rng);
        let embedded = Tensor::from_vec(vec![0.4, -0.2, 0.9, 0.1], false);

        let a = encoder.forward(&embedded, &[2], 2, 1.0, &mut rng);
        let b = encoder.forward(&embedded, &[2], 2, 1.0, &mut rng);
        assert_eq!(a.to_vec(), b.to_vec());
    }

    #[test]
    fn test_encoder_parameter_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let encoder = Encoder::new(3, 4, &mut rng);
        let params = encoder.parameters();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0].len(), 3 * 4);
        assert_eq!(params[1].len(), 4 * 4);
        assert_eq!(params[2].len(), 4);
    }
}
