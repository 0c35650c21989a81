//! Shuffled mini-batch sampling

use crate::data::SequencePartition;
use crate::train::Batch;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;

/// Infinite, restartable iterator of shuffled mini-batches over one partition.
///
/// Each full pass draws a fresh uniformly random permutation of observation
/// indices, applied identically to inputs, targets, lengths, and masks, then
/// slices it into contiguous chunks of `batch_size` (the last chunk of a pass
/// may be shorter). The iterator never terminates on its own; callers define
/// an epoch as [`batches_per_pass`](Self::batches_per_pass) draws.
pub struct BatchSampler<'a, R: Rng = ThreadRng> {
    partition: &'a SequencePartition,
    batch_size: usize,
    order: Vec<usize>,
    cursor: usize,
    rng: R,
}

impl<'a> BatchSampler<'a, ThreadRng> {
    /// Sampler over the process-global random state
    pub fn new(partition: &'a SequencePartition, batch_size: usize) -> Self {
        Self::with_rng(partition, batch_size, rand::rng())
    }
}

impl<'a, R: Rng> BatchSampler<'a, R> {
    /// Sampler with an injected generator (deterministic tests)
    pub fn with_rng(partition: &'a SequencePartition, batch_size: usize, rng: R) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        let mut sampler = Self {
            partition,
            batch_size,
            order: Vec::new(),
            cursor: 0,
            rng,
        };
        sampler.reshuffle();
        sampler
    }

    /// Number of batches that constitute one full pass:
    /// `ceil(num_observations / batch_size)`
    pub fn batches_per_pass(&self) -> usize {
        self.partition.num_observations().div_ceil(self.batch_size)
    }

    fn reshuffle(&mut self) {
        self.order = (0..self.partition.num_observations()).collect();
        self.order.shuffle(&mut self.rng);
        self.cursor = 0;
    }

    fn gather(&self, indices: &[usize]) -> Batch {
        let max_sentence = self.partition.max_sentence();
        let n_class = self.partition.n_class();

        let mut inputs = Vec::with_capacity(indices.len() * max_sentence);
        let mut targets = Vec::with_capacity(indices.len() * n_class);
        let mut lengths = Vec::with_capacity(indices.len());
        let mut masks = Vec::with_capacity(indices.len() * max_sentence);

        for &i in indices {
            inputs.extend_from_slice(self.partition.input_row(i));
            targets.extend_from_slice(self.partition.target_row(i));
            lengths.push(self.partition.length(i));
            masks.extend_from_slice(self.partition.mask_row(i));
        }

        Batch::new(inputs, targets, lengths, masks)
    }
}

impl<R: Rng> Iterator for BatchSampler<'_, R> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            self.reshuffle();
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.gather(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SequencePartition;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Partition whose target value identifies each observation
    fn tagged_partition(n: usize) -> SequencePartition {
        let width = 3;
        let inputs = (0..n).map(|i| vec![i as u32; width]).collect();
        let targets = (0..n).map(|i| vec![i as f32]).collect();
        let lengths = vec![width; n];
        let masks = vec![vec![true; width]; n];
        SequencePartition::new(inputs, targets, lengths, masks).unwrap()
    }

    fn collect_pass_tags<R: Rng>(sampler: &mut BatchSampler<'_, R>) -> Vec<usize> {
        let mut tags = Vec::new();
        for _ in 0..sampler.batches_per_pass() {
            let batch = sampler.next().unwrap();
            tags.extend(batch.targets.iter().map(|&t| t as usize));
        }
        tags
    }

    #[test]
    fn test_full_pass_covers_every_observation_once() {
        let partition = tagged_partition(10);
        let mut sampler = BatchSampler::with_rng(&partition, 4, StdRng::seed_from_u64(1));

        let mut tags = collect_pass_tags(&mut sampler);
        tags.sort_unstable();
        assert_eq!(tags, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_final_chunk_is_short() {
        let partition = tagged_partition(10);
        let mut sampler = BatchSampler::with_rng(&partition, 4, StdRng::seed_from_u64(2));

        assert_eq!(sampler.batches_per_pass(), 3);
        assert_eq!(sampler.next().unwrap().len(), 4);
        assert_eq!(sampler.next().unwrap().len(), 4);
        assert_eq!(sampler.next().unwrap().len(), 2);
    }

    #[test]
    fn test_oversized_batch_returns_everything() {
        let partition = tagged_partition(5);
        let mut sampler = BatchSampler::with_rng(&partition, 64, StdRng::seed_from_u64(3));

        assert_eq!(sampler.batches_per_pass(), 1);
        for _ in 0..3 {
            let mut tags: Vec<usize> = sampler
                .next()
                .unwrap()
                .targets
                .iter()
                .map(|&t| t as usize)
                .collect();
            tags.sort_unstable();
            assert_eq!(tags, (0..5).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_sampler_never_terminates() {
        let partition = tagged_partition(3);
        let mut sampler = BatchSampler::with_rng(&partition, 2, StdRng::seed_from_u64(4));
        for _ in 0..50 {
            assert!(sampler.next().is_some());
        }
    }

    #[test]
    fn test_passes_reshuffle() {
        let partition = tagged_partition(64);
        let mut sampler = BatchSampler::with_rng(&partition, 64, StdRng::seed_from_u64(5));

        let first: Vec<usize> = sampler
            .next()
            .unwrap()
            .targets
            .iter()
            .map(|&t| t as usize)
            .collect();
        let second: Vec<usize> = sampler
            .next()
            .unwrap()
            .targets
            .iter()
            .map(|&t| t as usize)
            .collect();

        // Same multiset, near-certainly different order for 64 elements
        assert_ne!(first, second);
        let mut a = first;
        let mut b = second;
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rows_stay_aligned_after_shuffle() {
        let partition = tagged_partition(8);
        let mut sampler = BatchSampler::with_rng(&partition, 3, StdRng::seed_from_u64(6));

        for _ in 0..sampler.batches_per_pass() {
            let batch = sampler.next().unwrap();
            for (row, &tag) in batch.targets.iter().enumerate() {
                // Inputs were filled with the observation's own tag
                let inputs = &batch.inputs[row * 3..(row + 1) * 3];
                assert!(inputs.iter().all(|&v| v == tag as u32));
            }
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every pass is a permutation regardless of n and batch size
            #[test]
            fn pass_is_always_a_permutation(
                n in 1usize..40,
                batch_size in 1usize..50,
                seed in 0u64..1000,
            ) {
                let partition = tagged_partition(n);
                let mut sampler =
                    BatchSampler::with_rng(&partition, batch_size, StdRng::seed_from_u64(seed));

                let mut tags = collect_pass_tags(&mut sampler);
                tags.sort_unstable();
                prop_assert_eq!(tags, (0..n).collect::<Vec<_>>());
            }
        }
    }
}
