//! Evaluation metrics

use crate::autograd::Tensor;

/// Trait for evaluation metrics
pub trait Metric {
    /// Compute the metric given predictions and targets
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> f32;

    /// Name of the metric
    fn name(&self) -> &str;

    /// Whether higher values are better (true) or lower (false)
    fn higher_is_better(&self) -> bool {
        true
    }
}

/// Unnormalized squared error: `Σ_batch Σ_classes (target − prediction)²`
///
/// Deliberately a sum, not a mean: the trainer accumulates it across every
/// batch of a pass and divides by the observation count once, which keeps the
/// short final batch weighted correctly. Never regularized; this is the sole
/// checkpoint-selection criterion.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredError;

impl Metric for SquaredError {
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> f32 {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "predictions and targets must have same length"
        );
        predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(&p, &t)| (t - p) * (t - p))
            .sum()
    }

    fn name(&self) -> &'static str {
        "SquaredError"
    }

    fn higher_is_better(&self) -> bool {
        false
    }
}
