//! Training loss

use crate::autograd::{BackwardOp, Tensor};
use std::rc::Rc;

/// Default weight of the prediction term against the regularizer
pub const DEFAULT_PREDICTION_SCALE: f32 = 10.0;

/// Regularized squared-error training loss
///
/// `loss = α · mean_batch(Σ_classes (target − prediction)²) / 2
///       + λ · Σ_params(Σ param²) / 2`
///
/// α is fixed at construction; λ is supplied per call so it can be annealed
/// or held constant across batches. Minimized by gradient descent: the
/// backward pass seeds `∂loss/∂pred = α·(pred − target)/B` and adds `λ·θ` to
/// every trainable parameter's gradient.
pub struct RegularizedSquaredError {
    alpha: f32,
}

impl Default for RegularizedSquaredError {
    fn default() -> Self {
        Self::new(DEFAULT_PREDICTION_SCALE)
    }
}

impl RegularizedSquaredError {
    pub fn new(alpha: f32) -> Self {
        Self { alpha }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Compute the scalar loss and wire up the backward pass.
    ///
    /// `params` are the trainable parameters the λ-term ranges over.
    pub fn forward(
        &self,
        predictions: &Tensor,
        targets: &Tensor,
        batch_size: usize,
        l2_reg: f32,
        params: &[Tensor],
    ) -> Tensor {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "predictions and targets must have same length"
        );
        assert!(batch_size > 0, "batch_size must be > 0");

        let diff = &*predictions.data() - &*targets.data();
        let prediction_term =
            self.alpha * diff.iter().map(|d| d * d).sum::<f32>() / (2.0 * batch_size as f32);

        let mut reg_term = 0.0;
        if l2_reg != 0.0 {
            for param in params {
                reg_term += param.data().iter().map(|w| w * w).sum::<f32>();
            }
            reg_term *= l2_reg / 2.0;
        }

        let mut loss = Tensor::from_vec(vec![prediction_term + reg_term], true);

        if predictions.requires_grad() {
            // ∂loss/∂pred = α · (pred − target) / B
            let grad = diff * (self.alpha / batch_size as f32);
            loss.set_backward_op(Rc::new(RegularizedSquaredErrorBackward {
                predictions: predictions.clone(),
                grad,
                l2_reg,
                params: params.to_vec(),
            }));
        }

        loss
    }
}

struct RegularizedSquaredErrorBackward {
    predictions: Tensor,
    grad: ndarray::Array1<f32>,
    l2_reg: f32,
    params: Vec<Tensor>,
}

impl BackwardOp for RegularizedSquaredErrorBackward {
    fn backward(&self) {
        self.predictions.accumulate_grad(self.grad.clone());

        if let Some(op) = self.predictions.backward_op() {
            op.backward();
        }

        // ∂(λ·Σθ²/2)/∂θ = λ·θ
        if self.l2_reg != 0.0 {
            for param in &self.params {
                if param.requires_grad() {
                    let reg_grad = &*param.data() * self.l2_reg;
                    param.accumulate_grad(reg_grad);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_prediction_term_value() {
        let loss_fn = RegularizedSquaredError::new(10.0);
        let pred = Tensor::from_vec(vec![0.0, 0.0, 1.0, 1.0], true);
        let target = Tensor::from_vec(vec![1.0, 0.0, 1.0, 0.0], false);

        // Squared errors: 1 + 0 + 0 + 1 = 2 over batch of 2
        let loss = loss_fn.forward(&pred, &target, 2, 0.0, &[]);
        assert_abs_diff_eq!(loss.item(), 10.0 * 2.0 / (2.0 * 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_reg_strength_is_pure_prediction_loss() {
        // Regardless of parameter values, λ = 0 contributes exactly nothing
        let loss_fn = RegularizedSquaredError::new(10.0);
        let pred = Tensor::from_vec(vec![0.5, -0.5], true);
        let target = Tensor::from_vec(vec![0.0, 0.0], false);
        let params = vec![Tensor::from_vec(vec![100.0, -100.0], true)];

        let with_params = loss_fn.forward(&pred, &target, 1, 0.0, &params);
        let without = loss_fn.forward(&pred, &target, 1, 0.0, &[]);
        assert_eq!(with_params.item(), without.item());
    }

    #[test]
    fn test_reg_term_value() {
        let loss_fn = RegularizedSquaredError::new(10.0);
        let pred = Tensor::from_vec(vec![0.0], true);
        let target = Tensor::from_vec(vec![0.0], false);
        let params = vec![Tensor::from_vec(vec![2.0, 1.0], true)];

        // λ · (4 + 1) / 2
        let loss = loss_fn.forward(&pred, &target, 1, 0.5, &params);
        assert_abs_diff_eq!(loss.item(), 0.5 * 5.0 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_prediction_gradient() {
        let loss_fn = RegularizedSquaredError::new(10.0);
        let pred = Tensor::from_vec(vec![0.5, -0.25], true);
        let target = Tensor::from_vec(vec![0.0, 0.25], false);

        let loss = loss_fn.forward(&pred, &target, 2, 0.0, &[]);
        loss.backward_op().unwrap().backward();

        let grad = pred.grad().unwrap();
        // α · (pred − target) / B = 10 · diff / 2
        assert_abs_diff_eq!(grad[0], 10.0 * 0.5 / 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grad[1], 10.0 * (-0.5) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_regularization_gradient_added_to_params() {
        let loss_fn = RegularizedSquaredError::new(10.0);
        let pred = Tensor::from_vec(vec![0.0], true);
        let target = Tensor::from_vec(vec![0.0], false);
        let params = vec![Tensor::from_vec(vec![2.0, -3.0], true)];

        let loss = loss_fn.forward(&pred, &target, 1, 0.1, &params);
        loss.backward_op().unwrap().backward();

        let grad = params[0].grad().unwrap();
        assert_abs_diff_eq!(grad[0], 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(grad[1], -0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_loss_non_negative_for_zero_reg() {
        let loss_fn = RegularizedSquaredError::default();
        let pred = Tensor::from_vec(vec![0.9, -0.9, 0.1], true);
        let target = Tensor::from_vec(vec![-0.9, 0.9, 0.1], false);
        let loss = loss_fn.forward(&pred, &target, 3, 0.0, &[]);
        assert!(loss.item() >= 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The λ = 0 loss never depends on parameter contents
            #[test]
            fn zero_lambda_ignores_params(
                pred_vals in proptest::collection::vec(-1.0f32..1.0, 1..8),
                param_vals in proptest::collection::vec(-100.0f32..100.0, 1..8),
            ) {
                let loss_fn = RegularizedSquaredError::default();
                let n = pred_vals.len();
                let pred = Tensor::from_vec(pred_vals, true);
                let target = Tensor::zeros(n, false);
                let params = vec![Tensor::from_vec(param_vals, true)];

                let with_params = loss_fn.forward(&pred, &target, n, 0.0, &params);
                let without = loss_fn.forward(&pred, &target, n, 0.0, &[]);
                prop_assert_eq!(with_params.item(), without.item());
            }
        }
    }
}
