//! Activation function autograd operations

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Hyperbolic tangent activation
///
/// Bounds every output component to [-1, 1]; both the recurrent cell and the
/// prediction head rely on this range.
pub fn tanh(a: &Tensor) -> Tensor {
    let data = a.data().mapv(f32::tanh);
    let requires_grad = a.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        // Cache the forward output values, not the output tensor: holding the
        // tensor would make the backward op and its product reference each other
        let backward_op = Rc::new(TanhBackward {
            a: a.clone(),
            output: result.data().clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct TanhBackward {
    a: Tensor,
    output: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for TanhBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // ∂tanh/∂x = 1 - tanh(x)², reusing the cached forward output
                let grad_a: Vec<f32> = self
                    .output
                    .iter()
                    .zip(grad_output.iter())
                    .map(|(&y, &grad)| grad * (1.0 - y * y))
                    .collect();
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}
