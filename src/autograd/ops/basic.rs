//! Basic autograd operations

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Add a bias vector to every row of a row-major (rows x cols) matrix
pub fn add_bias(x: &Tensor, bias: &Tensor, rows: usize, cols: usize) -> Tensor {
    assert_eq!(x.len(), rows * cols, "input size mismatch");
    assert_eq!(bias.len(), cols, "bias size mismatch");

    let data = {
        let x_data = x.data();
        let bias_data = bias.data();
        let mut out = x_data.to_vec();
        for r in 0..rows {
            for c in 0..cols {
                out[r * cols + c] += bias_data[c];
            }
        }
        Array1::from(out)
    };

    let requires_grad = x.requires_grad() || bias.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBiasBackward {
            x: x.clone(),
            bias: bias.clone(),
            rows,
            cols,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBiasBackward {
    x: Tensor,
    bias: Tensor,
    rows: usize,
    cols: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for AddBiasBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.x.requires_grad() {
                // ∂L/∂x = ∂L/∂out (broadcast is identity per element)
                self.x.accumulate_grad(grad.clone());
            }
            if self.bias.requires_grad() {
                // ∂L/∂bias = column sums of ∂L/∂out
                let mut grad_bias = vec![0.0f32; self.cols];
                for r in 0..self.rows {
                    for c in 0..self.cols {
                        grad_bias[c] += grad[r * self.cols + c];
                    }
                }
                self.bias.accumulate_grad(Array1::from(grad_bias));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.bias.backward_op() {
                op.backward();
            }
        }
    }
}
