//! Dropout attenuation on tensor values

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Inverted dropout: each element is kept with probability `keep_prob` and
/// scaled by `1 / keep_prob`, so the expected value is unchanged and no
/// rescaling is needed at evaluation time.
///
/// `keep_prob = 1.0` disables the attenuation entirely and returns an alias of
/// the input, which is how evaluation passes opt out.
pub fn dropout<R: Rng>(a: &Tensor, keep_prob: f32, rng: &mut R) -> Tensor {
    assert!(
        keep_prob > 0.0 && keep_prob <= 1.0,
        "keep_prob must be in (0, 1]"
    );

    if keep_prob >= 1.0 {
        return a.clone();
    }

    let scale = 1.0 / keep_prob;
    let mask: Array1<f32> = (0..a.len())
        .map(|_| {
            if rng.random::<f32>() < keep_prob {
                scale
            } else {
                0.0
            }
        })
        .collect();

    let data = &*a.data() * &mask;
    let requires_grad = a.requires_grad();
    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(DropoutBackward {
            a: a.clone(),
            mask,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct DropoutBackward {
    a: Tensor,
    mask: Array1<f32>,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for DropoutBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                // Dropped units pass no gradient; kept units carry the scale
                let grad_a = grad * &self.mask;
                self.a.accumulate_grad(grad_a);
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
        }
    }
}
