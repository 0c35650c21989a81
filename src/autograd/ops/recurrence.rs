//! Length-aware recurrence autograd op
//!
//! The recurrence is fused into a single op with a hand-derived
//! backpropagation-through-time pass. The unrolled graph has a diamond shape
//! (each state feeds both the next cell input and the pass-through for padded
//! rows), which the recursive tape must not visit twice; fusing keeps the
//! backward pass single-visit, the same way the attention-style ops cache
//! their intermediates.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Single-layer tanh recurrence over a padded batch, honoring true lengths.
///
/// `h_t = tanh(x_t · W_xh + h_{t-1} · W_hh + b)` for rows still inside their
/// sequence; a row's state freezes once `t >= length`, so padded positions
/// can never influence the returned state.
///
/// # Arguments
/// * `x` - Embedded inputs, flattened (batch × steps × embed), row-major
/// * `w_xh` - Input weights (embed × hidden)
/// * `w_hh` - Recurrent weights (hidden × hidden)
/// * `b_h` - Cell bias (hidden)
/// * `lengths` - True sequence length per example, `1..=steps`
///
/// # Returns
/// Final hidden state per example, flattened (batch × hidden).
pub fn masked_rnn(
    x: &Tensor,
    w_xh: &Tensor,
    w_hh: &Tensor,
    b_h: &Tensor,
    lengths: &[usize],
    steps: usize,
    embed: usize,
    hidden: usize,
) -> Tensor {
    let batch = lengths.len();
    assert_eq!(x.len(), batch * steps * embed, "input size mismatch");
    assert_eq!(w_xh.len(), embed * hidden, "input weight size mismatch");
    assert_eq!(w_hh.len(), hidden * hidden, "recurrent weight size mismatch");
    assert_eq!(b_h.len(), hidden, "cell bias size mismatch");

    // Forward pass, caching every state for the backward sweep
    let states = {
        let x_data = x.data();
        let x_slice = x_data.as_slice().expect("input must be contiguous");
        let wx_data = w_xh.data();
        let wx = wx_data.as_slice().expect("weights must be contiguous");
        let wh_data = w_hh.data();
        let wh = wh_data.as_slice().expect("weights must be contiguous");
        let b_data = b_h.data();
        let b = b_data.as_slice().expect("bias must be contiguous");

        let mut states: Vec<Vec<f32>> = Vec::with_capacity(steps + 1);
        states.push(vec![0.0f32; batch * hidden]);

        for t in 0..steps {
            let prev = &states[t];
            let mut next = prev.clone();
            for (i, &len) in lengths.iter().enumerate() {
                if t >= len {
                    continue;
                }
                let x_row = &x_slice[(i * steps + t) * embed..(i * steps + t + 1) * embed];
                let h_row = &prev[i * hidden..(i + 1) * hidden];
                for h in 0..hidden {
                    let mut pre = b[h];
                    for (e, &x_val) in x_row.iter().enumerate() {
                        pre += x_val * wx[e * hidden + h];
                    }
                    for (j, &h_val) in h_row.iter().enumerate() {
                        pre += h_val * wh[j * hidden + h];
                    }
                    next[i * hidden + h] = pre.tanh();
                }
            }
            states.push(next);
        }
        states
    };

    let output = states[steps].clone();
    let requires_grad = x.requires_grad()
        || w_xh.requires_grad()
        || w_hh.requires_grad()
        || b_h.requires_grad();
    let mut result = Tensor::new(Array1::from(output), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MaskedRnnBackward {
            x: x.clone(),
            w_xh: w_xh.clone(),
            w_hh: w_hh.clone(),
            b_h: b_h.clone(),
            lengths: lengths.to_vec(),
            states,
            steps,
            embed,
            hidden,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MaskedRnnBackward {
    x: Tensor,
    w_xh: Tensor,
    w_hh: Tensor,
    b_h: Tensor,
    lengths: Vec<usize>,
    states: Vec<Vec<f32>>,
    steps: usize,
    embed: usize,
    hidden: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MaskedRnnBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let (steps, embed, hidden) = (self.steps, self.embed, self.hidden);
            let batch = self.lengths.len();

            let x_data = self.x.data();
            let x_slice = x_data.as_slice().expect("input must be contiguous");
            let wx_data = self.w_xh.data();
            let wx = wx_data.as_slice().expect("weights must be contiguous");
            let wh_data = self.w_hh.data();
            let wh = wh_data.as_slice().expect("weights must be contiguous");

            let mut grad_wx = vec![0.0f32; embed * hidden];
            let mut grad_wh = vec![0.0f32; hidden * hidden];
            let mut grad_b = vec![0.0f32; hidden];
            let mut grad_x = if self.x.requires_grad() {
                Some(vec![0.0f32; batch * steps * embed])
            } else {
                None
            };

            // ∂L/∂h_T arrives from downstream; sweep time in reverse
            let mut grad_h: Vec<f32> = grad_output.to_vec();

            for t in (0..steps).rev() {
                let h_t = &self.states[t + 1];
                let h_prev = &self.states[t];
                let mut grad_prev = vec![0.0f32; batch * hidden];

                for (i, &len) in self.lengths.iter().enumerate() {
                    let row = i * hidden;
                    if t >= len {
                        // Frozen step: the state passed through unchanged
                        grad_prev[row..row + hidden].copy_from_slice(&grad_h[row..row + hidden]);
                        continue;
                    }

                    // Through tanh: ∂L/∂pre = ∂L/∂h_t · (1 - h_t²)
                    let mut grad_pre = vec![0.0f32; hidden];
                    for h in 0..hidden {
                        let y = h_t[row + h];
                        grad_pre[h] = grad_h[row + h] * (1.0 - y * y);
                    }

                    for h in 0..hidden {
                        grad_b[h] += grad_pre[h];
                    }

                    let x_row = &x_slice[(i * steps + t) * embed..(i * steps + t + 1) * embed];
                    for (e, &x_val) in x_row.iter().enumerate() {
                        for h in 0..hidden {
                            grad_wx[e * hidden + h] += x_val * grad_pre[h];
                        }
                    }

                    let h_row = &h_prev[row..row + hidden];
                    for (j, &h_val) in h_row.iter().enumerate() {
                        for h in 0..hidden {
                            grad_wh[j * hidden + h] += h_val * grad_pre[h];
                        }
                    }

                    // Recurrent path: ∂L/∂h_{t-1} = ∂L/∂pre · W_hh^T
                    for j in 0..hidden {
                        let mut acc = 0.0;
                        for (h, &g) in grad_pre.iter().enumerate() {
                            acc += g * wh[j * hidden + h];
                        }
                        grad_prev[row + j] = acc;
                    }

                    if let Some(gx) = grad_x.as_mut() {
                        for e in 0..embed {
                            let mut acc = 0.0;
                            for (h, &g) in grad_pre.iter().enumerate() {
                                acc += g * wx[e * hidden + h];
                            }
                            gx[(i * steps + t) * embed + e] = acc;
                        }
                    }
                }

                grad_h = grad_prev;
            }

            if self.w_xh.requires_grad() {
                self.w_xh.accumulate_grad(Array1::from(grad_wx));
            }
            if self.w_hh.requires_grad() {
                self.w_hh.accumulate_grad(Array1::from(grad_wh));
            }
            if self.b_h.requires_grad() {
                self.b_h.accumulate_grad(Array1::from(grad_b));
            }
            if let Some(gx) = grad_x {
                self.x.accumulate_grad(Array1::from(gx));
            }

            if let Some(op) = self.x.backward_op() {
                op.backward();
            }
            if let Some(op) = self.w_xh.backward_op() {
                op.backward();
            }
            if let Some(op) = self.w_hh.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b_h.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_cell(embed: usize, hidden: usize) -> (Tensor, Tensor, Tensor) {
        let w_xh: Vec<f32> = (0..embed * hidden)
            .map(|i| ((i as f32) * 0.37).sin() * 0.5)
            .collect();
        let w_hh: Vec<f32> = (0..hidden * hidden)
            .map(|i| ((i as f32) * 0.73).cos() * 0.3)
            .collect();
        let b: Vec<f32> = vec![0.1; hidden];
        (
            Tensor::from_vec(w_xh, true),
            Tensor::from_vec(w_hh, true),
            Tensor::from_vec(b, true),
        )
    }

    #[test]
    fn test_single_step_matches_cell_equation() {
        let (w_xh, w_hh, b) = small_cell(2, 2);
        let x = Tensor::from_vec(vec![0.5, -0.5], false);
        let out = masked_rnn(&x, &w_xh, &w_hh, &b, &[1], 1, 2, 2);

        let wx = w_xh.to_vec();
        let bv = b.to_vec();
        for h in 0..2 {
            let pre = bv[h] + 0.5 * wx[h] - 0.5 * wx[2 + h];
            assert_abs_diff_eq!(out.data()[h], pre.tanh(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_padded_positions_do_not_influence_output() {
        let (w_xh, w_hh, b) = small_cell(2, 3);

        // Same two real positions, wildly different padding content
        let x_a = Tensor::from_vec(vec![0.5, -0.5, 0.2, 0.8, 0.0, 0.0, 0.0, 0.0], false);
        let x_b = Tensor::from_vec(vec![0.5, -0.5, 0.2, 0.8, 99.0, -99.0, 7.0, 7.0], false);

        let out_a = masked_rnn(&x_a, &w_xh, &w_hh, &b, &[2], 4, 2, 3);
        let out_b = masked_rnn(&x_b, &w_xh, &w_hh, &b, &[2], 4, 2, 3);

        assert_eq!(out_a.to_vec(), out_b.to_vec());
    }

    #[test]
    fn test_rows_evolve_independently() {
        let (w_xh, w_hh, b) = small_cell(2, 2);

        // One batch of two rows vs. the same rows in separate batches
        let x_pair = Tensor::from_vec(vec![0.3, 0.1, -0.2, 0.4, 0.9, -0.9, 0.0, 0.0], false);
        let joint = masked_rnn(&x_pair, &w_xh, &w_hh, &b, &[2, 1], 2, 2, 2);

        let x_first = Tensor::from_vec(vec![0.3, 0.1, -0.2, 0.4], false);
        let solo_first = masked_rnn(&x_first, &w_xh, &w_hh, &b, &[2], 2, 2, 2);
        let x_second = Tensor::from_vec(vec![0.9, -0.9, 0.0, 0.0], false);
        let solo_second = masked_rnn(&x_second, &w_xh, &w_hh, &b, &[1], 2, 2, 2);

        assert_eq!(&joint.to_vec()[..2], &solo_first.to_vec()[..]);
        assert_eq!(&joint.to_vec()[2..], &solo_second.to_vec()[..]);
    }

    #[test]
    fn test_output_bounded_by_tanh() {
        let (w_xh, w_hh, b) = small_cell(3, 4);
        let x = Tensor::from_vec(vec![10.0; 2 * 5 * 3], false);
        let out = masked_rnn(&x, &w_xh, &w_hh, &b, &[5, 3], 5, 3, 4);
        for &v in out.data().iter() {
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let embed = 2;
        let hidden = 2;
        let steps = 3;
        let (w_xh, w_hh, b) = small_cell(embed, hidden);
        let x = Tensor::from_vec(vec![0.5, -0.3, 0.2, 0.7, -0.1, 0.4], false);
        let lengths = [2usize];

        // Analytic gradient of sum(output) w.r.t. every cell parameter
        let out = masked_rnn(&x, &w_xh, &w_hh, &b, &lengths, steps, embed, hidden);
        out.set_grad(ndarray::Array1::ones(hidden));
        out.backward_op().unwrap().backward();

        let sum_out = |w_xh: &Tensor, w_hh: &Tensor, b: &Tensor| -> f32 {
            masked_rnn(&x, w_xh, w_hh, b, &lengths, steps, embed, hidden)
                .data()
                .sum()
        };

        let eps = 1e-3f32;
        for param in [&w_xh, &w_hh, &b] {
            let analytic = param.grad().unwrap();
            for idx in 0..param.len() {
                let orig = param.data()[idx];
                param.data_mut()[idx] = orig + eps;
                let plus = sum_out(&w_xh, &w_hh, &b);
                param.data_mut()[idx] = orig - eps;
                let minus = sum_out(&w_xh, &w_hh, &b);
                param.data_mut()[idx] = orig;

                let numeric = (plus - minus) / (2.0 * eps);
                assert_abs_diff_eq!(analytic[idx], numeric, epsilon = 1e-2);
            }
        }
    }

    #[test]
    fn test_no_gradient_from_padded_steps() {
        let embed = 2;
        let hidden = 2;
        let (w_xh, w_hh, b) = small_cell(embed, hidden);

        // Length 1 of 3 steps; gradients must only see step 0
        let x = Tensor::from_vec(vec![0.5, -0.3, 9.0, 9.0, 9.0, 9.0], false);
        let out = masked_rnn(&x, &w_xh, &w_hh, &b, &[1], 3, embed, hidden);
        out.set_grad(ndarray::Array1::ones(hidden));
        out.backward_op().unwrap().backward();
        let grad_with_pad = w_xh.grad().unwrap();

        w_xh.zero_grad();
        w_hh.zero_grad();
        b.zero_grad();

        let x_short = Tensor::from_vec(vec![0.5, -0.3], false);
        let out_short = masked_rnn(&x_short, &w_xh, &w_hh, &b, &[1], 1, embed, hidden);
        out_short.set_grad(ndarray::Array1::ones(hidden));
        out_short.backward_op().unwrap().backward();
        let grad_short = w_xh.grad().unwrap();

        assert_eq!(grad_with_pad.to_vec(), grad_short.to_vec());
    }
}
