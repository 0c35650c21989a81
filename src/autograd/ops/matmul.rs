//! Matrix multiplication autograd op over row-major flattened matrices.

use crate::autograd::{BackwardOp, Tensor};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Transpose a row-major matrix (rows x cols) to (cols x rows)
#[inline]
pub fn transpose(data: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    let mut transposed = vec![0.0f32; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            transposed[c * rows + r] = data[r * cols + c];
        }
    }
    transposed
}

/// C = A @ B on row-major slices, A (m x k), B (k x n).
pub(crate) fn matmul_compute(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            let c_row = &mut c[i * n..(i + 1) * n];
            for (c_val, &b_val) in c_row.iter_mut().zip(b_row) {
                *c_val += a_ip * b_val;
            }
        }
    }
    c
}

/// Matrix multiplication
///
/// Computes C = A @ B where A is m×k, B is k×n, both flattened row-major.
pub fn matmul(a: &Tensor, b: &Tensor, m: usize, k: usize, n: usize) -> Tensor {
    assert_eq!(a.len(), m * k, "matrix A size mismatch");
    assert_eq!(b.len(), k * n, "matrix B size mismatch");

    let result_data = {
        let a_data = a.data();
        let b_data = b.data();
        matmul_compute(
            a_data.as_slice().expect("matrix A must be contiguous"),
            b_data.as_slice().expect("matrix B must be contiguous"),
            m,
            k,
            n,
        )
    };

    let requires_grad = a.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(Array1::from(result_data), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(MatmulBackward {
            a: a.clone(),
            b: b.clone(),
            m,
            k,
            n,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct MatmulBackward {
    a: Tensor,
    b: Tensor,
    m: usize,
    k: usize,
    n: usize,
    result_grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl BackwardOp for MatmulBackward {
    fn backward(&self) {
        if let Some(grad_output) = self.result_grad.borrow().as_ref() {
            let grad_c = grad_output.as_slice().expect("gradient must be contiguous");

            if self.a.requires_grad() {
                // ∂L/∂A = ∂L/∂C @ B^T  (m×n) @ (n×k) = (m×k)
                let b_data = self.b.data();
                let b_t = transpose(b_data.as_slice().expect("contiguous"), self.k, self.n);
                let grad_a = matmul_compute(grad_c, &b_t, self.m, self.n, self.k);
                self.a.accumulate_grad(Array1::from(grad_a));
            }

            if self.b.requires_grad() {
                // ∂L/∂B = A^T @ ∂L/∂C  (k×m) @ (m×n) = (k×n)
                let a_data = self.a.data();
                let a_t = transpose(a_data.as_slice().expect("contiguous"), self.m, self.k);
                let grad_b = matmul_compute(&a_t, grad_c, self.k, self.m, self.n);
                self.b.accumulate_grad(Array1::from(grad_b));
            }

            // Recursively call backward on inputs
            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b.backward_op() {
                op.backward();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_2x3() {
        // [1, 2, 3]      [1, 4]
        // [4, 5, 6]  ->  [2, 5]
        //                [3, 6]
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(transpose(&data, 2, 3), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_round_trip() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let t = transpose(&data, 3, 2);
        assert_eq!(transpose(&t, 2, 3), data);
    }

    #[test]
    fn test_matmul_compute_2x3_3x2() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let b = vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let c = matmul_compute(&a, &b, 2, 3, 2);
        assert_eq!(c, vec![58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_identity() {
        let a = vec![0.5, -1.5, 2.0, 3.0, -0.25, 1.0];
        let identity = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let c = matmul_compute(&a, &identity, 2, 3, 3);
        assert_eq!(c, a);
    }

    #[test]
    fn test_matmul_no_grad() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], false);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], false);
        let c = matmul(&a, &b, 2, 2, 2);
        assert!(!c.requires_grad());
        assert!(c.backward_op().is_none());
        assert_eq!(c.to_vec(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_matmul_backward_accumulates_both() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], true);
        let c = matmul(&a, &b, 2, 2, 2);

        c.set_grad(ndarray::arr1(&[1.0, 1.0, 1.0, 1.0]));
        c.backward_op().unwrap().backward();

        // grad_A = grad_C @ B^T, rows sum B columns
        let grad_a = a.grad().unwrap();
        assert_eq!(grad_a.to_vec(), vec![11.0, 15.0, 11.0, 15.0]);
        // grad_B = A^T @ grad_C
        let grad_b = b.grad().unwrap();
        assert_eq!(grad_b.to_vec(), vec![4.0, 4.0, 6.0, 6.0]);
    }

    #[test]
    fn test_matmul_grad_respects_requires_grad() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], true);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], false);
        let c = matmul(&a, &b, 2, 2, 2);

        c.set_grad(ndarray::arr1(&[1.0, 1.0, 1.0, 1.0]));
        c.backward_op().unwrap().backward();

        assert!(a.grad().is_some());
        assert!(b.grad().is_none());
    }

    #[test]
    #[should_panic(expected = "matrix A size mismatch")]
    fn test_matmul_size_mismatch() {
        let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], false);
        let b = Tensor::from_vec(vec![5.0, 6.0, 7.0, 8.0], false);
        let _ = matmul(&a, &b, 2, 2, 2);
    }
}
