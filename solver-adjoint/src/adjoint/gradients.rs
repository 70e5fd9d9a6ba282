//! Gradients with respect to the problem data.
//!
//! The adjoint solve produces `dx`, `dy_l`, `dy_u`; the loss gradient with
//! respect to (P, q, A, l, u) follows from them in closed form. Matrix
//! gradients keep the sparsity pattern of the matrix they belong to.

use sprs::TriMat;

use crate::linalg::sparse::{SparseCsc, SparseSymmetricCsc};
use crate::problem::{AdjointResult, SolvedQp};

/// Loss gradient with respect to the QP data.
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct DataGradients {
    /// Gradient with respect to q (length n)
    pub dq: Vec<f64>,
    /// Gradient with respect to l (length m)
    pub dl: Vec<f64>,
    /// Gradient with respect to u (length m)
    pub du: Vec<f64>,
    /// Gradient with respect to P, on the stored upper-triangular pattern
    pub dP: SparseSymmetricCsc,
    /// Gradient with respect to A, on the pattern of A
    pub dA: SparseCsc,
}

impl AdjointResult {
    /// Map the adjoint of the solution to gradients of the problem data.
    ///
    /// With `y_l = max(-y, 0)` and `y_u = max(y, 0)`:
    ///
    /// ```text
    /// dq = dx
    /// dl = -y_l .* dy_l
    /// du = -y_u .* dy_u
    /// dP = (dx x^T + x dx^T) / 2
    /// dA = (y_u .* dy_u + y_l .* dy_l) x^T + y dx^T
    /// ```
    #[allow(non_snake_case)]
    pub fn data_gradients(&self, qp: &SolvedQp) -> DataGradients {
        let m = qp.num_constraints();
        assert_eq!(self.dx.len(), qp.num_vars());
        assert_eq!(self.dy_l.len(), m);
        assert_eq!(self.dy_u.len(), m);

        let x = &qp.x;
        let dx = &self.dx;

        let mut dl = vec![0.0; m];
        let mut du = vec![0.0; m];
        // Row weight of x^T in dA
        let mut w = vec![0.0; m];
        for j in 0..m {
            let y_l = (-qp.y[j]).max(0.0);
            let y_u = qp.y[j].max(0.0);
            dl[j] = -y_l * self.dy_l[j];
            du[j] = -y_u * self.dy_u[j];
            w[j] = y_u * self.dy_u[j] + y_l * self.dy_l[j];
        }

        let dP = on_pattern(&qp.P, |i, k| 0.5 * (dx[i] * x[k] + x[i] * dx[k]));
        let dA = on_pattern(&qp.A, |j, k| w[j] * x[k] + qp.y[j] * dx[k]);

        DataGradients {
            dq: dx.clone(),
            dl,
            du,
            dP,
            dA,
        }
    }
}

/// Evaluate `f(row, col)` at every stored entry of `a`.
fn on_pattern<F>(a: &SparseCsc, f: F) -> SparseCsc
where
    F: Fn(usize, usize) -> f64,
{
    let mut tri = TriMat::with_capacity((a.rows(), a.cols()), a.nnz());
    for (_, (row, col)) in a.iter() {
        tri.add_triplet(row, col, f(row, col));
    }
    tri.to_csc()
}
