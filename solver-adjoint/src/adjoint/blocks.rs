//! KKT blocks at the solved point.
//!
//! Rewrites the box-constrained QP `l <= A x <= u` as
//!
//! ```text
//! G x <= h,  A_eq x = b
//! G = [-A_lower; A_upper],  h = [-l_lower; u_upper]
//! ```
//!
//! and evaluates the multiplier-dependent pieces of the linearized KKT
//! conditions. Lower rows always precede upper rows, in G, h, λ and the
//! slacks alike.

use super::classify::{gather, Classification};
use crate::linalg::sparse::{self, SparseCsc};
use crate::problem::SolvedQp;

/// Blocks of the adjoint KKT system.
#[derive(Debug, Clone)]
pub struct KktBlocks {
    /// P with its upper triangle reflected
    pub p_full: SparseCsc,
    /// Stacked one-sided inequality matrix [-A_lower; A_upper]
    pub g: SparseCsc,
    /// Equality rows of A
    pub a_eq: SparseCsc,
    /// Inequality multipliers [max(-y_lower, 0); max(y_upper, 0)]
    pub lambda: Vec<f64>,
    /// h - G x
    pub slacks: Vec<f64>,
    /// diag(λ) G
    pub g_diag_lambda: SparseCsc,
}

impl KktBlocks {
    pub fn build(qp: &SolvedQp, class: &Classification) -> Self {
        let lower = class.has_lower_mask();
        let upper = class.has_upper_mask();

        let a_lower = sparse::select_rows(&qp.A, &lower, -1.0);
        let a_upper = sparse::select_rows(&qp.A, &upper, 1.0);
        let g = sparse::vstack(&a_lower, &a_upper);
        let a_eq = sparse::select_rows(&qp.A, &class.is_equality_mask(), 1.0);

        let lambda: Vec<f64> = gather(&qp.y, class.lower_rows())
            .into_iter()
            .map(|y| -y.min(0.0))
            .chain(gather(&qp.y, class.upper_rows()).into_iter().map(|y| y.max(0.0)))
            .collect();

        // slacks <- h - G x
        let mut slacks: Vec<f64> = gather(&qp.l, class.lower_rows())
            .into_iter()
            .map(|l| -l)
            .chain(gather(&qp.u, class.upper_rows()))
            .collect();
        sparse::spmv(&g, &qp.x, &mut slacks, -1.0, 1.0);

        let g_diag_lambda = sparse::scale_rows(&g, &lambda);
        let p_full = sparse::triu_to_symm(&qp.P);

        Self {
            p_full,
            g,
            a_eq,
            lambda,
            slacks,
            g_diag_lambda,
        }
    }
}
