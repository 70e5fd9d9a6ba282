//! Adjoint KKT system builder and solver.
//!
//! Differentiating the KKT conditions of
//!
//! ```text
//! minimize    (1/2) x^T P x + q^T x
//! subject to  G x <= h,  A_eq x = b
//! ```
//!
//! at a solution (x, λ, ν) gives the nonsymmetric Jacobian
//!
//! ```text
//! M = [ P          G^T          A_eq^T ]
//!     [ diag(λ) G  -diag(slack)  0      ]
//!     [ A_eq       0             0      ]
//! ```
//!
//! with slack = h - G x. The adjoint needs M^{-T} r. Since M is not
//! symmetric, it is embedded in the symmetric system
//!
//! ```text
//! K = [ 0   M^T ]
//!     [ M   0   ]
//! ```
//!
//! so that K [a; d] = [r; 0] yields d = M^{-T} r in the second half.
//! K is factored in the quasi-definite form K + ε diag(I, -I) and the
//! regularization is removed by iterative refinement against K itself.

use sprs::TriMat;

use super::backend::{BackendError, KktBackend};
use super::sparse::{self, SparseCsc};
use crate::adjoint::blocks::KktBlocks;

/// Outcome of a refined solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefineInfo {
    /// Refinement steps actually taken
    pub iters: usize,
    /// Final residual norm ||rhs - K sol||
    pub residual: f64,
}

/// Adjoint KKT system solver.
///
/// Owns the unregularized matrix K and the backend factorization of its
/// regularized form for the duration of one adjoint call.
pub struct AdjointKktSolver<B: KktBackend> {
    /// Block dimensions
    n: usize,      // Number of variables
    n_ineq: usize, // Stacked one-sided inequality rows
    n_eq: usize,   // Equality rows

    /// Factorization backend
    backend: B,

    /// Unregularized K (full symmetric), kept for refinement
    kkt_mat: Option<SparseCsc>,

    /// Factorization of K + ε diag(I, -I)
    factor: Option<B::Factorization>,

    /// Static regularization
    static_reg: f64,
}

impl<B: KktBackend> AdjointKktSolver<B> {
    /// Create a new adjoint KKT solver.
    ///
    /// # Arguments
    ///
    /// * `n` - Number of primal variables
    /// * `n_ineq` - Number of stacked inequality rows (lower then upper)
    /// * `n_eq` - Number of equality rows
    /// * `static_reg` - Quasi-definite regularization ε
    pub fn new(n: usize, n_ineq: usize, n_eq: usize, static_reg: f64) -> Self {
        let dim = 2 * (n + n_ineq + n_eq);
        Self {
            n,
            n_ineq,
            n_eq,
            backend: B::new(dim, static_reg),
            kkt_mat: None,
            factor: None,
            static_reg,
        }
    }

    /// Dimension of M (and of each half of K).
    pub fn half_dim(&self) -> usize {
        self.n + self.n_ineq + self.n_eq
    }

    /// Dimension of K.
    pub fn dim(&self) -> usize {
        2 * self.half_dim()
    }

    /// The unregularized K from the last `factor` call.
    pub fn kkt_matrix(&self) -> Option<&SparseCsc> {
        self.kkt_mat.as_ref()
    }

    /// Build the unregularized symmetric matrix K = [[0, M^T], [M, 0]].
    ///
    /// Both triangles are stored. Every diagonal entry is present as an
    /// explicit zero so the backend can place regularization on it.
    pub fn assemble(&self, blocks: &KktBlocks) -> SparseCsc {
        let n = self.n;
        let half = self.half_dim();
        let ineq_off = n;
        let eq_off = n + self.n_ineq;

        assert_eq!(blocks.p_full.rows(), n);
        assert_eq!(blocks.g.rows(), self.n_ineq);
        assert_eq!(blocks.g_diag_lambda.rows(), self.n_ineq);
        assert_eq!(blocks.slacks.len(), self.n_ineq);
        assert_eq!(blocks.a_eq.rows(), self.n_eq);

        let nnz_m = blocks.p_full.nnz()
            + 2 * blocks.a_eq.nnz()
            + blocks.g.nnz()
            + blocks.g_diag_lambda.nnz()
            + self.n_ineq;
        let mut tri = TriMat::with_capacity((2 * half, 2 * half), 2 * nnz_m + 2 * half);

        // M[i, j] lands at K[half + i, j] and K[j, half + i]
        let add_m = |row: usize, col: usize, val: f64, tri: &mut TriMat<f64>| {
            tri.add_triplet(half + row, col, val);
            tri.add_triplet(col, half + row, val);
        };

        // ===================================================================
        // Stationarity row: [P, G^T, A_eq^T]
        // ===================================================================
        for (val, (row, col)) in blocks.p_full.iter() {
            add_m(row, col, *val, &mut tri);
        }
        for (val, (row, col)) in blocks.g.iter() {
            add_m(col, ineq_off + row, *val, &mut tri);
        }
        for (val, (row, col)) in blocks.a_eq.iter() {
            add_m(col, eq_off + row, *val, &mut tri);
        }

        // ===================================================================
        // Complementary slackness row: [diag(λ) G, -diag(slack), 0]
        // ===================================================================
        for (val, (row, col)) in blocks.g_diag_lambda.iter() {
            add_m(ineq_off + row, col, *val, &mut tri);
        }
        for (i, &s) in blocks.slacks.iter().enumerate() {
            add_m(ineq_off + i, ineq_off + i, -s, &mut tri);
        }

        // ===================================================================
        // Primal feasibility row: [A_eq, 0, 0]
        // ===================================================================
        for (val, (row, col)) in blocks.a_eq.iter() {
            add_m(eq_off + row, col, *val, &mut tri);
        }

        for i in 0..2 * half {
            tri.add_triplet(i, i, 0.0);
        }

        tri.to_csc()
    }

    /// K with -2ε on the lower half of the diagonal.
    ///
    /// The backend adds +ε to every diagonal entry, so the factored matrix
    /// is K + ε diag(I, -I).
    fn shifted(&self, kkt: &SparseCsc) -> SparseCsc {
        let half = self.half_dim();
        let mut tri = TriMat::with_capacity((2 * half, 2 * half), kkt.nnz() + half);
        for (val, (row, col)) in kkt.iter() {
            tri.add_triplet(row, col, *val);
        }
        for i in half..2 * half {
            tri.add_triplet(i, i, -2.0 * self.static_reg);
        }
        tri.to_csc()
    }

    /// Assemble K from the blocks and factor its regularized form.
    pub fn factor(&mut self, blocks: &KktBlocks) -> Result<(), BackendError> {
        let kkt = self.assemble(blocks);
        let factor = self.backend.numeric_factorization(&self.shifted(&kkt))?;
        self.kkt_mat = Some(kkt);
        self.factor = Some(factor);
        Ok(())
    }

    /// Solve K sol = rhs, refining against the unregularized K.
    ///
    /// # Arguments
    ///
    /// * `rhs` - Right-hand side (length `dim()`)
    /// * `sol` - Solution (output, length `dim()`)
    /// * `refine_iters` - Maximum refinement steps
    /// * `refine_tol` - Stop once the residual norm drops below this
    pub fn solve_refined(
        &self,
        rhs: &[f64],
        sol: &mut [f64],
        refine_iters: usize,
        refine_tol: f64,
    ) -> Result<RefineInfo, BackendError> {
        let dim = self.dim();
        if rhs.len() != dim || sol.len() != dim {
            return Err(BackendError::DimensionMismatch {
                expected: dim,
                actual: rhs.len().min(sol.len()),
            });
        }
        let (Some(kkt), Some(factor)) = (&self.kkt_mat, &self.factor) else {
            return Err(BackendError::Message("KKT system has not been factored".to_string()));
        };

        self.backend.solve(factor, rhs, sol);

        let mut res = vec![0.0; dim];
        let mut delta = vec![0.0; dim];
        let mut iters = 0;
        let mut res_norm = residual(kkt, rhs, sol, &mut res);

        while iters < refine_iters && res_norm.is_finite() && res_norm >= refine_tol {
            self.backend.solve(factor, &res, &mut delta);
            for (s, d) in sol.iter_mut().zip(&delta) {
                *s += d;
            }
            iters += 1;
            res_norm = residual(kkt, rhs, sol, &mut res);
            log::trace!("adjoint refinement step {}: residual {:.3e}", iters, res_norm);
        }

        if !res_norm.is_finite() {
            return Err(BackendError::FactorizationFailed(
                "non-finite residual after solve".to_string(),
            ));
        }

        Ok(RefineInfo {
            iters,
            residual: res_norm,
        })
    }
}

/// res = rhs - K sol, returning ||res||.
fn residual(kkt: &SparseCsc, rhs: &[f64], sol: &[f64], res: &mut [f64]) -> f64 {
    res.copy_from_slice(rhs);
    sparse::spmv(kkt, sol, res, -1.0, 1.0);
    res.iter().map(|v| v * v).sum::<f64>().sqrt()
}
