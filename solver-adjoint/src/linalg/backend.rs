//! Factorization backends for the adjoint KKT system.
//!
//! A backend factors a symmetric quasi-definite matrix after adding its
//! static regularization to every diagonal entry, and solves against that
//! factorization. The KKT layer decides the sign pattern of the diagonal it
//! hands over, so backends stay oblivious to block structure.

use sprs::{FillInReduction, SymmetryCheck, TriMat};
use sprs_ldl::{Ldl, LdlNumeric};
use thiserror::Error;

use super::sparse::SparseCsc;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed input or misuse of the solver
    #[error("{0}")]
    Message(String),

    /// Numeric factorization failed (singular pivot, non-finite D)
    #[error("Factorization failed: {0}")]
    FactorizationFailed(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Invalid regularization parameter
    #[error("Invalid regularization parameter: {0}")]
    InvalidRegularization(String),
}

pub trait KktBackend {
    type Factorization;

    fn new(n: usize, static_reg: f64) -> Self
    where
        Self: Sized;
    fn set_static_reg(&mut self, static_reg: f64) -> Result<(), BackendError>;
    fn static_reg(&self) -> f64;
    fn numeric_factorization(&mut self, kkt: &SparseCsc) -> Result<Self::Factorization, BackendError>;
    fn solve(&self, factor: &Self::Factorization, rhs: &[f64], sol: &mut [f64]);
}

/// Sparse LDL^T backend built on `sprs-ldl`.
///
/// Expects the full symmetric matrix (both triangles). Uses a reverse
/// Cuthill-McKee fill-in reducing ordering; any symmetric permutation of a
/// quasi-definite matrix admits an LDL^T factorization without pivoting.
pub struct SprsLdlBackend {
    /// Matrix dimension
    n: usize,

    /// Static regularization (added to every diagonal entry)
    static_reg: f64,
}

impl SprsLdlBackend {
    fn regularized(&self, kkt: &SparseCsc) -> SparseCsc {
        let mut tri = TriMat::with_capacity((self.n, self.n), kkt.nnz() + self.n);
        for (val, (row, col)) in kkt.iter() {
            tri.add_triplet(row, col, *val);
        }
        for i in 0..self.n {
            tri.add_triplet(i, i, self.static_reg);
        }
        tri.to_csc()
    }
}

impl KktBackend for SprsLdlBackend {
    type Factorization = LdlNumeric<f64, usize>;

    fn new(n: usize, static_reg: f64) -> Self {
        assert!(static_reg >= 0.0, "Static regularization must be non-negative");
        Self { n, static_reg }
    }

    fn set_static_reg(&mut self, static_reg: f64) -> Result<(), BackendError> {
        if !static_reg.is_finite() || static_reg < 0.0 {
            return Err(BackendError::InvalidRegularization(format!(
                "static_reg must be non-negative, got {}",
                static_reg
            )));
        }
        self.static_reg = static_reg;
        Ok(())
    }

    fn static_reg(&self) -> f64 {
        self.static_reg
    }

    fn numeric_factorization(&mut self, kkt: &SparseCsc) -> Result<Self::Factorization, BackendError> {
        if kkt.rows() != self.n || kkt.cols() != self.n {
            return Err(BackendError::DimensionMismatch {
                expected: self.n,
                actual: kkt.rows(),
            });
        }

        let reg = self.regularized(kkt);
        let ldl = Ldl::new()
            .fill_in_reduction(FillInReduction::ReverseCuthillMcKee)
            .check_symmetry(SymmetryCheck::DontCheckSymmetry)
            .numeric(reg.view())
            .map_err(|e| BackendError::FactorizationFailed(format!("{:?}", e)))?;

        if let Some(i) = ldl.d().iter().position(|d| !d.is_finite() || *d == 0.0) {
            return Err(BackendError::FactorizationFailed(format!(
                "pivot {} is {}",
                i,
                ldl.d()[i]
            )));
        }

        Ok(ldl)
    }

    fn solve(&self, factor: &Self::Factorization, rhs: &[f64], sol: &mut [f64]) {
        assert_eq!(rhs.len(), self.n);
        assert_eq!(sol.len(), self.n);

        let x = factor.solve(rhs);
        sol.copy_from_slice(&x);
    }
}
