//! Cross-checks of the assembled adjoint system against reference data.
//!
//! Verification is injected into a call as an optional trait object, so
//! calls without one never build comparison state.

use std::collections::HashMap;

use crate::linalg::sparse::SparseCsc;

/// Hook for validating the assembled adjoint system.
pub trait AdjointVerifier {
    /// Check the unregularized symmetric KKT matrix K.
    fn check_matrix(&self, kkt: &SparseCsc) -> bool;

    /// Check the assembled right-hand side.
    fn check_rhs(&self, rhs: &[f64]) -> bool;
}

/// Compares against caller-supplied reference data.
///
/// A missing reference passes its check.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceCheck<'a> {
    pub matrix: Option<&'a SparseCsc>,
    pub rhs: Option<&'a [f64]>,
    /// Elementwise tolerance for the matrix
    pub matrix_tol: f64,
    /// Elementwise tolerance for the right-hand side
    pub rhs_tol: f64,
}

impl<'a> ReferenceCheck<'a> {
    pub fn new(
        matrix: Option<&'a SparseCsc>,
        rhs: Option<&'a [f64]>,
        matrix_tol: f64,
        rhs_tol: f64,
    ) -> Self {
        Self {
            matrix,
            rhs,
            matrix_tol,
            rhs_tol,
        }
    }
}

impl AdjointVerifier for ReferenceCheck<'_> {
    fn check_matrix(&self, kkt: &SparseCsc) -> bool {
        self.matrix
            .map_or(true, |reference| matrices_close(kkt, reference, self.matrix_tol))
    }

    fn check_rhs(&self, rhs: &[f64]) -> bool {
        self.rhs
            .map_or(true, |reference| vectors_close(rhs, reference, self.rhs_tol))
    }
}

/// Same shape and every entry within `tol`; entries stored in only one of
/// the two matrices are compared against zero.
pub fn matrices_close(a: &SparseCsc, b: &SparseCsc, tol: f64) -> bool {
    if a.rows() != b.rows() || a.cols() != b.cols() {
        return false;
    }

    let mut diff: HashMap<(usize, usize), f64> = HashMap::with_capacity(a.nnz());
    for (val, (row, col)) in a.iter() {
        *diff.entry((row, col)).or_insert(0.0) += *val;
    }
    for (val, (row, col)) in b.iter() {
        *diff.entry((row, col)).or_insert(0.0) -= *val;
    }

    diff.values().all(|d| d.abs() <= tol)
}

/// Same length and every entry within `tol`.
pub fn vectors_close(a: &[f64], b: &[f64], tol: f64) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol)
}
