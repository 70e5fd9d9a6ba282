//! Problem data structures, settings and results.
//!
//! This module defines the solved QP instance the adjoint is taken at,
//! the knobs of the adjoint computation, and what a call returns.

use crate::error::{AdjointError, AdjointOutcome};
use crate::linalg::backend::BackendError;
use crate::linalg::kkt::RefineInfo;
use crate::linalg::sparse::{SparseCsc, SparseSymmetricCsc};

/// A solved QP instance.
///
/// The problem is
///
/// ```text
/// minimize    (1/2) x^T P x + q^T x
/// subject to  l <= A x <= u
/// ```
///
/// with duals following the sign convention `P x + q + A^T y = 0`: y_j >= 0
/// where the upper bound is active, y_j <= 0 where the lower bound is
/// active. The linear term q does not enter the adjoint and is not stored.
///
/// # Dimensions
///
/// - `n`: number of primal variables (length of x)
/// - `m`: number of constraints (length of l, u, y; rows of A)
#[derive(Debug, Clone)]
#[allow(non_snake_case)] // P and A are standard mathematical notation
pub struct SolvedQp {
    /// Quadratic cost matrix P (n × n, PSD, upper triangle in CSC).
    pub P: SparseSymmetricCsc,

    /// Constraint matrix A (m × n, CSC format)
    pub A: SparseCsc,

    /// Lower bounds (length m, may hold -infinity)
    pub l: Vec<f64>,

    /// Upper bounds (length m, may hold +infinity)
    pub u: Vec<f64>,

    /// Primal solution (length n)
    pub x: Vec<f64>,

    /// Dual solution (length m)
    pub y: Vec<f64>,
}

impl SolvedQp {
    /// Build and validate a solved instance.
    #[allow(non_snake_case)]
    pub fn new(
        P: SparseSymmetricCsc,
        A: SparseCsc,
        l: Vec<f64>,
        u: Vec<f64>,
        x: Vec<f64>,
        y: Vec<f64>,
    ) -> AdjointOutcome<Self> {
        let qp = Self { P, A, l, u, x, y };
        qp.validate()?;
        Ok(qp)
    }

    /// Get the number of primal variables (n)
    pub fn num_vars(&self) -> usize {
        self.x.len()
    }

    /// Get the number of constraints (m)
    pub fn num_constraints(&self) -> usize {
        self.y.len()
    }

    /// Validate dimensions, finiteness of the solution and bound ordering.
    pub fn validate(&self) -> AdjointOutcome<()> {
        let n = self.num_vars();
        let m = self.num_constraints();
        let invalid = |msg: String| Err(AdjointError::InvalidProblem(msg));

        if n == 0 {
            return invalid("problem has no variables".to_string());
        }
        if self.P.rows() != n || self.P.cols() != n {
            return invalid(format!(
                "P has shape {}×{}, expected {}×{}",
                self.P.rows(),
                self.P.cols(),
                n,
                n
            ));
        }
        if self.A.rows() != m || self.A.cols() != n {
            return invalid(format!(
                "A has shape {}×{}, expected {}×{}",
                self.A.rows(),
                self.A.cols(),
                m,
                n
            ));
        }
        if self.l.len() != m {
            return invalid(format!("l has length {}, expected {}", self.l.len(), m));
        }
        if self.u.len() != m {
            return invalid(format!("u has length {}, expected {}", self.u.len(), m));
        }
        if let Some(i) = self.x.iter().position(|v| !v.is_finite()) {
            return invalid(format!("x[{}] is not finite ({})", i, self.x[i]));
        }
        if let Some(j) = self.y.iter().position(|v| !v.is_finite()) {
            return invalid(format!("y[{}] is not finite ({})", j, self.y[j]));
        }
        for j in 0..m {
            // Infinite bounds are allowed, NaN is not
            if self.l[j].is_nan() || self.u[j].is_nan() {
                return invalid(format!("constraint {} has a NaN bound", j));
            }
            if self.l[j] > self.u[j] {
                return invalid(format!(
                    "constraint {} has lower bound {} > upper bound {}",
                    j, self.l[j], self.u[j]
                ));
            }
        }
        Ok(())
    }
}

/// Adjoint computation settings.
#[derive(Debug, Clone)]
pub struct AdjointSettings {
    /// Bounds with |value| >= infinity are treated as absent
    pub infinity: f64,

    /// Rows with u - l <= eq_tol are equalities (0 = exact comparison)
    pub eq_tol: f64,

    /// Quasi-definite regularization of the adjoint KKT matrix
    pub static_reg: f64,

    /// Maximum iterative refinement steps
    pub refine_iters: usize,

    /// Stop refinement once the residual norm falls below this
    pub refine_tol: f64,

    /// Relative residual above which the system counts as unresolved
    pub max_residual: f64,

    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for AdjointSettings {
    fn default() -> Self {
        // Allow environment variable override for refinement iterations
        let refine_iters = std::env::var("ADJOINT_REFINE_ITERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(10);

        // Match the forward solver's infinity when it differs from the default
        let infinity = std::env::var("ADJOINT_INFINITY")
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| *v > 0.0)
            .unwrap_or(1e30);

        Self {
            infinity,
            eq_tol: 0.0,
            static_reg: 1e-8,
            refine_iters,
            refine_tol: 1e-12,
            max_residual: 1e-6,
            verbose: false,
        }
    }
}

impl AdjointSettings {
    /// Check the classification thresholds and the regularization.
    pub fn validate(&self) -> AdjointOutcome<()> {
        if self.infinity.is_nan() || self.infinity <= 0.0 {
            return Err(AdjointError::InvalidSettings(format!(
                "infinity must be positive, got {}",
                self.infinity
            )));
        }
        if self.eq_tol.is_nan() || self.eq_tol < 0.0 {
            return Err(AdjointError::InvalidSettings(format!(
                "eq_tol must be non-negative, got {}",
                self.eq_tol
            )));
        }
        if !self.static_reg.is_finite() || self.static_reg < 0.0 {
            return Err(BackendError::InvalidRegularization(format!(
                "static_reg must be non-negative, got {}",
                self.static_reg
            ))
            .into());
        }
        Ok(())
    }
}

/// Diagnostics of one adjoint call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjointInfo {
    /// Equality rows
    pub n_eq: usize,

    /// Lower-bounded inequality rows
    pub n_ineq_l: usize,

    /// Upper-bounded inequality rows
    pub n_ineq_u: usize,

    /// Dimension of the symmetric adjoint KKT matrix
    pub kkt_dim: usize,

    /// Refinement steps and final residual
    pub refine: RefineInfo,
}

/// Adjoint gradients of one call.
#[derive(Debug, Clone)]
pub struct AdjointResult {
    /// Primal adjoint (length n); equals the gradient with respect to q
    pub dx: Vec<f64>,

    /// Lower-side dual adjoint (length m)
    pub dy_l: Vec<f64>,

    /// Upper-side dual adjoint (length m)
    pub dy_u: Vec<f64>,

    /// Diagnostics
    pub info: AdjointInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse;

    fn qp() -> SolvedQp {
        SolvedQp {
            P: sparse::from_triplets_symmetric(2, vec![(0, 0, 1.0), (1, 1, 1.0)]),
            A: sparse::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]),
            l: vec![3.0],
            u: vec![3.0],
            x: vec![1.5, 1.5],
            y: vec![1.5],
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(qp().validate().is_ok());
        let q = qp();
        assert!(SolvedQp::new(q.P, q.A, q.l, q.u, q.x, q.y).is_ok());
    }

    #[test]
    fn test_validate_dimensions() {
        let mut q = qp();
        q.l = vec![3.0, 0.0];
        assert!(q.validate().is_err());

        let mut q = qp();
        q.A = sparse::from_triplets(1, 3, vec![(0, 0, 1.0)]);
        assert!(q.validate().is_err());

        let mut q = qp();
        q.P = sparse::from_triplets_symmetric(3, vec![(0, 0, 1.0)]);
        assert!(q.validate().is_err());

        let mut q = qp();
        q.y = vec![];
        assert!(matches!(q.validate(), Err(AdjointError::InvalidProblem(_))));
    }

    #[test]
    fn test_validate_bound_order() {
        let mut q = qp();
        q.l = vec![4.0];
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_validate_non_finite_solution() {
        let mut q = qp();
        q.y = vec![f64::NAN];
        assert!(matches!(q.validate(), Err(AdjointError::InvalidProblem(_))));

        let mut q = qp();
        q.x = vec![1.5, f64::INFINITY];
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_validate_nan_bounds() {
        let mut q = qp();
        q.l = vec![f64::NAN];
        q.u = vec![5.0];
        assert!(matches!(q.validate(), Err(AdjointError::InvalidProblem(_))));

        let mut q = qp();
        q.u = vec![f64::NAN];
        assert!(q.validate().is_err());

        // Infinite bounds are absent bounds, not errors
        let mut q = qp();
        q.l = vec![f64::NEG_INFINITY];
        q.u = vec![f64::INFINITY];
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_validate_settings() {
        assert!(AdjointSettings::default().validate().is_ok());

        let bad = [
            AdjointSettings { eq_tol: -1e-9, ..AdjointSettings::default() },
            AdjointSettings { eq_tol: f64::NAN, ..AdjointSettings::default() },
            AdjointSettings { infinity: 0.0, ..AdjointSettings::default() },
            AdjointSettings { infinity: f64::NAN, ..AdjointSettings::default() },
        ];
        for s in &bad {
            assert!(matches!(s.validate(), Err(AdjointError::InvalidSettings(_))));
        }

        let s = AdjointSettings { static_reg: f64::NAN, ..AdjointSettings::default() };
        assert!(matches!(
            s.validate(),
            Err(AdjointError::Backend(BackendError::InvalidRegularization(_)))
        ));
    }

    #[test]
    fn test_default_settings() {
        let s = AdjointSettings::default();
        assert!(s.infinity > 1e20);
        assert_eq!(s.eq_tol, 0.0);
        assert!(s.static_reg > 0.0);
        assert!(s.max_residual > s.refine_tol);
    }
}
