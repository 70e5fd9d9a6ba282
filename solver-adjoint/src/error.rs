//! Error types for adjoint differentiation.

use thiserror::Error;

use crate::linalg::backend::BackendError;

/// Errors that can occur while differentiating a solved QP.
#[derive(Error, Debug)]
pub enum AdjointError {
    /// Problem validation failed
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Settings out of range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// A seed vector has the wrong length
    #[error("Seed {name} has length {actual}, expected {expected}")]
    InvalidSeed {
        /// Seed name (dx, dy_l, dy_u)
        name: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Factorization of the adjoint KKT system failed
    #[error("Adjoint system backend failed: {0}")]
    Backend(#[from] BackendError),

    /// Refinement could not drive the residual down; the adjoint system is
    /// singular for this right-hand side
    #[error("Adjoint system unresolved: relative residual {residual:.3e}")]
    Unresolved {
        /// Relative residual after refinement
        residual: f64,
    },

    /// Verification mode: assembled data differs from the reference
    #[error("Reference mismatch (matrix ok: {matrix_ok}, rhs ok: {rhs_ok})")]
    ReferenceMismatch {
        /// Assembled matrix matched its reference
        matrix_ok: bool,
        /// Assembled right-hand side matched its reference
        rhs_ok: bool,
    },

    /// Equality row with a zero multiplier; its adjoint cannot be split
    /// between the lower and upper sides
    #[error("Equality constraint {row} has a zero dual multiplier")]
    DegenerateEqualityDual {
        /// Constraint index
        row: usize,
    },
}

/// Result type for adjoint operations.
pub type AdjointOutcome<T> = Result<T, AdjointError>;
