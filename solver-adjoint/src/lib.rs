//! Adjoint derivatives of convex QP solutions
//!
//! Given a solved quadratic program
//!
//! ```text
//! minimize    (1/2) x^T P x + q^T x
//! subject to  l <= A x <= u
//! ```
//!
//! and upstream gradients of a scalar loss with respect to the primal and
//! dual solution, this crate computes the gradient of that loss with respect
//! to the problem data in one sparse linear solve, by differentiating the
//! KKT conditions at the solved point (reverse mode). The result lets a QP
//! solve act as a differentiable layer inside a larger computation.
//!
//! # Pipeline
//!
//! - **Classification**: every box row becomes an equality, a lower-bounded
//!   row, an upper-bounded row, both, or neither
//! - **KKT blocks**: G, A_eq, multipliers and slacks at the solved point
//! - **Adjoint system**: the nonsymmetric KKT Jacobian is embedded in a
//!   symmetric quasi-definite matrix, factored with a sparse LDL^T and
//!   polished by iterative refinement
//! - **Mapping**: the solution is split back into `dx`, `dy_l`, `dy_u` per
//!   original constraint
//!
//! # Example
//!
//! ```ignore
//! use solver_adjoint::{adjoint_derivative, AdjointSettings, SolvedQp};
//! use solver_adjoint::linalg::sparse;
//!
//! // min 0.5 |x|^2 - 3 (x1 + x2) s.t. x1 + x2 = 3
//! let qp = SolvedQp::new(
//!     sparse::from_triplets_symmetric(2, vec![(0, 0, 1.0), (1, 1, 1.0)]),
//!     sparse::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]),
//!     vec![3.0],
//!     vec![3.0],
//!     vec![1.5, 1.5],
//!     vec![1.5],
//! )?;
//!
//! let mut dx = vec![1.0, 0.0];
//! let mut dy_l = vec![0.0];
//! let mut dy_u = vec![0.0];
//! adjoint_derivative(&qp, &mut dx, &mut dy_l, &mut dy_u, None, &AdjointSettings::default())?;
//!
//! println!("dL/dq = {:?}", dx);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod adjoint;
pub mod error;
pub mod linalg;
pub mod problem;

// Re-export main types
pub use adjoint::classify::{Classification, ConstraintKind};
pub use adjoint::gradients::DataGradients;
pub use adjoint::verify::{AdjointVerifier, ReferenceCheck};
pub use adjoint::{solve_adjoint, solve_adjoint_with_backend};
pub use error::{AdjointError, AdjointOutcome};
pub use problem::{AdjointInfo, AdjointResult, AdjointSettings, SolvedQp};

/// Main adjoint entry point.
///
/// Overwrites `dx` with the primal gradient and `dy_l` / `dy_u` with the
/// per-constraint dual gradients. The buffers are read as the upstream
/// seeds and are written only if every stage succeeds; on error they keep
/// their input values.
///
/// Pass a [`ReferenceCheck`] (or any [`AdjointVerifier`]) to validate the
/// assembled system against reference data.
pub fn adjoint_derivative(
    qp: &SolvedQp,
    dx: &mut [f64],
    dy_l: &mut [f64],
    dy_u: &mut [f64],
    verifier: Option<&dyn AdjointVerifier>,
    settings: &AdjointSettings,
) -> AdjointOutcome<AdjointInfo> {
    let result = solve_adjoint(qp, dx, dy_l, dy_u, verifier, settings)?;
    dx.copy_from_slice(&result.dx);
    dy_l.copy_from_slice(&result.dy_l);
    dy_u.copy_from_slice(&result.dy_u);
    Ok(result.info)
}
