//! Adjoint pipeline.
//!
//! One call runs the stages in order:
//!
//! 1. [`classify`]: split the box constraints into equality, lower and
//!    upper rows.
//! 2. [`blocks`]: evaluate G, A_eq, λ and the slacks at the solved point.
//! 3. [`rhs`]: stack the upstream seeds into the adjoint right-hand side.
//! 4. [`crate::linalg::kkt`]: factor and solve the adjoint KKT system,
//!    optionally checked by a [`verify::AdjointVerifier`].
//! 5. [`mapping`]: read the solution back into original constraint indexing.
//!
//! Every intermediate is owned by the call and dropped on return.

pub mod blocks;
pub mod classify;
pub mod gradients;
pub mod mapping;
pub mod rhs;
pub mod verify;

use crate::error::{AdjointError, AdjointOutcome};
use crate::linalg::backend::{KktBackend, SprsLdlBackend};
use crate::linalg::kkt::AdjointKktSolver;
use crate::problem::{AdjointInfo, AdjointResult, AdjointSettings, SolvedQp};

use blocks::KktBlocks;
use classify::Classification;
use mapping::map_solution;
use rhs::assemble_rhs;
use verify::AdjointVerifier;

/// Compute the adjoint derivative with the default sparse LDL^T backend.
pub fn solve_adjoint(
    qp: &SolvedQp,
    dx: &[f64],
    dy_l: &[f64],
    dy_u: &[f64],
    verifier: Option<&dyn AdjointVerifier>,
    settings: &AdjointSettings,
) -> AdjointOutcome<AdjointResult> {
    solve_adjoint_with_backend::<SprsLdlBackend>(qp, dx, dy_l, dy_u, verifier, settings)
}

/// Compute the adjoint derivative with an explicit factorization backend.
///
/// Numerical failures (factorization, unresolved residual) take precedence
/// over a verification mismatch; a mismatch is reported even when the
/// solve itself succeeded.
pub fn solve_adjoint_with_backend<B: KktBackend>(
    qp: &SolvedQp,
    dx: &[f64],
    dy_l: &[f64],
    dy_u: &[f64],
    verifier: Option<&dyn AdjointVerifier>,
    settings: &AdjointSettings,
) -> AdjointOutcome<AdjointResult> {
    qp.validate()?;
    let n = qp.num_vars();
    let m = qp.num_constraints();
    check_seed("dx", dx, n)?;
    check_seed("dy_l", dy_l, m)?;
    check_seed("dy_u", dy_u, m)?;
    settings.validate()?;

    let class = Classification::new(&qp.l, &qp.u, &qp.y, settings.infinity, settings.eq_tol);
    log::debug!(
        "adjoint: n={} m={} n_eq={} n_ineq_l={} n_ineq_u={}",
        n,
        m,
        class.n_eq(),
        class.n_ineq_l(),
        class.n_ineq_u()
    );

    let blocks = KktBlocks::build(qp, &class);
    let rhs = assemble_rhs(dx, dy_l, dy_u, &class);
    let rhs_ok = verifier.map_or(true, |v| v.check_rhs(&rhs));

    let mut solver = AdjointKktSolver::<B>::new(n, class.n_ineq(), class.n_eq(), settings.static_reg);
    solver.factor(&blocks)?;
    let matrix_ok = match (verifier, solver.kkt_matrix()) {
        (Some(v), Some(kkt)) => v.check_matrix(kkt),
        _ => true,
    };

    let mut sol = vec![0.0; solver.dim()];
    let refine = solver.solve_refined(&rhs, &mut sol, settings.refine_iters, settings.refine_tol)?;

    let rhs_norm = rhs.iter().map(|v| v * v).sum::<f64>().sqrt();
    let rel_residual = refine.residual / rhs_norm.max(1.0);
    if rel_residual > settings.max_residual {
        log::warn!(
            "adjoint system unresolved after {} refinement steps: relative residual {:.3e}",
            refine.iters,
            rel_residual
        );
        return Err(AdjointError::Unresolved {
            residual: rel_residual,
        });
    }

    if !(matrix_ok && rhs_ok) {
        log::warn!(
            "adjoint reference mismatch: matrix ok = {}, rhs ok = {}",
            matrix_ok,
            rhs_ok
        );
        return Err(AdjointError::ReferenceMismatch { matrix_ok, rhs_ok });
    }

    let mapped = map_solution(&sol, &class, &qp.y, n)?;

    let info = AdjointInfo {
        n_eq: class.n_eq(),
        n_ineq_l: class.n_ineq_l(),
        n_ineq_u: class.n_ineq_u(),
        kkt_dim: solver.dim(),
        refine,
    };
    if settings.verbose {
        log::info!(
            "adjoint: kkt dim {}, {} refinement steps, residual {:.3e}",
            info.kkt_dim,
            refine.iters,
            refine.residual
        );
    }

    Ok(AdjointResult {
        dx: mapped.dx,
        dy_l: mapped.dy_l,
        dy_u: mapped.dy_u,
        info,
    })
}

fn check_seed(name: &'static str, seed: &[f64], expected: usize) -> AdjointOutcome<()> {
    if seed.len() != expected {
        return Err(AdjointError::InvalidSeed {
            name,
            expected,
            actual: seed.len(),
        });
    }
    Ok(())
}
