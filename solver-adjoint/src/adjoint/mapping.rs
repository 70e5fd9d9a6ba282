//! Mapping the adjoint solution back to the original constraint indexing.

use super::classify::Classification;
use crate::error::{AdjointError, AdjointOutcome};

/// Adjoint gradients in original indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedAdjoint {
    /// Primal adjoint (length n)
    pub dx: Vec<f64>,
    /// Lower-side dual adjoint per constraint (length m)
    pub dy_l: Vec<f64>,
    /// Upper-side dual adjoint per constraint (length m)
    pub dy_u: Vec<f64>,
}

/// Split the second half of the solved adjoint system into `dx`, `dy_l`, `dy_u`.
///
/// Lower rows report the negated λ entry, upper rows the λ entry itself. An
/// equality row reports its ν entry divided by y_j, on the upper side when
/// y_j >= 0 and negated on the lower side otherwise, the same sign rule the
/// right-hand side used. y_j == 0 (or a non-finite y_j) on an equality row
/// has no defined split and is rejected.
pub fn map_solution(
    sol: &[f64],
    class: &Classification,
    y: &[f64],
    n: usize,
) -> AdjointOutcome<MappedAdjoint> {
    let m = class.len();
    let n_l = class.n_ineq_l();
    let half = n + class.n_ineq() + class.n_eq();
    assert_eq!(sol.len(), 2 * half);
    assert_eq!(y.len(), m);

    let d = &sol[half..];
    let (d_x, rest) = d.split_at(n);
    let (d_lambda, d_nu) = rest.split_at(class.n_ineq());
    let (d_lower, d_upper) = d_lambda.split_at(n_l);

    let mut dy_l = vec![0.0; m];
    let mut dy_u = vec![0.0; m];

    for (k, &j) in class.lower_rows().iter().enumerate() {
        dy_l[j] = -d_lower[k];
    }
    for (k, &j) in class.upper_rows().iter().enumerate() {
        dy_u[j] = d_upper[k];
    }
    for (k, &j) in class.eq_rows().iter().enumerate() {
        let yj = y[j];
        if yj == 0.0 || !yj.is_finite() {
            return Err(AdjointError::DegenerateEqualityDual { row: j });
        }
        if yj > 0.0 {
            dy_u[j] = d_nu[k] / yj;
        } else {
            dy_l[j] = -d_nu[k] / yj;
        }
    }

    Ok(MappedAdjoint {
        dx: d_x.to_vec(),
        dy_l,
        dy_u,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = 1e30;

    #[test]
    fn test_inequality_mapping() {
        // lower-only, two-sided, upper-only
        let l = [0.0, -1.0, -INF];
        let u = [INF, 1.0, 2.0];
        let y = [-1.0, 0.0, 0.5];
        let class = Classification::new(&l, &u, &y, INF, 0.0);

        // n = 1; half = 1 + (2 lower + 2 upper) = 5
        let mut sol = vec![99.0; 10];
        sol[5..].copy_from_slice(&[7.0, 1.0, 2.0, 3.0, 4.0]);

        let out = map_solution(&sol, &class, &y, 1).unwrap();
        assert_eq!(out.dx, vec![7.0]);
        assert_eq!(out.dy_l, vec![-1.0, -2.0, 0.0]);
        assert_eq!(out.dy_u, vec![0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_equality_sign_symmetry() {
        // Same solved entry, opposite dual signs: the value moves sides
        let l = [3.0];
        let u = [3.0];
        let sol = [0.0, -0.5];

        let y_pos = [1.5];
        let class = Classification::new(&l, &u, &y_pos, INF, 0.0);
        let pos = map_solution(&sol, &class, &y_pos, 0).unwrap();

        let y_neg = [-1.5];
        let class = Classification::new(&l, &u, &y_neg, INF, 0.0);
        let neg = map_solution(&sol, &class, &y_neg, 0).unwrap();

        assert!((pos.dy_u[0] - (-0.5 / 1.5)).abs() < 1e-15);
        assert_eq!(pos.dy_l[0], 0.0);
        assert!((neg.dy_l[0] - (0.5 / -1.5)).abs() < 1e-15);
        assert_eq!(neg.dy_u[0], 0.0);
        assert!((pos.dy_u[0] - neg.dy_l[0]).abs() < 1e-15);
    }

    #[test]
    fn test_degenerate_equality_dual() {
        let y = [0.0];
        let class = Classification::new(&[1.0], &[1.0], &y, INF, 0.0);
        let err = map_solution(&[0.0, 0.0, 1.0, 0.0], &class, &y, 1).unwrap_err();
        assert!(matches!(err, AdjointError::DegenerateEqualityDual { row: 0 }));
    }

    #[test]
    fn test_non_finite_equality_dual() {
        let y = [f64::NAN];
        let class = Classification::new(&[1.0], &[1.0], &y, INF, 0.0);
        let err = map_solution(&[0.0, 0.0, 1.0, 0.0], &class, &y, 1).unwrap_err();
        assert!(matches!(err, AdjointError::DegenerateEqualityDual { row: 0 }));
    }
}
