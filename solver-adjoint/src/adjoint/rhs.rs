//! Right-hand side of the adjoint system.

use super::classify::{gather, Classification};

/// Assemble `[-(dx, dλ, dν); 0]` from upstream seeds.
///
/// `dλ` stacks `dy_l` over lower rows and `dy_u` over upper rows, in the
/// same order as G. An equality row contributes `-dy_l[j]` when its
/// multiplier sign is +1 and `dy_u[j]` when it is -1. The second half pads
/// the complementary-slackness block, which receives no seed.
pub fn assemble_rhs(dx: &[f64], dy_l: &[f64], dy_u: &[f64], class: &Classification) -> Vec<f64> {
    assert_eq!(dy_l.len(), class.len());
    assert_eq!(dy_u.len(), class.len());

    let half = dx.len() + class.n_ineq() + class.n_eq();
    let mut rhs = Vec::with_capacity(2 * half);

    rhs.extend_from_slice(dx);
    rhs.extend(gather(dy_l, class.lower_rows()));
    rhs.extend(gather(dy_u, class.upper_rows()));
    rhs.extend(class.eq_rows().iter().map(|&j| {
        if class.nu_sign(j) > 0 {
            -dy_l[j]
        } else {
            dy_u[j]
        }
    }));

    for v in rhs.iter_mut() {
        *v = -*v;
    }
    rhs.resize(2 * half, 0.0);
    rhs
}
