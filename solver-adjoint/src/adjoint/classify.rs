//! Constraint classification.
//!
//! Every row `l_j <= a_j^T x <= u_j` is tagged once; the boolean views and
//! block counts used downstream are all derived from that single tag array.

/// Shape of one two-sided box constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// l_j == u_j (within the equality tolerance)
    Equality,
    /// Finite lower bound, infinite upper bound
    LowerOnly,
    /// Infinite lower bound, finite upper bound
    UpperOnly,
    /// Both bounds finite and distinct
    TwoSided,
    /// Both bounds infinite
    Free,
}

impl ConstraintKind {
    pub fn is_equality(self) -> bool {
        matches!(self, ConstraintKind::Equality)
    }

    pub fn has_lower(self) -> bool {
        matches!(self, ConstraintKind::LowerOnly | ConstraintKind::TwoSided)
    }

    pub fn has_upper(self) -> bool {
        matches!(self, ConstraintKind::UpperOnly | ConstraintKind::TwoSided)
    }
}

/// Per-row classification of a solved QP's constraints.
///
/// Row order inside each block follows the original constraint order, so
/// `lower_rows[k]` is the constraint behind the k-th lower-inequality row
/// of G and likewise for `upper_rows` and `eq_rows`.
#[derive(Debug, Clone)]
pub struct Classification {
    kinds: Vec<ConstraintKind>,
    /// +1 / -1 on equality rows, 0 elsewhere
    nu_sign: Vec<i8>,
    lower_rows: Vec<usize>,
    upper_rows: Vec<usize>,
    eq_rows: Vec<usize>,
}

impl Classification {
    /// Classify constraints from their bounds and the solved dual.
    ///
    /// # Arguments
    ///
    /// * `l`, `u` - Constraint bounds (length m, `l <= u`)
    /// * `y` - Dual solution (length m)
    /// * `infinity` - Bounds at or beyond ±`infinity` are treated as absent
    /// * `eq_tol` - Rows with `u_j - l_j <= eq_tol` are equalities
    pub fn new(l: &[f64], u: &[f64], y: &[f64], infinity: f64, eq_tol: f64) -> Self {
        assert_eq!(l.len(), u.len());
        assert_eq!(l.len(), y.len());

        let m = l.len();
        let mut kinds = Vec::with_capacity(m);
        let mut nu_sign = vec![0i8; m];
        let mut lower_rows = Vec::new();
        let mut upper_rows = Vec::new();
        let mut eq_rows = Vec::new();

        for j in 0..m {
            let kind = if u[j] - l[j] > eq_tol {
                match (l[j] > -infinity, u[j] < infinity) {
                    (true, true) => ConstraintKind::TwoSided,
                    (true, false) => ConstraintKind::LowerOnly,
                    (false, true) => ConstraintKind::UpperOnly,
                    (false, false) => ConstraintKind::Free,
                }
            } else {
                ConstraintKind::Equality
            };

            if kind.has_lower() {
                lower_rows.push(j);
            }
            if kind.has_upper() {
                upper_rows.push(j);
            }
            if kind.is_equality() {
                eq_rows.push(j);
                nu_sign[j] = if y[j] >= 0.0 { 1 } else { -1 };
            }
            kinds.push(kind);
        }

        Self {
            kinds,
            nu_sign,
            lower_rows,
            upper_rows,
            eq_rows,
        }
    }

    /// Number of constraints m.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind(&self, j: usize) -> ConstraintKind {
        self.kinds[j]
    }

    pub fn kinds(&self) -> &[ConstraintKind] {
        &self.kinds
    }

    /// Equality-multiplier sign: +1 if y_j >= 0, -1 otherwise, 0 off equality rows.
    pub fn nu_sign(&self, j: usize) -> i8 {
        self.nu_sign[j]
    }

    pub fn n_eq(&self) -> usize {
        self.eq_rows.len()
    }

    pub fn n_ineq_l(&self) -> usize {
        self.lower_rows.len()
    }

    pub fn n_ineq_u(&self) -> usize {
        self.upper_rows.len()
    }

    /// Total stacked inequality rows (rows of G).
    pub fn n_ineq(&self) -> usize {
        self.n_ineq_l() + self.n_ineq_u()
    }

    pub fn lower_rows(&self) -> &[usize] {
        &self.lower_rows
    }

    pub fn upper_rows(&self) -> &[usize] {
        &self.upper_rows
    }

    pub fn eq_rows(&self) -> &[usize] {
        &self.eq_rows
    }

    pub fn is_equality_mask(&self) -> Vec<bool> {
        self.kinds.iter().map(|k| k.is_equality()).collect()
    }

    pub fn has_lower_mask(&self) -> Vec<bool> {
        self.kinds.iter().map(|k| k.has_lower()).collect()
    }

    pub fn has_upper_mask(&self) -> Vec<bool> {
        self.kinds.iter().map(|k| k.has_upper()).collect()
    }
}

/// Entries of `v` at `rows`, in that order.
pub(crate) fn gather(v: &[f64], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&j| v[j]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = 1e30;

    #[test]
    fn test_classify_all_kinds() {
        let l = vec![3.0, 0.0, -INF, -1.0, -INF];
        let u = vec![3.0, INF, 2.0, 1.0, INF];
        let y = vec![-0.5, 1.0, 0.0, 0.0, 0.0];

        let c = Classification::new(&l, &u, &y, INF, 0.0);

        assert_eq!(
            c.kinds(),
            &[
                ConstraintKind::Equality,
                ConstraintKind::LowerOnly,
                ConstraintKind::UpperOnly,
                ConstraintKind::TwoSided,
                ConstraintKind::Free,
            ]
        );
        assert_eq!(c.n_eq(), 1);
        assert_eq!(c.n_ineq_l(), 2);
        assert_eq!(c.n_ineq_u(), 2);
        assert_eq!(c.lower_rows(), &[1, 3]);
        assert_eq!(c.upper_rows(), &[2, 3]);
        assert_eq!(c.eq_rows(), &[0]);
        assert_eq!(c.nu_sign(0), -1);
        assert_eq!(c.nu_sign(1), 0);
    }

    #[test]
    fn test_views_are_consistent() {
        let l = vec![1.0, -INF, 0.0, 2.0, -INF, -5.0];
        let u = vec![1.0, INF, 4.0, 2.0, 7.0, INF];
        let y = vec![0.0, 0.0, 0.3, -2.0, 0.1, -0.2];

        let c = Classification::new(&l, &u, &y, INF, 0.0);
        let eq = c.is_equality_mask();
        let lo = c.has_lower_mask();
        let up = c.has_upper_mask();

        for j in 0..c.len() {
            // Equality rows never carry a one-sided flag
            if eq[j] {
                assert!(!lo[j] && !up[j]);
                assert_ne!(c.nu_sign(j), 0);
            } else {
                assert_eq!(c.nu_sign(j), 0);
            }
        }
        assert_eq!(lo.iter().filter(|&&b| b).count(), c.n_ineq_l());
        assert_eq!(up.iter().filter(|&&b| b).count(), c.n_ineq_u());
        assert_eq!(eq.iter().filter(|&&b| b).count(), c.n_eq());

        let free = c.kinds().iter().filter(|k| **k == ConstraintKind::Free).count();
        let one_or_two = c
            .kinds()
            .iter()
            .filter(|k| k.has_lower() || k.has_upper())
            .count();
        assert_eq!(c.n_eq() + one_or_two + free, c.len());
    }

    #[test]
    fn test_zero_dual_equality_is_positive() {
        let c = Classification::new(&[1.0], &[1.0], &[0.0], INF, 0.0);
        assert_eq!(c.nu_sign(0), 1);
    }

    #[test]
    fn test_custom_infinity_threshold() {
        // 1e10 counts as infinite under a 1e9 threshold
        let c = Classification::new(&[-1e10], &[1e10], &[0.0], 1e9, 0.0);
        assert_eq!(c.kind(0), ConstraintKind::Free);

        let c = Classification::new(&[-1e10], &[1e10], &[0.0], 1e30, 0.0);
        assert_eq!(c.kind(0), ConstraintKind::TwoSided);
    }

    #[test]
    fn test_equality_tolerance() {
        let l = [1.0];
        let u = [1.0 + 1e-12];
        assert_eq!(Classification::new(&l, &u, &[0.0], INF, 0.0).kind(0), ConstraintKind::TwoSided);
        assert_eq!(Classification::new(&l, &u, &[0.0], INF, 1e-9).kind(0), ConstraintKind::Equality);
    }

    #[test]
    fn test_gather() {
        assert_eq!(gather(&[1.0, 2.0, 3.0], &[2, 0]), vec![3.0, 1.0]);
    }
}
