//! Sparse matrix types and operations.
//!
//! Thin helpers over `sprs` CSC matrices covering what the adjoint pipeline
//! needs: construction from triplets or raw CSC arrays, row selection,
//! vertical stacking, row scaling, symmetric expansion of an upper triangle
//! and the scaled matrix-vector product.
//!
//! Everything that builds a new matrix goes through a `TriMat`, so the
//! returned matrices always have sorted indices with duplicates summed.

use sprs::{CsMat, TriMat};

use super::backend::BackendError;

/// Sparse matrix in CSC format (general, not necessarily symmetric).
pub type SparseCsc = CsMat<f64>;

/// Sparse symmetric matrix in CSC format (upper triangle only).
pub type SparseSymmetricCsc = CsMat<f64>;

/// Build a sparse CSC matrix from triplets (row, col, value).
///
/// # Arguments
///
/// * `nrows` - Number of rows
/// * `ncols` - Number of columns
/// * `triplets` - Iterator of (row, col, value) tuples
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Build a symmetric sparse CSC matrix from upper triangle triplets.
///
/// Only stores the upper triangle. Assumes triplets satisfy j >= i.
pub fn from_triplets_symmetric<I>(n: usize, triplets: I) -> SparseSymmetricCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((n, n));
    for (i, j, v) in triplets {
        assert!(j >= i, "Symmetric matrix must only contain upper triangle");
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Build a CSC matrix from raw compressed-column arrays.
///
/// `indptr` has `ncols + 1` entries, `indices` and `data` one entry per
/// stored value. Row indices need not be sorted within a column.
pub fn from_csc_parts(
    nrows: usize,
    ncols: usize,
    indptr: &[usize],
    indices: &[usize],
    data: &[f64],
) -> Result<SparseCsc, BackendError> {
    if indptr.len() != ncols + 1 {
        return Err(BackendError::DimensionMismatch {
            expected: ncols + 1,
            actual: indptr.len(),
        });
    }
    if indices.len() != data.len() {
        return Err(BackendError::DimensionMismatch {
            expected: data.len(),
            actual: indices.len(),
        });
    }
    if indptr[0] != 0 || indptr[ncols] != data.len() {
        return Err(BackendError::Message(format!(
            "column pointers span [{}, {}), expected [0, {})",
            indptr[0],
            indptr[ncols],
            data.len()
        )));
    }

    // Nondecreasing from 0 to data.len() keeps every column inside the arrays
    if let Some(col) = indptr.windows(2).position(|w| w[0] > w[1]) {
        return Err(BackendError::Message(format!(
            "column pointers decrease at column {}",
            col
        )));
    }

    let mut tri = TriMat::with_capacity((nrows, ncols), data.len());
    for col in 0..ncols {
        for idx in indptr[col]..indptr[col + 1] {
            let row = indices[idx];
            if row >= nrows {
                return Err(BackendError::Message(format!(
                    "row index {} out of range in column {} (nrows={})",
                    row, col, nrows
                )));
            }
            tri.add_triplet(row, col, data[idx]);
        }
    }
    Ok(tri.to_csc())
}

/// Sparse matrix-vector product: y = alpha * A * x + beta * y
pub fn spmv(a: &SparseCsc, x: &[f64], y: &mut [f64], alpha: f64, beta: f64) {
    assert_eq!(a.cols(), x.len());
    assert_eq!(a.rows(), y.len());

    // Scale y by beta
    if beta == 0.0 {
        y.fill(0.0);
    } else if beta != 1.0 {
        for yi in y.iter_mut() {
            *yi *= beta;
        }
    }

    // Add alpha * A * x
    if alpha != 0.0 {
        for (val, (row, col)) in a.iter() {
            y[row] += alpha * (*val) * x[col];
        }
    }
}

/// Rows of `a` whose flag in `keep` is set, scaled by `alpha`, in their
/// original relative order.
pub fn select_rows(a: &SparseCsc, keep: &[bool], alpha: f64) -> SparseCsc {
    assert_eq!(a.rows(), keep.len(), "Row mask must cover every row");

    let mut new_index = vec![usize::MAX; keep.len()];
    let mut nrows = 0;
    for (row, &k) in keep.iter().enumerate() {
        if k {
            new_index[row] = nrows;
            nrows += 1;
        }
    }

    let mut tri = TriMat::new((nrows, a.cols()));
    for (val, (row, col)) in a.iter() {
        if keep[row] {
            tri.add_triplet(new_index[row], col, alpha * (*val));
        }
    }
    tri.to_csc()
}

/// Stack two sparse matrices vertically: [A; B]
pub fn vstack(a: &SparseCsc, b: &SparseCsc) -> SparseCsc {
    assert_eq!(a.cols(), b.cols(), "Matrices must have same number of columns");

    let nrows = a.rows() + b.rows();
    let ncols = a.cols();

    let mut tri = TriMat::with_capacity((nrows, ncols), a.nnz() + b.nnz());

    // Add entries from A
    for (val, (row, col)) in a.iter() {
        tri.add_triplet(row, col, *val);
    }

    // Add entries from B (offset rows by a.rows())
    for (val, (row, col)) in b.iter() {
        tri.add_triplet(row + a.rows(), col, *val);
    }

    tri.to_csc()
}

/// Row-wise diagonal scaling: diag(d) * A
pub fn scale_rows(a: &SparseCsc, d: &[f64]) -> SparseCsc {
    assert_eq!(a.rows(), d.len(), "Scaling vector must match row count");

    let mut tri = TriMat::with_capacity((a.rows(), a.cols()), a.nnz());
    for (val, (row, col)) in a.iter() {
        tri.add_triplet(row, col, d[row] * (*val));
    }
    tri.to_csc()
}

/// Expand an upper-triangular matrix into its full symmetric form.
///
/// Entries below the diagonal in the input are ignored; the diagonal is
/// copied once.
pub fn triu_to_symm(p: &SparseSymmetricCsc) -> SparseCsc {
    assert_eq!(p.rows(), p.cols(), "Symmetric matrix must be square");

    let mut tri = TriMat::with_capacity((p.rows(), p.cols()), 2 * p.nnz());
    for (val, (row, col)) in p.iter() {
        if row < col {
            tri.add_triplet(row, col, *val);
            tri.add_triplet(col, row, *val);
        } else if row == col {
            tri.add_triplet(row, col, *val);
        }
    }
    tri.to_csc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(a: &SparseCsc) -> Vec<Vec<f64>> {
        let mut out = vec![vec![0.0; a.cols()]; a.rows()];
        for (val, (row, col)) in a.iter() {
            out[row][col] += *val;
        }
        out
    }

    #[test]
    fn test_from_triplets() {
        let triplets = vec![
            (0, 0, 1.0),
            (1, 1, 2.0),
            (0, 1, 3.0),
        ];
        let mat = from_triplets(2, 2, triplets);

        assert_eq!(mat.rows(), 2);
        assert_eq!(mat.cols(), 2);
        assert_eq!(mat.nnz(), 3);
    }

    #[test]
    fn test_from_csc_parts() {
        // [[1, 0], [2, 3]] column-major
        let mat = from_csc_parts(2, 2, &[0, 2, 3], &[0, 1, 1], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(dense(&mat), vec![vec![1.0, 0.0], vec![2.0, 3.0]]);

        assert!(from_csc_parts(2, 2, &[0, 2], &[0, 1], &[1.0, 2.0]).is_err());
        assert!(from_csc_parts(2, 1, &[0, 1], &[5], &[1.0]).is_err());
        assert!(from_csc_parts(2, 1, &[0, 2], &[0], &[1.0]).is_err());
    }

    #[test]
    fn test_from_csc_parts_rejects_decreasing_pointers() {
        // Inner pointer past the end of the arrays
        let err = from_csc_parts(2, 2, &[0, 5, 2], &[0, 1], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, BackendError::Message(_)));

        assert!(from_csc_parts(2, 3, &[0, 2, 1, 2], &[0, 1], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_spmv() {
        // 2x2 matrix: [[1, 2], [3, 4]]
        let triplets = vec![
            (0, 0, 1.0), (0, 1, 2.0),
            (1, 0, 3.0), (1, 1, 4.0),
        ];
        let mat = from_triplets(2, 2, triplets);

        let x = vec![1.0, 2.0];
        let mut y = vec![0.0; 2];

        spmv(&mat, &x, &mut y, 1.0, 0.0);

        // y = [[1, 2], [3, 4]] * [1, 2] = [5, 11]
        assert!((y[0] - 5.0).abs() < 1e-10);
        assert!((y[1] - 11.0).abs() < 1e-10);

        // y <- 1 * y - A x = 0
        spmv(&mat, &x, &mut y, -1.0, 1.0);
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_select_rows() {
        // [[1, 0], [0, 2], [3, 4]]
        let a = from_triplets(3, 2, vec![(0, 0, 1.0), (1, 1, 2.0), (2, 0, 3.0), (2, 1, 4.0)]);

        let sel = select_rows(&a, &[true, false, true], -1.0);
        assert_eq!(dense(&sel), vec![vec![-1.0, 0.0], vec![-3.0, -4.0]]);

        let none = select_rows(&a, &[false, false, false], 1.0);
        assert_eq!(none.rows(), 0);
        assert_eq!(none.cols(), 2);
    }

    #[test]
    fn test_vstack() {
        // A = [[1, 2]]  (1x2)
        // B = [[3, 4]]  (1x2)
        // [A; B] = [[1, 2], [3, 4]]  (2x2)

        let a = from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 2.0)]);
        let b = from_triplets(1, 2, vec![(0, 0, 3.0), (0, 1, 4.0)]);

        let stacked = vstack(&a, &b);

        assert_eq!(stacked.rows(), 2);
        assert_eq!(stacked.cols(), 2);
        assert_eq!(stacked.nnz(), 4);
        assert_eq!(dense(&stacked), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_scale_rows() {
        let a = from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)]);
        let scaled = scale_rows(&a, &[2.0, -1.0]);
        assert_eq!(dense(&scaled), vec![vec![2.0, 4.0], vec![0.0, -3.0]]);
    }

    #[test]
    fn test_triu_to_symm() {
        let p = from_triplets_symmetric(2, vec![(0, 0, 4.0), (0, 1, 1.0), (1, 1, 2.0)]);
        let full = triu_to_symm(&p);

        // Diagonal is not doubled
        assert_eq!(dense(&full), vec![vec![4.0, 1.0], vec![1.0, 2.0]]);
        assert_eq!(full.nnz(), 4);
    }
}
