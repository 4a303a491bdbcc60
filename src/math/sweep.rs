//! Gauss–Jordan sweep of a covariance matrix.
//!
//! Stepwise regression repeatedly pivots the working covariance matrix on the slot
//! of the predictor that just entered the equation:
//!
//! ```text
//! f      = 1 / p[k,k]
//! p      = p - f * outer(p[:,k], p[k,:])
//! p[k,:] = f * (row k before the update)
//! ```
//!
//! After the sweep, column `k` is the unit vector `e_k`, the rows of the entered
//! predictors hold their regression coefficients, and the remaining block holds
//! residual (co)variances orthogonal to the entered predictors.

use nalgebra::{DMatrix, DVector};

/// The pivot element cannot be inverted to a finite value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroPivot {
    pub slot: usize,
    pub pivot: f64,
}

impl std::fmt::Display for ZeroPivot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pivot {:e} at slot {} is not invertible", self.pivot, self.slot)
    }
}

impl std::error::Error for ZeroPivot {}

/// Reusable buffers for [`sweep`], sized to the matrix dimension.
#[derive(Debug, Clone)]
pub struct SweepScratch {
    column: DVector<f64>,
    row: DVector<f64>,
}

impl SweepScratch {
    pub fn new(dim: usize) -> Self {
        Self {
            column: DVector::zeros(dim),
            row: DVector::zeros(dim),
        }
    }
}

/// Sweep `p` on `slot` in place.
///
/// `p` is left untouched when the pivot is zero, non-finite, or so small that its
/// reciprocal overflows.
pub fn sweep(p: &mut DMatrix<f64>, slot: usize, scratch: &mut SweepScratch) -> Result<(), ZeroPivot> {
    let n = p.nrows();
    debug_assert_eq!(n, p.ncols());
    debug_assert_eq!(scratch.column.len(), n);

    let pivot = p[(slot, slot)];
    let f = 1.0 / pivot;
    if pivot == 0.0 || !pivot.is_finite() || !f.is_finite() {
        return Err(ZeroPivot { slot, pivot });
    }

    for i in 0..n {
        scratch.column[i] = p[(i, slot)];
        scratch.row[i] = p[(slot, i)];
    }

    // Column-major traversal keeps the inner loop contiguous.
    for j in 0..n {
        let rj = scratch.row[j];
        for i in 0..n {
            p[(i, j)] -= f * (scratch.column[i] * rj);
        }
    }

    for j in 0..n {
        p[(slot, j)] = f * scratch.row[j];
    }

    Ok(())
}

/// Exchange slots `a` and `b` of a square matrix (both rows and columns).
pub fn swap_slots(p: &mut DMatrix<f64>, a: usize, b: usize) {
    if a == b {
        return;
    }
    p.swap_columns(a, b);
    p.swap_rows(a, b);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_yields_unit_column_and_regression_coefficient() {
        // Covariance of (x, y) with y = 3x: var(x)=2, cov=6, var(y)=18.
        let mut p = DMatrix::from_row_slice(2, 2, &[2.0, 6.0, 6.0, 18.0]);
        let mut scratch = SweepScratch::new(2);
        sweep(&mut p, 0, &mut scratch).unwrap();

        assert!((p[(0, 0)] - 1.0).abs() < 1e-15);
        assert!(p[(1, 0)].abs() < 1e-15);
        // Coefficient of y on x.
        assert!((p[(0, 1)] - 3.0).abs() < 1e-15);
        // Residual variance of y.
        assert!(p[(1, 1)].abs() < 1e-12);
    }

    #[test]
    fn sweeping_two_predictors_recovers_multiple_regression() {
        // Variables (x1, x2, y) with y = 1*x1 + 2*x2, x1 and x2 correlated.
        // Sums of squares: x1x1=4, x1x2=2, x2x2=3.
        let c11 = 4.0;
        let c12 = 2.0;
        let c22 = 3.0;
        let c1y = c11 + 2.0 * c12;
        let c2y = c12 + 2.0 * c22;
        let cyy = c1y + 2.0 * c2y;
        let mut p = DMatrix::from_row_slice(
            3,
            3,
            &[c11, c12, c1y, c12, c22, c2y, c1y, c2y, cyy],
        );
        let mut scratch = SweepScratch::new(3);
        sweep(&mut p, 0, &mut scratch).unwrap();
        sweep(&mut p, 1, &mut scratch).unwrap();

        assert!((p[(0, 2)] - 1.0).abs() < 1e-12);
        assert!((p[(1, 2)] - 2.0).abs() < 1e-12);
        assert!(p[(2, 2)].abs() < 1e-10);
    }

    #[test]
    fn zero_pivot_is_reported_without_touching_the_matrix() {
        let mut p = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 4.0]);
        let before = p.clone();
        let err = sweep(&mut p, 0, &mut SweepScratch::new(2)).unwrap_err();
        assert_eq!(err.slot, 0);
        assert_eq!(p, before);

        // Subnormal pivot: the reciprocal overflows.
        let mut p = DMatrix::from_row_slice(2, 2, &[1e-315, 1.0, 1.0, 4.0]);
        assert!(sweep(&mut p, 0, &mut SweepScratch::new(2)).is_err());
    }

    #[test]
    fn swap_slots_permutes_rows_and_columns() {
        let mut p = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 5.0, 6.0, 3.0, 6.0, 9.0]);
        swap_slots(&mut p, 0, 2);
        assert_eq!(p[(0, 0)], 9.0);
        assert_eq!(p[(2, 2)], 1.0);
        assert_eq!(p[(0, 1)], 6.0);
        assert_eq!(p[(1, 0)], 6.0);
        assert_eq!(p[(0, 2)], 3.0);
    }
}
