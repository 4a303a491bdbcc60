//! From cross-product sums to the working covariance matrix.
//!
//! - `avg = sums / n`
//! - `p = sum_x - outer(avg, sums)` (sums of squared deviations, not divided by `n`)
//! - the diagonal is clamped at zero to absorb round-off
//! - `std = sqrt(var / n)`
//!
//! Binary predictors whose variance falls below their kind's threshold are removed
//! from candidacy by zeroing their row and column, without resizing `p`.
//!
//! `sig` deliberately has two meanings: for predictor slots it is the raw sum of
//! squares (the diagonal of `p`), for predictand slots the standard deviation. The
//! colinearity gate and the reduction-of-variance formula both rely on this.

use nalgebra::{DMatrix, DVector};

use crate::domain::{PredictorKind, RegressionParams};
use crate::error::EngineError;
use crate::screening::accumulator::CrossProducts;

/// Centered statistics for one group, ready for stepwise selection.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCovariance {
    pub sample_count: usize,
    pub num_predictors: usize,
    /// Working covariance (sums of squared deviations), `V × V`.
    pub p: DMatrix<f64>,
    pub avg: DVector<f64>,
    /// Sum of squares for predictors, standard deviation for predictands.
    pub sig: DVector<f64>,
    /// `1 / variance` per predictand, or all zeros when any predictand has zero variance.
    pub recip_predictand_variance: DVector<f64>,
    /// Predictors zeroed by the binary variance screen.
    pub screened_out: Vec<usize>,
}

impl NormalizedCovariance {
    pub fn num_variables(&self) -> usize {
        self.avg.len()
    }

    pub fn num_predictands(&self) -> usize {
        self.num_variables() - self.num_predictors
    }

    /// Whether the partial-correlation test can be evaluated at all.
    pub fn predictands_usable(&self) -> bool {
        self.recip_predictand_variance.iter().any(|&r| r != 0.0)
    }
}

/// Normalize one group's cross products.
///
/// `kinds` holds the kind of every predictor; its length is the predictor count.
pub fn normalize(
    xp: &CrossProducts,
    kinds: &[PredictorKind],
    params: &RegressionParams,
) -> Result<NormalizedCovariance, EngineError> {
    let v = xp.num_variables();
    let num_predictors = kinds.len();
    if num_predictors >= v {
        return Err(EngineError::ShapeMismatch(format!(
            "{num_predictors} predictor kinds for {v} variables"
        )));
    }
    if xp.sample_count == 0 {
        return Err(EngineError::InsufficientSample {
            group: 0,
            sample_count: 0,
        });
    }

    let n = xp.sample_count as f64;
    let avg = &xp.sums * (1.0 / n);
    let mut p = &xp.sum_x - &avg * xp.sums.transpose();

    let mut variance = DVector::zeros(v);
    for i in 0..v {
        let d = p[(i, i)];
        let d = if d > 0.0 { d } else { 0.0 };
        p[(i, i)] = d;
        variance[i] = d;
    }
    let mut std_dev = variance.map(|var: f64| (var / n).sqrt());

    let mut screened_out = Vec::new();
    for (i, &kind) in kinds.iter().enumerate() {
        let Some(threshold) = params.variance_threshold(kind) else {
            continue;
        };
        if std_dev[i] * std_dev[i] < threshold {
            p.row_mut(i).fill(0.0);
            p.column_mut(i).fill(0.0);
            std_dev[i] = 0.0;
            variance[i] = 0.0;
            screened_out.push(i);
        }
    }

    let mut sig = std_dev;
    for i in 0..num_predictors {
        sig[i] = variance[i];
    }

    let num_predictands = v - num_predictors;
    let mut recip_predictand_variance = DVector::zeros(num_predictands);
    let tand_variance = variance.rows(num_predictors, num_predictands);
    if tand_variance.iter().all(|&var| var != 0.0) {
        for (r, &var) in recip_predictand_variance.iter_mut().zip(tand_variance.iter()) {
            *r = 1.0 / var;
        }
    }

    Ok(NormalizedCovariance {
        sample_count: xp.sample_count,
        num_predictors,
        p,
        avg,
        sig,
        recip_predictand_variance,
        screened_out,
    })
}
