//! Forward stepwise predictor selection (screening regression).
//!
//! Working slots are 0-based: `0..P` hold predictors, `P..V` predictands. After `k`
//! accepted steps, slots `0..k` hold the selected predictors in selection order and
//! the predictand columns of those rows hold the current regression coefficients.
//!
//! One step:
//!
//! 1. every remaining predictor `l` (slots `k..P`) passes the colinearity gate if
//!    `p[l,l] > 0`, `sig[l] > 0` and `p[l,l] > threshold(kind) * sig[l]`, i.e. enough
//!    of its variance is still unexplained by the selected predictors
//! 2. for eligible candidates, `cor2[l,m] = p[l,m]² / p[l,l] * (1 / var[m])` is the
//!    reduction of variance predictand `m` would gain
//! 3. the largest `cor2` wins (candidate-major scan, first maximum on ties)
//! 4. it is accepted if that maximum is positive and exceeds `cutoff` for at least
//!    one predictand; otherwise screening stops
//! 5. the winner is swapped into slot `k` and `p` is swept on that slot

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{PredictorKind, RegressionParams};
use crate::error::EngineError;
use crate::math::{SweepScratch, sweep, swap_slots};
use crate::screening::normalizer::NormalizedCovariance;

/// Where the selector is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Selecting,
    Done(StopReason),
}

/// Why screening ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `min(P, max_select)` predictors were accepted.
    LimitReached,
    /// No remaining candidate passed the colinearity gate with a positive gain.
    NoCandidate,
    /// The best candidate does not add `cutoff` reduction of variance to any predictand.
    BelowCutoff,
    /// The elimination sweep failed.
    DegeneratePivot,
}

/// Running regression statistics, one value per predictand.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStats {
    pub constant: DVector<f64>,
    pub standard_error: DVector<f64>,
    pub reduction_of_variance: DVector<f64>,
    pub multiple_correlation: DVector<f64>,
}

impl RunningStats {
    fn zeros(num_predictands: usize) -> Self {
        Self {
            constant: DVector::zeros(num_predictands),
            standard_error: DVector::zeros(num_predictands),
            reduction_of_variance: DVector::zeros(num_predictands),
            multiple_correlation: DVector::zeros(num_predictands),
        }
    }
}

/// A candidate picked by one round of screening.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    slot: usize,
    best: f64,
}

/// Stepwise selection state for one group.
///
/// Everything here is owned by the group's task; nothing is shared across groups.
#[derive(Debug, Clone)]
pub struct StepwiseSelector<'a> {
    group: usize,
    params: &'a RegressionParams,
    kinds: &'a [PredictorKind],
    names: &'a [String],
    cov: NormalizedCovariance,
    /// `order[slot]` = input position of the predictor now in that slot.
    order: Vec<usize>,
    accepted: usize,
    limit: usize,
    state: SelectorState,
    stats: RunningStats,
    /// Per-predictand reduction of variance of the current winner.
    gains: Vec<f64>,
    candidate_gains: Vec<f64>,
    scratch: SweepScratch,
    failure: Option<EngineError>,
}

/// Final state of a selector run, consumed by the assembler.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub group: usize,
    pub sample_count: usize,
    pub num_predictors: usize,
    /// Number of accepted predictors (`knt`).
    pub accepted: usize,
    /// Final swept matrix.
    pub p: DMatrix<f64>,
    pub avg: DVector<f64>,
    pub order: Vec<usize>,
    pub stats: RunningStats,
    pub stop: StopReason,
    pub failure: Option<EngineError>,
}

impl<'a> StepwiseSelector<'a> {
    /// Prepare selection for one group.
    ///
    /// `names` are the predictor names (used in logs and errors), `kinds` their kinds.
    pub fn new(
        group: usize,
        cov: NormalizedCovariance,
        kinds: &'a [PredictorKind],
        names: &'a [String],
        params: &'a RegressionParams,
    ) -> Self {
        let num_predictors = cov.num_predictors;
        let num_predictands = cov.num_predictands();
        let v = cov.num_variables();
        let limit = num_predictors.min(params.max_select);
        Self {
            group,
            params,
            kinds,
            names,
            order: (0..num_predictors).collect(),
            accepted: 0,
            limit,
            state: if limit == 0 {
                SelectorState::Done(StopReason::LimitReached)
            } else {
                SelectorState::Selecting
            },
            stats: RunningStats::zeros(num_predictands),
            gains: vec![0.0; num_predictands],
            candidate_gains: vec![0.0; num_predictands],
            scratch: SweepScratch::new(v),
            failure: None,
            cov,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Working statistics as swept so far.
    pub fn covariance(&self) -> &NormalizedCovariance {
        &self.cov
    }

    /// `order()[slot]` is the predictor currently held in `slot`.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Run one screening round.
    pub fn step(&mut self) -> SelectorState {
        if let SelectorState::Done(_) = self.state {
            return self.state;
        }

        let Some(candidate) = self.find_candidate() else {
            debug!("group {}: no eligible candidate after {} predictors", self.group, self.accepted);
            self.state = SelectorState::Done(StopReason::NoCandidate);
            return self.state;
        };

        let cutoff = self.params.cutoff;
        if !self.gains.iter().any(|&g| g > cutoff) {
            debug!(
                "group {}: next predictor does not contribute more than {cutoff} reduction of variance",
                self.group
            );
            self.state = SelectorState::Done(StopReason::BelowCutoff);
            return self.state;
        }

        if let Err(err) = self.accept(candidate.slot) {
            self.failure = Some(err);
            self.state = SelectorState::Done(StopReason::DegeneratePivot);
            return self.state;
        }

        if self.accepted == self.limit {
            self.state = SelectorState::Done(StopReason::LimitReached);
        }
        self.state
    }

    /// Step until done.
    pub fn run(mut self) -> SelectionOutcome {
        while self.step() == SelectorState::Selecting {}
        self.finish()
    }

    fn finish(self) -> SelectionOutcome {
        let stop = match self.state {
            SelectorState::Done(reason) => reason,
            SelectorState::Selecting => StopReason::LimitReached,
        };
        SelectionOutcome {
            group: self.group,
            sample_count: self.cov.sample_count,
            num_predictors: self.cov.num_predictors,
            accepted: self.accepted,
            p: self.cov.p,
            avg: self.cov.avg,
            order: self.order,
            stats: self.stats,
            stop,
            failure: self.failure,
        }
    }

    /// Scan remaining predictors for the largest reduction of variance.
    ///
    /// On success, `self.gains` holds the winner's per-predictand gains.
    fn find_candidate(&mut self) -> Option<Candidate> {
        let p = &self.cov.p;
        let sig = &self.cov.sig;
        let recip = &self.cov.recip_predictand_variance;
        let first_tand = self.cov.num_predictors;

        let mut best: Option<Candidate> = None;
        for l in self.accepted..self.cov.num_predictors {
            let pll = p[(l, l)];
            let threshold = self.params.colinearity_threshold(self.kinds[self.order[l]]);
            if !(pll > 0.0 && sig[l] > 0.0 && pll > threshold * sig[l]) {
                continue;
            }

            let pll_1 = 1.0 / pll;
            let mut row_max = 0.0;
            for (m, gain) in self.candidate_gains.iter_mut().enumerate() {
                let plm = p[(l, first_tand + m)];
                *gain = pll_1 * (plm * plm) * recip[m];
                if *gain > row_max {
                    row_max = *gain;
                }
            }

            let current = best.as_ref().map_or(0.0, |c| c.best);
            if row_max > current {
                best = Some(Candidate { slot: l, best: row_max });
                self.gains.copy_from_slice(&self.candidate_gains);
            }
        }
        best
    }

    /// Move `key` into the next slot, sweep on it, and refresh statistics.
    fn accept(&mut self, key: usize) -> Result<(), EngineError> {
        let k = self.accepted;
        debug_assert!(key >= k && key < self.cov.num_predictors);

        swap_slots(&mut self.cov.p, k, key);
        self.cov.sig.swap_rows(k, key);
        self.cov.avg.swap_rows(k, key);
        self.order.swap(k, key);

        let predictor = self.order[k];
        sweep(&mut self.cov.p, k, &mut self.scratch).map_err(|zp| EngineError::DegeneratePivot {
            group: self.group,
            step: k + 1,
            predictor: self.names[predictor].clone(),
            pivot: zp.pivot,
        })?;

        self.accepted = k + 1;
        self.update_stats();

        debug!(
            "group {}: step {} selected '{}' total RV {:?}",
            self.group,
            self.accepted,
            self.names[predictor],
            self.stats.reduction_of_variance.as_slice()
        );
        Ok(())
    }

    fn update_stats(&mut self) {
        let p = &self.cov.p;
        let avg = &self.cov.avg;
        let sig = &self.cov.sig;
        let first_tand = self.cov.num_predictors;
        let n = self.cov.sample_count as f64;

        for m in 0..self.stats.constant.len() {
            let col = first_tand + m;

            let mut a = avg[col];
            for s in 0..self.accepted {
                a -= avg[s] * p[(s, col)];
            }
            self.stats.constant[m] = a;

            let residual = p[(col, col)];
            let ess = if residual > 0.0 { residual } else { 0.0 };
            self.stats.standard_error[m] = (1.0 / n * ess).sqrt();

            let scale = (1.0 / n) / (sig[col] * sig[col]);
            let rv = 1.0 - residual * scale;
            let rv = if rv > 0.0 && rv.is_finite() { rv } else { 0.0 };
            self.stats.reduction_of_variance[m] = rv;
            self.stats.multiple_correlation[m] = rv.sqrt();
        }
    }
}
