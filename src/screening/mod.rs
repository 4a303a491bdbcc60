//! Screening regression over station groups.
//!
//! Per group the chain is:
//!
//! - accumulate cross products over every complete station-date pair
//! - normalize to a centered covariance matrix (with binary screening)
//! - select predictors stepwise
//! - assemble the equation
//!
//! Groups share nothing but the read-only variable set and parameters, so they are
//! developed in parallel. Results are collected by group index, which keeps the
//! output order (and content) independent of scheduling.

pub mod accumulator;
pub mod assembler;
pub mod normalizer;
pub mod selector;

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::domain::{
    Equation, GroupResult, GroupStatus, RegressionParams, RunSummary, StationGroup, VariableSet,
};
use crate::error::EngineError;

pub use accumulator::{CrossProducts, accumulate};
pub use assembler::assemble;
pub use normalizer::{NormalizedCovariance, normalize};
pub use selector::{SelectionOutcome, SelectorState, StepwiseSelector, StopReason};

/// Equations for every group of a run, in group order.
#[derive(Debug, Clone)]
pub struct ScreeningRun {
    pub results: Vec<GroupResult>,
    pub summary: RunSummary,
}

impl ScreeningRun {
    pub fn equations(&self) -> impl Iterator<Item = &Equation> {
        self.results.iter().map(|r| &r.equation)
    }
}

/// Develop one equation per station group.
///
/// Configuration and shape problems abort before any group runs. Problems inside a
/// group are recorded in that group's [`GroupStatus`] and never affect its siblings.
pub fn develop_equations(
    data: &VariableSet,
    groups: &[StationGroup],
    params: &RegressionParams,
) -> Result<ScreeningRun, EngineError> {
    params.validate()?;
    let resolved = data.resolve_groups(groups)?;

    for setting in params.unimplemented_settings() {
        warn!("{setting} is accepted but not implemented; screening ignores it");
    }

    info!(
        "developing {} groups: {} stations x {} dates, {} predictors, {} predictands",
        groups.len(),
        data.num_stations(),
        data.num_dates(),
        data.num_predictors(),
        data.num_predictands()
    );

    let names: Vec<String> = data.variable_names()[..data.num_predictors()].to_vec();

    let results: Vec<GroupResult> = groups
        .par_iter()
        .zip(resolved.par_iter())
        .enumerate()
        .map(|(g, (group, stations))| develop_group(data, g, group, stations, &names, params))
        .collect();

    let summary = RunSummary::from_results(&results);
    info!(
        "{} groups: {} developed, {} without predictors, {} skipped, {} failed",
        summary.groups, summary.developed, summary.no_predictor, summary.skipped, summary.failed
    );

    Ok(ScreeningRun { results, summary })
}

/// Develop the equation for a single group.
///
/// `stations` are the group's station indices into `data`; `names` the predictor names.
pub fn develop_group(
    data: &VariableSet,
    group_index: usize,
    group: &StationGroup,
    stations: &[usize],
    names: &[String],
    params: &RegressionParams,
) -> GroupResult {
    let num_predictands = data.num_predictands();
    let label = group.label();

    let xp = accumulate(data, stations);
    let n = xp.sample_count;
    debug!("group {group_index} ({label}): {n} complete cases");

    if n <= 1 {
        warn!("group {group_index} ({label}): insufficient sample ({n} cases), skipped");
        return GroupResult {
            equation: Equation::empty(group_index, group, n, num_predictands),
            status: GroupStatus::InsufficientSample,
        };
    }
    if n < params.min_cases_required {
        warn!(
            "group {group_index} ({label}): only {n} cases, fewer than the {} required; developing anyway",
            params.min_cases_required
        );
    }

    let cov = match normalize(&xp, data.predictor_kinds(), params) {
        Ok(cov) => cov,
        Err(err) => {
            error!("group {group_index} ({label}): {err}");
            return GroupResult {
                equation: Equation::empty(group_index, group, n, num_predictands),
                status: GroupStatus::Failed(err),
            };
        }
    };
    for &i in &cov.screened_out {
        debug!(
            "group {group_index} ({label}): binary predictor '{}' screened out for low variance",
            names[i]
        );
    }
    if !cov.predictands_usable() {
        warn!("group {group_index} ({label}): a predictand has zero variance; no predictor can be selected");
    }

    let outcome = StepwiseSelector::new(group_index, cov, data.predictor_kinds(), names, params).run();
    let equation = assemble(group_index, group, data, &outcome);

    let status = match outcome.failure {
        Some(err) => {
            error!("{err}; keeping {} predictors selected before the failure", outcome.accepted);
            GroupStatus::Failed(err)
        }
        None if outcome.accepted == 0 => GroupStatus::NoPredictorSelected,
        None => GroupStatus::Developed,
    };
    debug!(
        "group {group_index} ({label}): {} predictors, stopped: {:?}",
        outcome.accepted, outcome.stop
    );

    GroupResult { equation, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MISSING, PredictorKind, Variable};
    use chrono::NaiveDate;

    fn dataset(num_stations: usize, num_dates: usize, fill: impl Fn(usize, usize) -> (f64, f64)) -> VariableSet {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let mut x = Vec::new();
        let mut y = Vec::new();
        for s in 0..num_stations {
            for d in 0..num_dates {
                let (xv, yv) = fill(s, d);
                x.push(xv);
                y.push(yv);
            }
        }
        VariableSet::new(
            (0..num_stations).map(|s| format!("K{s:03}")).collect(),
            (0..num_dates).map(|d| start + chrono::Duration::days(d as i64)).collect(),
            vec![
                Variable::predictor("x", PredictorKind::Continuous, x),
                Variable::predictand("y", y),
            ],
        )
        .unwrap()
    }

    #[test]
    fn tiny_groups_are_skipped_without_failing_the_run() {
        // Station 0 has one complete case, station 1 none, station 2 plenty.
        let data = dataset(3, 30, |s, d| match s {
            0 if d == 0 => (1.0, 2.0),
            0 | 1 => (MISSING, 1.0),
            _ => (d as f64, 3.0 * d as f64 + (d % 3) as f64),
        });
        let run = develop_equations(&data, &data.singleton_groups(), &RegressionParams::default()).unwrap();

        assert_eq!(run.results[0].status, GroupStatus::InsufficientSample);
        assert_eq!(run.results[0].equation.sample_count, 1);
        assert_eq!(run.results[1].status, GroupStatus::InsufficientSample);
        assert_eq!(run.results[2].status, GroupStatus::Developed);
        assert_eq!(run.summary.skipped, 2);
        assert_eq!(run.summary.developed, 1);
    }

    #[test]
    fn invalid_parameters_abort_before_any_group() {
        let data = dataset(1, 5, |_, d| (d as f64, d as f64));
        let params = RegressionParams {
            cutoff: 2.0,
            ..RegressionParams::default()
        };
        let err = develop_equations(&data, &data.singleton_groups(), &params).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn pooled_group_uses_cases_from_every_member() {
        let data = dataset(2, 20, |s, d| (d as f64 + s as f64, 2.0 * d as f64 + 1.0));
        let groups = vec![StationGroup::new(vec!["K000".into(), "K001".into()])];
        let run = develop_equations(&data, &groups, &RegressionParams::default()).unwrap();

        let eq = &run.results[0].equation;
        assert_eq!(eq.sample_count, 40);
        assert_eq!(eq.stations, vec!["K000".to_string(), "K001".to_string()]);
        assert_eq!(eq.term_count(), 1);
    }
}
