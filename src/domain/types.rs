//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during screening
//! - exported to JSON/CSV for the equation writer
//! - reloaded later (parameter files)

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// How a predictor's values are distributed.
///
/// Binary predictors get a minimum-variance screen and their own colinearity
/// threshold; continuous predictors only the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PredictorKind {
    Continuous,
    /// 0/1 predictor derived from a point (station) value.
    PointBinary,
    /// 0/1 predictor derived from a gridded field.
    GridBinary,
}

impl PredictorKind {
    pub fn is_binary(self) -> bool {
        !matches!(self, PredictorKind::Continuous)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PredictorKind::Continuous => "continuous",
            PredictorKind::PointBinary => "point binary",
            PredictorKind::GridBinary => "grid binary",
        }
    }
}

/// How the next predictor is chosen.
///
/// Only `Single` is implemented: a candidate qualifies through its reduction of
/// variance on any one predictand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    #[default]
    Single,
    /// Reduction of variance averaged over all predictands (not implemented).
    Average,
}

/// When screening stops.
///
/// Only `Cutoff` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoppingMethod {
    #[default]
    Cutoff,
    /// Significance-test based stopping (not implemented).
    Significance,
}

/// Parameters for one screening regression run.
///
/// Every group is developed with the same parameters, so they are validated once
/// before any group is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionParams {
    /// Maximum number of predictors per equation.
    pub max_select: usize,
    /// Number of forced predictors. Parsed but not used by the screening loop.
    pub force_select: usize,
    pub selection_method: SelectionMethod,
    pub stopping_method: StoppingMethod,
    /// Groups with fewer complete cases than this are developed with a warning.
    pub min_cases_required: usize,
    /// Reduction of variance a predictor must add on some predictand to be accepted.
    pub cutoff: f64,
    /// Reduction of variance for forced predictors. Parsed but not used.
    pub forced_cutoff: f64,
    pub point_binary_variance_threshold: f64,
    pub grid_binary_variance_threshold: f64,
    /// Fraction of a continuous predictor's variance that must remain unexplained
    /// by the already selected predictors for it to stay a candidate.
    pub continuous_colinearity_threshold: f64,
    pub point_binary_colinearity_threshold: f64,
    pub grid_binary_colinearity_threshold: f64,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            max_select: 15,
            force_select: 0,
            selection_method: SelectionMethod::Single,
            stopping_method: StoppingMethod::Cutoff,
            min_cases_required: 200,
            cutoff: 0.005,
            forced_cutoff: 0.0,
            point_binary_variance_threshold: 0.0025,
            grid_binary_variance_threshold: 0.0025,
            continuous_colinearity_threshold: 0.10,
            point_binary_colinearity_threshold: 0.05,
            grid_binary_colinearity_threshold: 0.05,
        }
    }
}

impl RegressionParams {
    /// Reject parameter sets that would make every group meaningless.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_select == 0 {
            return Err(EngineError::Configuration(
                "max_select must be >= 1".to_string(),
            ));
        }

        let unit_interval = [("cutoff", self.cutoff), ("forced_cutoff", self.forced_cutoff)];
        for (name, value) in unit_interval {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(EngineError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let thresholds = [
            ("point_binary_variance_threshold", self.point_binary_variance_threshold),
            ("grid_binary_variance_threshold", self.grid_binary_variance_threshold),
            ("continuous_colinearity_threshold", self.continuous_colinearity_threshold),
            ("point_binary_colinearity_threshold", self.point_binary_colinearity_threshold),
            ("grid_binary_colinearity_threshold", self.grid_binary_colinearity_threshold),
        ];
        for (name, value) in thresholds {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::Configuration(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Colinearity threshold applied to a candidate of the given kind.
    pub fn colinearity_threshold(&self, kind: PredictorKind) -> f64 {
        match kind {
            PredictorKind::Continuous => self.continuous_colinearity_threshold,
            PredictorKind::PointBinary => self.point_binary_colinearity_threshold,
            PredictorKind::GridBinary => self.grid_binary_colinearity_threshold,
        }
    }

    /// Minimum variance for a binary predictor; `None` for continuous ones.
    pub fn variance_threshold(&self, kind: PredictorKind) -> Option<f64> {
        match kind {
            PredictorKind::Continuous => None,
            PredictorKind::PointBinary => Some(self.point_binary_variance_threshold),
            PredictorKind::GridBinary => Some(self.grid_binary_variance_threshold),
        }
    }

    /// Settings that are accepted for compatibility but have no effect yet.
    pub fn unimplemented_settings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.force_select > 0 {
            out.push(format!("force_select={}", self.force_select));
        }
        if self.forced_cutoff > 0.0 {
            out.push(format!("forced_cutoff={}", self.forced_cutoff));
        }
        if self.selection_method != SelectionMethod::Single {
            out.push(format!("selection_method={:?}", self.selection_method).to_lowercase());
        }
        if self.stopping_method != StoppingMethod::Cutoff {
            out.push(format!("stopping_method={:?}", self.stopping_method).to_lowercase());
        }
        out
    }
}

/// Stations pooled to develop a single equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationGroup {
    pub stations: Vec<String>,
}

impl StationGroup {
    pub fn new(stations: Vec<String>) -> Self {
        Self { stations }
    }

    pub fn singleton(station: impl Into<String>) -> Self {
        Self {
            stations: vec![station.into()],
        }
    }

    /// Short label for logs: the first station, plus a count for larger groups.
    pub fn label(&self) -> String {
        match self.stations.as_slice() {
            [] => "<empty>".to_string(),
            [only] => only.clone(),
            [first, rest @ ..] => format!("{first} (+{} stations)", rest.len()),
        }
    }
}

/// A predictor chosen into an equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictorId {
    /// Position among the predictors of the variable set.
    pub index: usize,
    pub name: String,
}

/// Statistics reported alongside an equation, one value per predictand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ancillary {
    pub equation_constant: Vec<f64>,
    pub multiple_correlation_coefficient: Vec<f64>,
    pub standard_error_estimate: Vec<f64>,
    pub reduction_of_variance: Vec<f64>,
    pub predictand_average: Vec<f64>,
}

impl Ancillary {
    pub fn zeros(num_predictands: usize) -> Self {
        Self {
            equation_constant: vec![0.0; num_predictands],
            multiple_correlation_coefficient: vec![0.0; num_predictands],
            standard_error_estimate: vec![0.0; num_predictands],
            reduction_of_variance: vec![0.0; num_predictands],
            predictand_average: vec![0.0; num_predictands],
        }
    }
}

/// A regression equation for one station group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub group_index: usize,
    pub stations: Vec<String>,
    /// Number of complete station-date cases used.
    pub sample_count: usize,
    /// Selected predictors in order of selection.
    pub predictors: Vec<PredictorId>,
    /// `[selected predictor][predictand]`.
    pub coefficients: Vec<Vec<f64>>,
    /// One constant per predictand.
    pub constant: Vec<f64>,
    pub ancillary: Ancillary,
}

impl Equation {
    /// An equation without predictors (skipped or not yet developed group).
    pub fn empty(
        group_index: usize,
        group: &StationGroup,
        sample_count: usize,
        num_predictands: usize,
    ) -> Self {
        Self {
            group_index,
            stations: group.stations.clone(),
            sample_count,
            predictors: Vec::new(),
            coefficients: Vec::new(),
            constant: vec![0.0; num_predictands],
            ancillary: Ancillary::zeros(num_predictands),
        }
    }

    /// Number of selected predictors.
    pub fn term_count(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }

    /// Coefficients laid out over *all* predictors: `[predictor][predictand]`,
    /// with zero rows for predictors that were not selected.
    pub fn dense_coefficients(&self, num_predictors: usize) -> Vec<Vec<f64>> {
        let num_predictands = self.constant.len();
        let mut out = vec![vec![0.0; num_predictands]; num_predictors];
        for (id, row) in self.predictors.iter().zip(&self.coefficients) {
            if let Some(slot) = out.get_mut(id.index) {
                slot.clone_from(row);
            }
        }
        out
    }
}

/// How a group's development ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupStatus {
    /// At least one predictor was selected.
    Developed,
    /// Enough cases, but no predictor passed screening.
    NoPredictorSelected,
    /// Too few complete cases; the group was skipped.
    InsufficientSample,
    /// A numerical failure stopped development; the equation holds whatever
    /// was accepted before the failure.
    Failed(crate::error::EngineError),
}

impl GroupStatus {
    pub fn label(&self) -> &'static str {
        match self {
            GroupStatus::Developed => "developed",
            GroupStatus::NoPredictorSelected => "no-predictor",
            GroupStatus::InsufficientSample => "skipped",
            GroupStatus::Failed(_) => "failed",
        }
    }
}

/// Equation plus outcome for one station group.
#[derive(Debug, Clone)]
pub struct GroupResult {
    pub equation: Equation,
    pub status: GroupStatus,
}

/// Counts of group outcomes for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub groups: usize,
    pub developed: usize,
    pub no_predictor: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[GroupResult]) -> Self {
        let mut summary = RunSummary {
            groups: results.len(),
            ..RunSummary::default()
        };
        for r in results {
            match r.status {
                GroupStatus::Developed => summary.developed += 1,
                GroupStatus::NoPredictorSelected => summary.no_predictor += 1,
                GroupStatus::InsufficientSample => summary.skipped += 1,
                GroupStatus::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus an optional parameter file).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub params: RegressionParams,
    /// Worker threads for group development (0 = rayon default).
    pub threads: usize,
    /// Optional station group list; singleton groups otherwise.
    pub groups_path: Option<PathBuf>,
    /// Number of equations to print in the terminal report.
    pub show_equations: usize,
    /// Number of predictors in the usage table.
    pub top_predictors: usize,
    pub export_json: Option<PathBuf>,
    pub export_summary: Option<PathBuf>,
}
