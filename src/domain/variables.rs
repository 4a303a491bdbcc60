//! Conformed input data.
//!
//! The upstream conformer hands over one dense `[station, date]` array per variable.
//! `VariableSet` validates the arrays against the station/date axes and re-packs
//! them sample-major (`[station][date][variable]`), so that the cross-product pass
//! reads every variable of a station-date pair from one contiguous slice.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::domain::{PredictorKind, StationGroup};
use crate::error::EngineError;

/// Missing-value sentinel used by the conformed arrays.
pub const MISSING: f64 = 9999.0;

/// Whether a value counts as missing.
///
/// Non-finite values are treated like the sentinel so they cannot leak into sums.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value == MISSING || !value.is_finite()
}

/// Role of a variable in the regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableRole {
    Predictor(PredictorKind),
    Predictand,
}

/// One conformed variable.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub role: VariableRole,
    /// Row-major `[station, date]` values.
    pub values: Vec<f64>,
}

impl Variable {
    pub fn predictor(name: impl Into<String>, kind: PredictorKind, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Predictor(kind),
            values,
        }
    }

    pub fn predictand(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            role: VariableRole::Predictand,
            values,
        }
    }
}

/// All predictors followed by all predictands on a common station/date axis.
#[derive(Debug, Clone)]
pub struct VariableSet {
    stations: Vec<String>,
    station_index: HashMap<String, usize>,
    dates: Vec<NaiveDateTime>,
    names: Vec<String>,
    kinds: Vec<PredictorKind>,
    num_predictands: usize,
    samples: Vec<f64>,
}

impl VariableSet {
    /// Build a variable set from conformed arrays.
    ///
    /// Predictors keep their relative order and are moved in front of the
    /// predictands. Every array must hold `stations.len() * dates.len()` values.
    pub fn new(
        stations: Vec<String>,
        dates: Vec<NaiveDateTime>,
        variables: Vec<Variable>,
    ) -> Result<Self, EngineError> {
        let num_stations = stations.len();
        let num_dates = dates.len();
        if num_stations == 0 || num_dates == 0 {
            return Err(EngineError::ShapeMismatch(format!(
                "empty axis: {num_stations} stations x {num_dates} dates"
            )));
        }

        let mut station_index = HashMap::with_capacity(num_stations);
        for (i, s) in stations.iter().enumerate() {
            if station_index.insert(s.clone(), i).is_some() {
                return Err(EngineError::ShapeMismatch(format!("duplicate station '{s}'")));
            }
        }

        let cells = num_stations * num_dates;
        for v in &variables {
            if v.values.len() != cells {
                return Err(EngineError::ShapeMismatch(format!(
                    "variable '{}' has {} values, expected {num_stations} stations x {num_dates} dates = {cells}",
                    v.name,
                    v.values.len()
                )));
            }
        }

        let (predictors, predictands): (Vec<Variable>, Vec<Variable>) = variables
            .into_iter()
            .partition(|v| matches!(v.role, VariableRole::Predictor(_)));
        if predictors.is_empty() {
            return Err(EngineError::Configuration("no predictors supplied".to_string()));
        }
        if predictands.is_empty() {
            return Err(EngineError::Configuration("no predictands supplied".to_string()));
        }

        let kinds: Vec<PredictorKind> = predictors
            .iter()
            .map(|v| match v.role {
                VariableRole::Predictor(kind) => kind,
                VariableRole::Predictand => PredictorKind::Continuous,
            })
            .collect();
        let num_predictands = predictands.len();
        let ordered: Vec<Variable> = predictors.into_iter().chain(predictands).collect();
        let names: Vec<String> = ordered.iter().map(|v| v.name.clone()).collect();

        // Re-pack sample-major.
        let num_vars = ordered.len();
        let mut samples = vec![MISSING; cells * num_vars];
        for (vi, var) in ordered.iter().enumerate() {
            for (cell, &value) in var.values.iter().enumerate() {
                samples[cell * num_vars + vi] = value;
            }
        }

        Ok(Self {
            stations,
            station_index,
            dates,
            names,
            kinds,
            num_predictands,
            samples,
        })
    }

    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn num_stations(&self) -> usize {
        self.stations.len()
    }

    pub fn num_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn num_predictors(&self) -> usize {
        self.kinds.len()
    }

    pub fn num_predictands(&self) -> usize {
        self.num_predictands
    }

    /// `V`: predictors plus predictands.
    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    pub fn predictor_kinds(&self) -> &[PredictorKind] {
        &self.kinds
    }

    /// Names of all variables, predictors first.
    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    pub fn predictor_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn predictand_name(&self, index: usize) -> &str {
        &self.names[self.num_predictors() + index]
    }

    pub fn station_index(&self, station: &str) -> Option<usize> {
        self.station_index.get(station).copied()
    }

    /// All `V` values for one station-date pair.
    #[inline]
    pub fn sample(&self, station: usize, date: usize) -> &[f64] {
        let v = self.num_variables();
        let start = (station * self.num_dates() + date) * v;
        &self.samples[start..start + v]
    }

    /// Map every group's stations onto station indices.
    pub fn resolve_groups(&self, groups: &[StationGroup]) -> Result<Vec<Vec<usize>>, EngineError> {
        groups
            .iter()
            .enumerate()
            .map(|(g, group)| {
                if group.stations.is_empty() {
                    return Err(EngineError::ShapeMismatch(format!("group {g} has no stations")));
                }
                group
                    .stations
                    .iter()
                    .map(|s| {
                        self.station_index(s).ok_or_else(|| {
                            EngineError::ShapeMismatch(format!(
                                "group {g} references unknown station '{s}'"
                            ))
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// One singleton group per station, in axis order.
    pub fn singleton_groups(&self) -> Vec<StationGroup> {
        self.stations.iter().map(StationGroup::singleton).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn predictors_are_moved_before_predictands() {
        let set = VariableSet::new(
            vec!["A".into(), "B".into()],
            dates(2),
            vec![
                Variable::predictand("y", vec![10.0, 11.0, 12.0, 13.0]),
                Variable::predictor("x1", PredictorKind::Continuous, vec![1.0, 2.0, 3.0, 4.0]),
                Variable::predictor("x2", PredictorKind::PointBinary, vec![0.0, 1.0, 0.0, 1.0]),
            ],
        )
        .unwrap();

        assert_eq!(set.variable_names(), &["x1", "x2", "y"]);
        assert_eq!(set.predictor_kinds(), &[PredictorKind::Continuous, PredictorKind::PointBinary]);
        // station B, date 0 is cell 2.
        assert_eq!(set.sample(1, 0), &[3.0, 0.0, 12.0]);
        assert_eq!(set.predictand_name(0), "y");
    }

    #[test]
    fn misaligned_arrays_are_rejected() {
        let err = VariableSet::new(
            vec!["A".into()],
            dates(3),
            vec![
                Variable::predictor("x", PredictorKind::Continuous, vec![1.0, 2.0, 3.0]),
                Variable::predictand("y", vec![1.0, 2.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch(_)));
    }

    #[test]
    fn unknown_group_station_is_a_shape_error() {
        let set = VariableSet::new(
            vec!["A".into()],
            dates(1),
            vec![
                Variable::predictor("x", PredictorKind::Continuous, vec![1.0]),
                Variable::predictand("y", vec![1.0]),
            ],
        )
        .unwrap();
        let groups = vec![StationGroup::new(vec!["A".into(), "Z".into()])];
        assert!(matches!(set.resolve_groups(&groups), Err(EngineError::ShapeMismatch(_))));
        assert_eq!(set.resolve_groups(&set.singleton_groups()).unwrap(), vec![vec![0]]);
    }

    #[test]
    fn sentinel_and_non_finite_values_are_missing() {
        assert!(is_missing(MISSING));
        assert!(is_missing(f64::NAN));
        assert!(!is_missing(9998.9));
    }
}
