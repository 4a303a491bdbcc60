//! Synthetic conformed data for demos and tests.
//!
//! Each station gets its own climatology (a mean offset per variable). Predictands
//! are linear combinations of a few randomly chosen continuous predictors plus
//! Gaussian noise, so a screening run has something real to find. Two binary
//! predictors are added:
//!
//! - a point binary flag thresholding the first continuous predictor
//! - a grid binary flag that fires so rarely it should be screened out

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{MISSING, PredictorKind, Variable, VariableSet};
use crate::error::EngineError;

/// Probability that the rare grid binary flag is set.
const RARE_FLAG_RATE: f64 = 0.001;

/// Shape of a synthetic data set.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub stations: usize,
    pub dates: usize,
    /// Continuous predictors (the two binary flags come on top).
    pub predictors: usize,
    pub predictands: usize,
    /// Fraction of cells replaced by the missing sentinel, per variable.
    pub missing_rate: f64,
    /// Predictors feeding each predictand.
    pub active_terms: usize,
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            stations: 12,
            dates: 400,
            predictors: 20,
            predictands: 2,
            missing_rate: 0.02,
            active_terms: 4,
            noise_sd: 1.0,
            seed: 7,
        }
    }
}

impl SyntheticConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.stations == 0 || self.dates == 0 {
            return Err(EngineError::Configuration(
                "synthetic data needs at least one station and one date".to_string(),
            ));
        }
        if self.predictors == 0 || self.predictands == 0 {
            return Err(EngineError::Configuration(
                "synthetic data needs at least one predictor and one predictand".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.missing_rate) {
            return Err(EngineError::Configuration(format!(
                "missing rate must be within [0, 1), got {}",
                self.missing_rate
            )));
        }
        if !(self.noise_sd.is_finite() && self.noise_sd >= 0.0) {
            return Err(EngineError::Configuration(format!(
                "noise sd must be finite and >= 0, got {}",
                self.noise_sd
            )));
        }
        Ok(())
    }
}

/// Generate a variable set: `predictors` continuous predictors, then the point and
/// grid binary flags, then `predictands` predictands.
pub fn generate(config: &SyntheticConfig) -> Result<VariableSet, EngineError> {
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let standard = Normal::new(0.0, 1.0)
        .map_err(|e| EngineError::Configuration(format!("noise distribution: {e}")))?;
    let noise = Normal::new(0.0, config.noise_sd)
        .map_err(|e| EngineError::Configuration(format!("noise distribution: {e}")))?;

    let cells = config.stations * config.dates;
    let p = config.predictors;

    // Station climatology offsets.
    let offsets: Vec<Vec<f64>> = (0..config.stations)
        .map(|_| (0..p).map(|_| rng.gen_range(-5.0..5.0)).collect())
        .collect();

    let mut continuous = vec![vec![0.0; cells]; p];
    for (s, offset) in offsets.iter().enumerate() {
        for d in 0..config.dates {
            let cell = s * config.dates + d;
            // A shared seasonal signal makes neighbouring predictors correlated.
            let season = (d as f64 * std::f64::consts::TAU / 365.0).sin();
            for (i, column) in continuous.iter_mut().enumerate() {
                let weight = if i % 2 == 0 { 1.0 } else { 0.5 };
                column[cell] = offset[i] + weight * season + standard.sample(&mut rng);
            }
        }
    }

    let point_flag: Vec<f64> = continuous[0]
        .iter()
        .enumerate()
        .map(|(cell, &x)| {
            let s = cell / config.dates;
            if x > offsets[s][0] { 1.0 } else { 0.0 }
        })
        .collect();
    let rare_flag: Vec<f64> = (0..cells)
        .map(|_| if rng.gen_bool(RARE_FLAG_RATE) { 1.0 } else { 0.0 })
        .collect();

    let mut predictands = Vec::with_capacity(config.predictands);
    for _ in 0..config.predictands {
        let terms = config.active_terms.clamp(1, p);
        let chosen: Vec<usize> = (0..p).choose_multiple(&mut rng, terms);
        let coefficients: Vec<f64> = chosen.iter().map(|_| rng.gen_range(-3.0..3.0)).collect();
        let intercept = rng.gen_range(-10.0..10.0);
        let flag_effect = rng.gen_range(0.5..2.0);

        let values: Vec<f64> = (0..cells)
            .map(|cell| {
                let signal: f64 = chosen
                    .iter()
                    .zip(&coefficients)
                    .map(|(&i, &c)| c * continuous[i][cell])
                    .sum();
                intercept + signal + flag_effect * point_flag[cell] + noise.sample(&mut rng)
            })
            .collect();
        predictands.push(values);
    }

    let mut variables = Vec::with_capacity(p + 2 + config.predictands);
    for (i, values) in continuous.into_iter().enumerate() {
        variables.push(Variable::predictor(
            format!("pred{:02}", i + 1),
            PredictorKind::Continuous,
            values,
        ));
    }
    variables.push(Variable::predictor("flag_point", PredictorKind::PointBinary, point_flag));
    variables.push(Variable::predictor("flag_grid", PredictorKind::GridBinary, rare_flag));
    for (m, values) in predictands.into_iter().enumerate() {
        variables.push(Variable::predictand(format!("tand{:02}", m + 1), values));
    }

    if config.missing_rate > 0.0 {
        for var in &mut variables {
            for value in &mut var.values {
                if rng.gen_bool(config.missing_rate) {
                    *value = MISSING;
                }
            }
        }
    }

    VariableSet::new(station_ids(config.stations), date_axis(config.dates), variables)
}

fn station_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("K{:03}", i + 1)).collect()
}

/// Daily 12 UTC cycle starting 2020-04-01.
fn date_axis(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2020, 4, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap_or_default();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}
