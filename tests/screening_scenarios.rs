//! End-to-end screening behaviour on small, fully specified data sets.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use mos_screen::app::pipeline::develop_on_pool;
use mos_screen::data::{SyntheticConfig, generate};
use mos_screen::domain::{
    GroupStatus, MISSING, PredictorKind, RegressionParams, StationGroup, Variable, VariableSet,
};
use mos_screen::error::EngineError;
use mos_screen::screening::{
    SelectorState, StepwiseSelector, StopReason, accumulate, develop_equations, normalize,
};

fn dates(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2019, 10, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n).map(|i| start + Duration::days(i as i64)).collect()
}

fn normals(seed: u64, n: usize, sd: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(0.0, sd).unwrap();
    (0..n).map(|_| dist.sample(&mut rng)).collect()
}

fn single_station(variables: Vec<Variable>, num_dates: usize) -> VariableSet {
    VariableSet::new(vec!["KDCA".into()], dates(num_dates), variables).unwrap()
}

fn scenario_params() -> RegressionParams {
    RegressionParams {
        cutoff: 0.01,
        max_select: 3,
        continuous_colinearity_threshold: 1e-4,
        ..RegressionParams::default()
    }
}

#[test]
fn exact_predictor_is_selected_alone() {
    let p1 = normals(1, 50, 3.0);
    let p2 = normals(2, 50, 1.0);
    let y: Vec<f64> = p1.iter().map(|x| 2.0 * x + 1.0).collect();
    let data = single_station(
        vec![
            Variable::predictor("p1", PredictorKind::Continuous, p1),
            Variable::predictor("p2", PredictorKind::Continuous, p2),
            Variable::predictand("y", y),
        ],
        50,
    );

    let run = develop_equations(&data, &data.singleton_groups(), &scenario_params()).unwrap();
    let result = &run.results[0];
    let eq = &result.equation;

    assert_eq!(result.status, GroupStatus::Developed);
    assert_eq!(eq.term_count(), 1);
    assert_eq!(eq.predictors[0].name, "p1");
    assert!((eq.coefficients[0][0] - 2.0).abs() < 1e-9);
    assert!((eq.constant[0] - 1.0).abs() < 1e-9);
    assert!((eq.ancillary.reduction_of_variance[0] - 1.0).abs() < 1e-9);
    assert!((eq.ancillary.multiple_correlation_coefficient[0] - 1.0).abs() < 1e-9);
    assert_eq!(eq.sample_count, 50);
}

#[test]
fn scaled_copy_of_a_selected_predictor_is_blocked() {
    let p1 = normals(1, 50, 3.0);
    let p2 = normals(2, 50, 1.0);
    let p3: Vec<f64> = p1.iter().map(|x| 0.5 * x).collect();
    let y: Vec<f64> = p1.iter().zip(&p2).map(|(a, b)| 2.0 * a + b + 1.0).collect();
    let data = single_station(
        vec![
            Variable::predictor("p1", PredictorKind::Continuous, p1),
            Variable::predictor("p2", PredictorKind::Continuous, p2),
            Variable::predictor("p3", PredictorKind::Continuous, p3),
            Variable::predictand("y", y),
        ],
        50,
    );
    // No cutoff: only the colinearity gate can keep p3 out.
    let params = RegressionParams {
        cutoff: 0.0,
        ..scenario_params()
    };

    let run = develop_equations(&data, &data.singleton_groups(), &params).unwrap();
    let eq = &run.results[0].equation;

    // p1 and p3 tie on the first step; the earlier one wins. p2 follows.
    let names: Vec<&str> = eq.predictors.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["p1", "p2"]);

    // After p1 enters, p3 has no unexplained variance left to offer.
    let xp = accumulate(&data, &[0]);
    let cov = normalize(&xp, data.predictor_kinds(), &params).unwrap();
    let predictor_names = data.variable_names()[..data.num_predictors()].to_vec();
    let mut selector =
        StepwiseSelector::new(0, cov, data.predictor_kinds(), &predictor_names, &params);
    assert_eq!(selector.step(), SelectorState::Selecting);
    assert_eq!(selector.order()[0], 0);

    let slot = selector.order().iter().position(|&i| i == 2).unwrap();
    let cov = selector.covariance();
    assert!(cov.p[(slot, slot)] <= params.continuous_colinearity_threshold * cov.sig[slot]);

    assert_eq!(selector.step(), SelectorState::Selecting);
    assert_eq!(selector.order()[1], 1);
    assert_eq!(selector.step(), SelectorState::Done(StopReason::NoCandidate));
}

#[test]
fn low_variance_point_binary_is_never_selected() {
    let n = 400;
    let mut flag = vec![0.0; n];
    flag[123] = 1.0;
    let weak = normals(3, n, 1.0);
    let noise = normals(4, n, 0.1);
    let y: Vec<f64> = (0..n).map(|i| 10.0 * flag[i] + 0.3 * weak[i] + noise[i]).collect();
    let variables = vec![
        Variable::predictor("flag", PredictorKind::PointBinary, flag),
        Variable::predictor("weak", PredictorKind::Continuous, weak),
        Variable::predictand("y", y),
    ];
    let data = single_station(variables, n);

    let params = RegressionParams::default();
    let run = develop_equations(&data, &data.singleton_groups(), &params).unwrap();
    let eq = &run.results[0].equation;
    assert!(eq.predictors.iter().all(|p| p.name != "flag"));
    assert_eq!(eq.predictors[0].name, "weak");

    // Without the variance screen the flag dominates.
    let unscreened = RegressionParams {
        point_binary_variance_threshold: 0.0,
        ..RegressionParams::default()
    };
    let run = develop_equations(&data, &data.singleton_groups(), &unscreened).unwrap();
    assert_eq!(run.results[0].equation.predictors[0].name, "flag");
}

#[test]
fn term_count_never_exceeds_max_select() {
    let data = generate(&SyntheticConfig {
        stations: 5,
        dates: 300,
        predictors: 12,
        predictands: 3,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let params = RegressionParams {
        max_select: 3,
        cutoff: 0.0,
        ..RegressionParams::default()
    };
    let run = develop_equations(&data, &data.singleton_groups(), &params).unwrap();

    for r in &run.results {
        assert!(r.equation.term_count() <= 3);
        assert_eq!(r.equation.coefficients.len(), r.equation.term_count());
        let mut idx: Vec<usize> = r.equation.predictors.iter().map(|p| p.index).collect();
        idx.sort_unstable();
        idx.dedup();
        assert_eq!(idx.len(), r.equation.term_count());
    }
    assert!(run.summary.developed > 0);
}

#[test]
fn empty_and_single_case_groups_are_skipped() {
    let num_dates = 10;
    // Station A: no complete case. Station B: one. Station C: all.
    let mut x = Vec::new();
    let mut y = Vec::new();
    for s in 0..3 {
        for d in 0..num_dates {
            let present = match s {
                0 => false,
                1 => d == 4,
                _ => true,
            };
            x.push(if present { d as f64 } else { MISSING });
            y.push(d as f64 * 1.5 + (d % 2) as f64);
        }
    }
    let data = VariableSet::new(
        vec!["A".into(), "B".into(), "C".into()],
        dates(num_dates),
        vec![
            Variable::predictor("x", PredictorKind::Continuous, x),
            Variable::predictand("y", y),
        ],
    )
    .unwrap();

    let run = develop_equations(&data, &data.singleton_groups(), &RegressionParams::default()).unwrap();
    for (r, n) in run.results.iter().zip([0, 1]) {
        assert_eq!(r.status, GroupStatus::InsufficientSample);
        assert_eq!(r.equation.sample_count, n);
        assert!(r.equation.is_empty());
    }
    assert_eq!(run.results[2].status, GroupStatus::Developed);
    assert_eq!(run.summary.skipped, 2);
}

#[test]
fn results_do_not_depend_on_thread_count() {
    let data = generate(&SyntheticConfig {
        stations: 16,
        dates: 150,
        predictors: 10,
        ..SyntheticConfig::default()
    })
    .unwrap();
    let mut groups = data.singleton_groups();
    groups.push(StationGroup::new(data.stations()[..8].to_vec()));
    let params = RegressionParams::default();

    let serial = develop_on_pool(&data, &groups, &params, 1).unwrap();
    let parallel = develop_on_pool(&data, &groups, &params, 4).unwrap();

    assert_eq!(serial.results.len(), groups.len());
    for (a, b) in serial.results.iter().zip(&parallel.results) {
        assert_eq!(a.equation, b.equation);
        assert_eq!(a.status, b.status);
    }
    assert_eq!(serial.summary, parallel.summary);
}

#[test]
fn numerical_failure_stays_inside_its_group() {
    let num_dates = 50;
    let mut x = Vec::new();
    let mut y = Vec::new();
    // Station 0: an ordinary linear relation.
    for d in 0..num_dates {
        x.push(d as f64);
        y.push(3.0 * d as f64 + (d % 4) as f64);
    }
    // Station 1: the predictor's variance is so small its reciprocal overflows.
    for d in 0..num_dates {
        let b = (d % 2) as f64;
        x.push(b * 1e-158);
        y.push(b);
    }
    let data = VariableSet::new(
        vec!["K001".into(), "K002".into()],
        dates(num_dates),
        vec![
            Variable::predictor("x", PredictorKind::Continuous, x),
            Variable::predictand("y", y),
        ],
    )
    .unwrap();

    let run = develop_equations(&data, &data.singleton_groups(), &RegressionParams::default()).unwrap();

    assert_eq!(run.results[0].status, GroupStatus::Developed);
    assert_eq!(run.results[0].equation.term_count(), 1);
    assert!(matches!(
        run.results[1].status,
        GroupStatus::Failed(EngineError::DegeneratePivot { group: 1, step: 1, .. })
    ));
    assert!(run.results[1].equation.is_empty());
    assert_eq!(run.summary.developed, 1);
    assert_eq!(run.summary.failed, 1);
}

#[test]
fn unknown_station_in_group_aborts_the_run() {
    let data = single_station(
        vec![
            Variable::predictor("x", PredictorKind::Continuous, vec![1.0, 2.0, 3.0]),
            Variable::predictand("y", vec![2.0, 4.0, 6.5]),
        ],
        3,
    );
    let groups = vec![StationGroup::singleton("KXXX")];
    let err = develop_equations(&data, &groups, &RegressionParams::default()).unwrap_err();
    assert!(matches!(err, EngineError::ShapeMismatch(_)));
}
