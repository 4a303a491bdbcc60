//! Turn a finished selector run into an [`Equation`].

use crate::domain::{Ancillary, Equation, PredictorId, StationGroup, VariableSet};
use crate::screening::selector::SelectionOutcome;

/// Build the equation for one group.
///
/// Row `s < accepted` of the swept matrix holds, in its predictand columns, the
/// coefficients of the predictor that entered at step `s + 1`.
pub fn assemble(
    group_index: usize,
    group: &StationGroup,
    data: &VariableSet,
    outcome: &SelectionOutcome,
) -> Equation {
    let num_predictors = outcome.num_predictors;
    let num_predictands = data.num_predictands();
    let mut equation = Equation::empty(group_index, group, outcome.sample_count, num_predictands);

    for slot in 0..outcome.accepted {
        let index = outcome.order[slot];
        equation.predictors.push(PredictorId {
            index,
            name: data.predictor_name(index).to_string(),
        });
        let row = outcome.p.row(slot);
        equation
            .coefficients
            .push((0..num_predictands).map(|m| row[num_predictors + m]).collect());
    }

    let predictand_average: Vec<f64> = (0..num_predictands)
        .map(|m| outcome.avg[num_predictors + m])
        .collect();

    if outcome.accepted == 0 {
        equation.ancillary = Ancillary {
            predictand_average,
            ..Ancillary::zeros(num_predictands)
        };
        return equation;
    }

    let stats = &outcome.stats;
    equation.constant = stats.constant.iter().copied().collect();
    equation.ancillary = Ancillary {
        equation_constant: equation.constant.clone(),
        multiple_correlation_coefficient: stats.multiple_correlation.iter().copied().collect(),
        standard_error_estimate: stats.standard_error.iter().copied().collect(),
        reduction_of_variance: stats.reduction_of_variance.iter().copied().collect(),
        predictand_average,
    };
    equation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PredictorKind, RegressionParams, Variable};
    use crate::screening::{accumulator::accumulate, normalizer::normalize, selector::StepwiseSelector};
    use chrono::NaiveDate;

    fn dataset(x1: Vec<f64>, x2: Vec<f64>, y: Vec<f64>) -> VariableSet {
        let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let dates = (0..y.len()).map(|d| start + chrono::Duration::hours(12 * d as i64)).collect();
        VariableSet::new(
            vec!["KDCA".into()],
            dates,
            vec![
                Variable::predictor("x1", PredictorKind::Continuous, x1),
                Variable::predictor("x2", PredictorKind::Continuous, x2),
                Variable::predictand("y", y),
            ],
        )
        .unwrap()
    }

    fn develop(data: &VariableSet, params: &RegressionParams) -> Equation {
        let xp = accumulate(data, &[0]);
        let cov = normalize(&xp, data.predictor_kinds(), params).unwrap();
        let names = data.variable_names()[..data.num_predictors()].to_vec();
        let outcome = StepwiseSelector::new(0, cov, data.predictor_kinds(), &names, params).run();
        assemble(0, &StationGroup::singleton("KDCA"), data, &outcome)
    }

    #[test]
    fn exact_linear_relation_is_recovered() {
        let n = 40;
        let x1: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin() * 3.0).collect();
        let x2: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
        let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 1.5 + 2.0 * a - 0.5 * b).collect();
        let data = dataset(x1, x2, y);
        let eq = develop(&data, &RegressionParams::default());

        assert_eq!(eq.term_count(), 2);
        let dense = eq.dense_coefficients(2);
        assert!((dense[0][0] - 2.0).abs() < 1e-9);
        assert!((dense[1][0] + 0.5).abs() < 1e-9);
        assert!((eq.constant[0] - 1.5).abs() < 1e-9);
        assert_eq!(eq.ancillary.equation_constant, eq.constant);
        assert!(eq.ancillary.reduction_of_variance[0] > 0.999_999);
        assert!(eq.ancillary.standard_error_estimate[0] < 1e-6);
        assert_eq!(eq.sample_count, n);
    }

    #[test]
    fn no_selection_keeps_only_the_predictand_average() {
        // y is unrelated to both predictors, so the cutoff rejects them.
        let x1 = vec![1.0, -1.0, 1.0, -1.0];
        let x2 = vec![1.0, 1.0, -1.0, -1.0];
        let y = vec![3.0, 5.0, 5.0, 3.0];
        let data = dataset(x1, x2, y);
        let eq = develop(&data, &RegressionParams::default());

        assert!(eq.is_empty());
        assert_eq!(eq.constant, vec![0.0]);
        assert_eq!(eq.ancillary.predictand_average, vec![4.0]);
        assert_eq!(eq.ancillary.reduction_of_variance, vec![0.0]);
    }
}
