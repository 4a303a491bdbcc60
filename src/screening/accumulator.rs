//! Sufficient statistics for a station group.
//!
//! For every station-date pair of the group where *all* `V` variables are present,
//! the pass adds one to the sample count, each value to its sum, and every pairwise
//! product to the sum-of-cross-products matrix. Only the upper triangle is
//! accumulated; it is mirrored once the group is complete.
//!
//! This is the dominant cost of the engine (`stations × dates × V²`), so the inner
//! loop walks one contiguous sample slice and one contiguous matrix column at a time.

use nalgebra::{DMatrix, DVector};

use crate::domain::{VariableSet, is_missing};

/// Sample count, sums and cross-product sums for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossProducts {
    pub sample_count: usize,
    /// `Σ x_v` per variable.
    pub sums: DVector<f64>,
    /// `Σ x_u x_v`, symmetric.
    pub sum_x: DMatrix<f64>,
}

impl CrossProducts {
    pub fn zeros(num_variables: usize) -> Self {
        Self {
            sample_count: 0,
            sums: DVector::zeros(num_variables),
            sum_x: DMatrix::zeros(num_variables, num_variables),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.sums.len()
    }
}

/// Accumulate cross products over the given station indices.
pub fn accumulate(data: &VariableSet, stations: &[usize]) -> CrossProducts {
    let v = data.num_variables();
    let mut xp = CrossProducts::zeros(v);

    for &station in stations {
        for date in 0..data.num_dates() {
            let row = data.sample(station, date);
            if row.iter().any(|&x| is_missing(x)) {
                continue;
            }

            xp.sample_count += 1;
            for (sum, &x) in xp.sums.iter_mut().zip(row) {
                *sum += x;
            }

            // Upper triangle, column by column: sum_x[(i, j)] for i <= j.
            for (j, &xj) in row.iter().enumerate() {
                let mut column = xp.sum_x.column_mut(j);
                for (i, &xi) in row[..=j].iter().enumerate() {
                    column[i] += xi * xj;
                }
            }
        }
    }

    fill_lower_triangle(&mut xp.sum_x);
    xp
}

fn fill_lower_triangle(m: &mut DMatrix<f64>) {
    let n = m.nrows();
    for j in 0..n {
        for i in (j + 1)..n {
            m[(i, j)] = m[(j, i)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MISSING, PredictorKind, Variable};
    use chrono::NaiveDate;

    fn set(x: Vec<f64>, y: Vec<f64>, stations: usize) -> VariableSet {
        let dates = x.len() / stations;
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        VariableSet::new(
            (0..stations).map(|s| format!("S{s}")).collect(),
            (0..dates).map(|d| start + chrono::Duration::days(d as i64)).collect(),
            vec![
                Variable::predictor("x", PredictorKind::Continuous, x),
                Variable::predictand("y", y),
            ],
        )
        .unwrap()
    }

    #[test]
    fn sums_and_cross_products_match_hand_computation() {
        let data = set(vec![1.0, 2.0, 3.0], vec![2.0, 4.0, 7.0], 1);
        let xp = accumulate(&data, &[0]);

        assert_eq!(xp.sample_count, 3);
        assert_eq!(xp.sums.as_slice(), &[6.0, 13.0]);
        assert_eq!(xp.sum_x[(0, 0)], 14.0);
        assert_eq!(xp.sum_x[(0, 1)], 2.0 + 8.0 + 21.0);
        assert_eq!(xp.sum_x[(1, 0)], xp.sum_x[(0, 1)]);
        assert_eq!(xp.sum_x[(1, 1)], 4.0 + 16.0 + 49.0);
    }

    #[test]
    fn any_missing_variable_drops_the_whole_pair() {
        let data = set(
            vec![1.0, MISSING, 3.0, 4.0],
            vec![2.0, 4.0, f64::NAN, 8.0],
            1,
        );
        let xp = accumulate(&data, &[0]);

        assert_eq!(xp.sample_count, 2);
        assert_eq!(xp.sums.as_slice(), &[5.0, 10.0]);
        assert_eq!(xp.sum_x[(0, 1)], 1.0 * 2.0 + 4.0 * 8.0);
    }

    #[test]
    fn empty_group_leaves_zero_statistics() {
        let data = set(vec![MISSING, MISSING], vec![1.0, 2.0], 1);
        let xp = accumulate(&data, &[0]);
        assert_eq!(xp, CrossProducts::zeros(2));
    }

    #[test]
    fn pooled_stations_add_up_and_stay_symmetric() {
        // Two stations, two dates each.
        let data = set(vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 0.0, 1.0, 0.0], 2);
        let pooled = accumulate(&data, &[0, 1]);
        let a = accumulate(&data, &[0]);
        let b = accumulate(&data, &[1]);

        assert_eq!(pooled.sample_count, a.sample_count + b.sample_count);
        assert_eq!(pooled.sum_x, &a.sum_x + &b.sum_x);
        assert_eq!(pooled.sum_x, pooled.sum_x.transpose());
    }
}
