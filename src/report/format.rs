//! Formatted terminal output for a screening run.
//!
//! Formatting lives here so the engine stays free of presentation details.

use crate::domain::{GroupStatus, PredictorKind, RegressionParams, VariableSet};
use crate::screening::ScreeningRun;

/// How often one predictor was selected across the run's equations.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorUsage {
    pub index: usize,
    pub name: String,
    pub kind: PredictorKind,
    /// Equations that selected this predictor.
    pub selected: usize,
    /// Equations that selected it first.
    pub selected_first: usize,
    /// Mean step (1-based) at which it entered, over the equations that selected it.
    pub mean_step: f64,
}

/// Count predictor selections over every equation.
///
/// Sorted by selection count (descending), then predictor order.
pub fn predictor_usage(data: &VariableSet, run: &ScreeningRun) -> Vec<PredictorUsage> {
    let mut usage: Vec<PredictorUsage> = (0..data.num_predictors())
        .map(|index| PredictorUsage {
            index,
            name: data.predictor_name(index).to_string(),
            kind: data.predictor_kinds()[index],
            selected: 0,
            selected_first: 0,
            mean_step: 0.0,
        })
        .collect();

    for eq in run.equations() {
        for (step, id) in eq.predictors.iter().enumerate() {
            let Some(u) = usage.get_mut(id.index) else {
                continue;
            };
            u.selected += 1;
            if step == 0 {
                u.selected_first += 1;
            }
            u.mean_step += (step + 1) as f64;
        }
    }
    for u in &mut usage {
        if u.selected > 0 {
            u.mean_step /= u.selected as f64;
        }
    }

    usage.sort_by(|a, b| b.selected.cmp(&a.selected).then(a.index.cmp(&b.index)));
    usage
}

/// Format the run header and outcome counts.
pub fn format_run_summary(
    data: &VariableSet,
    run: &ScreeningRun,
    params: &RegressionParams,
    source: &str,
) -> String {
    let mut out = String::new();

    out.push_str("=== mos-screen - screening regression ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Data: {} stations x {} dates",
        data.num_stations(),
        data.num_dates()
    ));
    if let (Some(first), Some(last)) = (data.dates().first(), data.dates().last()) {
        out.push_str(&format!(
            " ({} .. {})",
            first.format("%Y%m%d%H"),
            last.format("%Y%m%d%H")
        ));
    }
    out.push('\n');
    let binary = data.predictor_kinds().iter().filter(|k| k.is_binary()).count();
    out.push_str(&format!(
        "Variables: {} predictors ({binary} binary), {} predictands\n",
        data.num_predictors(),
        data.num_predictands()
    ));
    out.push_str(&format!(
        "Params: max_select={} cutoff={} min_cases={} coln=[{}, {}, {}]\n",
        params.max_select,
        params.cutoff,
        params.min_cases_required,
        params.continuous_colinearity_threshold,
        params.point_binary_colinearity_threshold,
        params.grid_binary_colinearity_threshold,
    ));

    let s = &run.summary;
    out.push_str(&format!(
        "Groups: {} | developed={} no-predictor={} skipped={} failed={}\n",
        s.groups, s.developed, s.no_predictor, s.skipped, s.failed
    ));
    for r in &run.results {
        if let GroupStatus::Failed(err) = &r.status {
            out.push_str(&format!("  ! {err}\n"));
        }
    }
    out.push('\n');

    out
}

/// Format up to `limit` equations with their per-predictand statistics.
pub fn format_equations(data: &VariableSet, run: &ScreeningRun, limit: usize) -> String {
    let mut out = String::new();

    for r in run.results.iter().take(limit) {
        let eq = &r.equation;
        out.push_str(&format!(
            "Group {} [{}] {} | cases={} terms={}\n",
            eq.group_index,
            eq.stations.join(" "),
            r.status.label(),
            eq.sample_count,
            eq.term_count(),
        ));
        if eq.is_empty() {
            out.push('\n');
            continue;
        }

        out.push_str(&format!("  {:<20}", "predictor"));
        for m in 0..data.num_predictands() {
            out.push_str(&format!(" {:>12}", truncate(data.predictand_name(m), 12)));
        }
        out.push('\n');

        for (id, row) in eq.predictors.iter().zip(&eq.coefficients) {
            out.push_str(&format!("  {:<20}", truncate(&id.name, 20)));
            for c in row {
                out.push_str(&format!(" {c:>12.5}"));
            }
            out.push('\n');
        }

        let anc = &eq.ancillary;
        let rows: [(&str, &[f64]); 5] = [
            ("constant", &anc.equation_constant),
            ("RoV", &anc.reduction_of_variance),
            ("MCC", &anc.multiple_correlation_coefficient),
            ("SEE", &anc.standard_error_estimate),
            ("predictand avg", &anc.predictand_average),
        ];
        for (label, values) in rows {
            out.push_str(&format!("  {label:<20}"));
            for v in values {
                out.push_str(&format!(" {v:>12.5}"));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    if run.results.len() > limit {
        out.push_str(&format!("({} more groups not shown)\n", run.results.len() - limit));
    }

    out
}

/// Format the `top` most used predictors.
pub fn format_predictor_usage(usage: &[PredictorUsage], top: usize) -> String {
    let mut out = String::new();
    out.push_str("Predictor usage:\n");
    out.push_str(&format!(
        "{:<20} {:<12} {:>8} {:>8} {:>10}\n",
        "predictor", "kind", "selected", "first", "mean step"
    ));
    out.push_str(&format!("{:-<20} {:-<12} {:-<8} {:-<8} {:-<10}\n", "", "", "", "", ""));
    for u in usage.iter().filter(|u| u.selected > 0).take(top) {
        out.push_str(&format!(
            "{:<20} {:<12} {:>8} {:>8} {:>10.2}\n",
            truncate(&u.name, 20),
            u.kind.display_name(),
            u.selected,
            u.selected_first,
            u.mean_step
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut t: String = s.chars().take(max.saturating_sub(1)).collect();
    t.push('~');
    t
}
