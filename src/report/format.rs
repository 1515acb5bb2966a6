//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline stays free of presentation concerns
//! and output changes stay localized.

use crate::app::pipeline::{BatchReport, IndexRefresh, ProgramOutcome};
use crate::bulletin::UpdateOutcome;

/// Summary of an index-refresh run.
pub fn format_update_summary(refresh: &IndexRefresh) -> String {
    let mut out = String::new();

    out.push_str("=== rwages - CPI index refresh ===\n");
    match &refresh.outcome {
        UpdateOutcome::Committed { previous, bulletin } => {
            out.push_str(&format!("Bulletin: {bulletin} (new, cursor advanced from {previous})\n"));
        }
        UpdateOutcome::Stale { bulletin, reason } => {
            out.push_str(&format!("Bulletin: {bulletin} (no newer bulletin: {reason})\n"));
        }
    }

    let series = &refresh.series;
    let synthetic = series.synthetic_len();
    let first = series.first().map(|p| p.date.format("%Y-%m").to_string()).unwrap_or_default();
    let as_of = series.as_of().map(|d| d.format("%Y-%m").to_string()).unwrap_or_default();
    out.push_str(&format!(
        "Index: {first} .. {as_of} | months={} | observed={} | estimated={}\n",
        series.len(),
        series.len() - synthetic,
        synthetic,
    ));
    if let Some(from) = series.synthetic_from() {
        out.push_str(&format!(
            "Estimated from {} (last observed month-over-month ratio carried forward)\n",
            from.format("%Y-%m")
        ));
    }
    out.push_str(&format!("Wrote: {}\n", refresh.output.display()));

    out
}

/// One status line for a program.
pub fn format_program_line(outcome: &ProgramOutcome) -> String {
    match &outcome.result {
        Ok(s) => format!(
            "{:<12} ok     {}..{} n={:<4} nominal={:.2} adjusted={}",
            outcome.program,
            s.first.format("%Y-%m"),
            s.last.format("%Y-%m"),
            s.months,
            s.last_nominal,
            s.last_adjusted.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string()),
        ),
        Err(e) => format!("{:<12} FAILED {e}", outcome.program),
    }
}

/// Per-program lines plus the final tally.
pub fn format_batch_summary(report: &BatchReport) -> String {
    let mut out = String::new();

    out.push_str("=== rwages - real wage recompute ===\n");
    out.push_str(&format!("Pivot: {}\n", report.pivot.format("%Y-%m")));
    if let Some(as_of) = report.index_as_of {
        out.push_str(&format!("Index as-of: {}\n", as_of.format("%Y-%m")));
    }
    out.push('\n');

    for outcome in &report.outcomes {
        out.push_str(&format_program_line(outcome));
        out.push('\n');
    }

    out.push_str(&format!("\n{} ok / {} failed\n", report.succeeded(), report.failed()));
    out
}
