//! Plain-text evaluation report.

use std::fmt::Write as _;
use std::path::Path;

use crate::metrics::Metrics;

/// Render a two-column ASCII table.
///
/// The first column is left-aligned and the second right-aligned.
pub fn format_table(rows: &[(String, String)], headers: (&str, &str)) -> String {
    let width = |s: &str| s.chars().count();
    let col1 = rows
        .iter()
        .map(|(key, _)| width(key))
        .chain([width(headers.0)])
        .max()
        .unwrap_or_default();
    let col2 = rows
        .iter()
        .map(|(_, value)| width(value))
        .chain([width(headers.1)])
        .max()
        .unwrap_or_default();

    let sep = format!("+-{}-+-{}-+", "-".repeat(col1), "-".repeat(col2));
    let line = |key: &str, value: &str| format!("| {key:<col1$} | {value:>col2$} |");

    let mut lines = vec![sep.clone(), line(headers.0, headers.1), sep.clone()];
    lines.extend(rows.iter().map(|(key, value)| line(key, value)));
    lines.push(sep);
    lines.join("\n")
}

pub fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

fn row(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn share(part: usize, whole: usize) -> String {
    format!("{part} ({:.1}%)", pct(part, whole))
}

pub fn render_report(
    eval_set: &Path,
    outputs: &Path,
    outputs_sha256: &str,
    metrics: &Metrics,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Evaluation run");
    let _ = writeln!(out, "==============");
    let _ = writeln!(out, "Evaluation CSV: {}", eval_set.display());
    let _ = writeln!(out, "Outputs JSON  : {}", outputs.display());
    let _ = writeln!(out, "Outputs SHA-256: {outputs_sha256}");
    let _ = writeln!(out, "Rows in CSV: {}", metrics.csv_rows);

    let meta_rows = [
        row("Components matched", metrics.matched),
        row("Components unmatched", metrics.unmatched),
        row("Total eval rows scanned", metrics.csv_rows),
    ];
    let _ = writeln!(out, "\n{}", format_table(&meta_rows, ("Metric", "Count")));

    let exact_rows = [
        row("Exact matches (overall)", share(metrics.exact_matches, metrics.matched)),
        row("  • NOT_FOUND aligned", share(metrics.exact_nf_matches, metrics.matched)),
        row("  • Exact date matches", share(metrics.exact_date_matches, metrics.matched)),
        row("Wrong-phase matches", share(metrics.wrong_phase_matches, metrics.matched)),
        row("Target with date", metrics.target_has_date),
        row(
            "Predicted missing when target has date",
            metrics.predicted_missing_when_target_present,
        ),
    ];
    let _ = writeln!(out, "\n{}", format_table(&exact_rows, ("Exact/Phase Metrics", "Value")));

    if metrics.pairs_with_both_dates == 0 {
        let _ = writeln!(out, "\nNo date pairs available for partial-match delta statistics.");
        return out;
    }

    let delta_rows = [row("Pairs with both dates", metrics.pairs_with_both_dates)];
    let _ = writeln!(out, "\n{}", format_table(&delta_rows, ("Partial-Match (Delta)", "Value")));

    let bucket_rows: Vec<_> = metrics
        .buckets()
        .map(|(bucket, count)| row(bucket.label(), count))
        .collect();
    let _ = writeln!(out, "\n{}", format_table(&bucket_rows, ("Delta Bucket", "Count")));
    out
}
