//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::compare::compare_all;
use crate::eval_set::load_eval_rows;
use crate::metrics::{Metrics, aggregate};
use crate::outputs::{file_sha256, load_outputs, resolve_outputs_path};
use crate::report::render_report;

/// Score one batch results file against the evaluation set and print the report.
pub fn evaluate(output_file: &Path, eval_set: &Path, outputs_dir: &Path) -> Result<Metrics> {
    let outputs_path = resolve_outputs_path(output_file, outputs_dir);
    if !outputs_path.exists() {
        bail!("outputs file not found at {}", outputs_path.display());
    }

    let outputs = load_outputs(&outputs_path).context("load outputs")?;
    let rows = load_eval_rows(eval_set).context("load evaluation set")?;
    debug!(rows = rows.len(), outputs = outputs.len(), "inputs loaded");

    let (comparisons, unmatched) = compare_all(&rows, &outputs);
    for miss in comparisons.iter().filter(|c| !c.exact_match) {
        debug!(
            component = %miss.component,
            phase = miss.phase.as_str(),
            target = ?miss.target_date,
            predicted = ?miss.predicted_date,
            other = ?miss.predicted_other_date,
            wrong_phase = miss.wrong_phase_match,
            "miss"
        );
    }
    let metrics = aggregate(&comparisons, rows.len(), unmatched);
    info!(
        matched = metrics.matched,
        unmatched = metrics.unmatched,
        exact = metrics.exact_matches,
        "evaluation complete"
    );

    let digest = file_sha256(&outputs_path)?;
    println!("{}", render_report(eval_set, &outputs_path, &digest, &metrics));
    Ok(metrics)
}
