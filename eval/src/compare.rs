//! Row-level comparison of predicted against expected dates.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::eval_set::{EvalRow, NOT_FOUND, Phase};
use crate::outputs::OutputRow;

static LEADING_INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\s*").expect("leading index regex is valid"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Normalize a component name for matching between the CSV and outputs.
///
/// Trims, drops a leading index number (`"1     Foo"`), collapses
/// whitespace and lowercases.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let unindexed = LEADING_INDEX_RE.replace(trimmed, "");
    WHITESPACE_RE.replace_all(&unindexed, " ").to_lowercase()
}

/// Parse the leading `YYYY-MM-DD` of `value`.
///
/// Missing, `NOT_FOUND`, `Unknown` and malformed values are all `None`.
pub fn parse_iso_date(value: Option<&str>) -> Option<NaiveDate> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_FOUND) {
        return None;
    }
    let prefix: String = trimmed.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
}

/// Outcome of comparing one evaluation row with its predicted dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub component: String,
    pub phase: Phase,
    pub target_date: Option<NaiveDate>,
    pub predicted_date: Option<NaiveDate>,
    pub predicted_other_date: Option<NaiveDate>,
    pub exact_match: bool,
    pub exact_nf_match: bool,
    /// The other field holds the target date while the expected one does not.
    pub wrong_phase_match: bool,
    pub abs_days_delta: Option<i64>,
}

impl Comparison {
    pub fn exact_date_match(&self) -> bool {
        self.target_date.is_some() && self.target_date == self.predicted_date
    }
}

pub fn compare_row(row: &EvalRow, output: &OutputRow) -> Comparison {
    let (expected_raw, other_raw) = match row.phase {
        Phase::Active => (&output.active_date, &output.eos_date),
        Phase::EndOfLife => (&output.eos_date, &output.active_date),
    };
    let target = parse_iso_date(Some(row.target_date_raw.as_str()));
    let predicted = parse_iso_date(expected_raw.as_deref());
    let other = parse_iso_date(other_raw.as_deref());

    let exact_nf_match = row.expects_not_found() && predicted.is_none();
    let exact_date_match = target.is_some() && target == predicted;
    let wrong_phase_match = target.is_some() && target == other && predicted != target;
    let abs_days_delta = target
        .zip(predicted)
        .map(|(target, predicted)| (predicted - target).num_days().abs());

    Comparison {
        component: output.component.clone(),
        phase: row.phase,
        target_date: target,
        predicted_date: predicted,
        predicted_other_date: other,
        exact_match: exact_nf_match || exact_date_match,
        exact_nf_match,
        wrong_phase_match,
        abs_days_delta,
    }
}

/// Compare every row that has a matching output.
///
/// Returns the comparisons and the number of rows without a match.
pub fn compare_all(
    rows: &[EvalRow],
    outputs: &HashMap<String, OutputRow>,
) -> (Vec<Comparison>, usize) {
    let mut comparisons = Vec::new();
    let mut unmatched = 0;
    for row in rows {
        match outputs.get(&normalize_name(&row.full_name)) {
            Some(output) => comparisons.push(compare_row(row, output)),
            None => unmatched += 1,
        }
    }
    (comparisons, unmatched)
}
