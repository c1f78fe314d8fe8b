//! Evaluation set parsing.
//!
//! The evaluation set is a CSV with one expected date per row: `full_name`,
//! `type` (`ACTIVE_DATE` or `END_OF_LIFE_DATE`), `target_date` (ISO date or
//! `NOT_FOUND`). Other columns are ignored.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

pub const NOT_FOUND: &str = "NOT_FOUND";

/// Lifecycle phase an evaluation row targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    EndOfLife,
}

impl Phase {
    /// `ACTIVE_DATE` is the active phase; anything else is end of life.
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE_DATE" => Phase::Active,
            "END_OF_LIFE_DATE" => Phase::EndOfLife,
            other => {
                warn!(phase = other, "unknown phase type, treating as END_OF_LIFE_DATE");
                Phase::EndOfLife
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Active => "ACTIVE_DATE",
            Phase::EndOfLife => "END_OF_LIFE_DATE",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    full_name: String,
    #[serde(default, rename = "type")]
    phase: String,
    #[serde(default)]
    target_date: String,
}

/// One expected lifecycle date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRow {
    pub full_name: String,
    pub phase: Phase,
    /// `YYYY-MM-DD` or `NOT_FOUND`, as written in the CSV.
    pub target_date_raw: String,
}

impl EvalRow {
    pub fn expects_not_found(&self) -> bool {
        self.target_date_raw.trim().eq_ignore_ascii_case(NOT_FOUND)
    }
}

impl From<RawRow> for EvalRow {
    fn from(raw: RawRow) -> Self {
        Self {
            full_name: raw.full_name.trim().to_string(),
            phase: Phase::parse(&raw.phase),
            target_date_raw: raw.target_date.trim().to_string(),
        }
    }
}

/// Load every row of the evaluation CSV, in file order.
pub fn load_eval_rows(path: &Path) -> Result<Vec<EvalRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RawRow>().enumerate() {
        let raw = record.with_context(|| format!("parse {} row {}", path.display(), index + 1))?;
        rows.push(EvalRow::from(raw));
    }
    Ok(rows)
}
