//! Batch result export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

const RESULTS_FILE_PREFIX: &str = "lifecycle_results_";

/// `lifecycle_results_<YYYYmmdd_HHMMSS>.json` for the given instant.
pub fn results_file_name(at: DateTime<Local>) -> String {
    format!("{RESULTS_FILE_PREFIX}{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write `value` as pretty JSON to `output_dir/file_name`, creating the
/// directory.
///
/// Returns the path of the written file.
pub fn export_json<T: Serialize>(value: &T, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let path = output_dir.join(file_name);
    write_json(&path, value)?;
    info!(path = %path.display(), "exported results");
    Ok(path)
}

/// Serialize `value` to pretty-printed JSON with trailing newline.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
