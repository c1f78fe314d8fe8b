//! Batch results loading.
//!
//! Reads the JSON exported by `research run` and indexes predicted dates by
//! normalized component name.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::compare::normalize_name;

/// Predicted dates for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputRow {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub active_date: Option<String>,
    #[serde(default)]
    pub eos_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputsFile {
    #[serde(default)]
    results: Vec<OutputRow>,
}

/// Resolve the outputs file argument.
///
/// Absolute paths and relative paths that exist are used as given; any
/// other name is looked up in `outputs_dir`.
pub fn resolve_outputs_path(arg: &Path, outputs_dir: &Path) -> PathBuf {
    if arg.is_absolute() || arg.exists() {
        arg.to_path_buf()
    } else {
        outputs_dir.join(arg)
    }
}

/// Load results keyed by normalized component name.
///
/// Later entries for the same name replace earlier ones.
pub fn load_outputs(path: &Path) -> Result<HashMap<String, OutputRow>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let file: OutputsFile =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    let mut outputs = HashMap::with_capacity(file.results.len());
    for row in file.results {
        outputs.insert(normalize_name(&row.component), row);
    }
    debug!(path = %path.display(), components = outputs.len(), "outputs loaded");
    Ok(outputs)
}

/// Hex SHA-256 of a file, reported alongside metrics for reproducibility.
pub fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"{
        "batch_metadata": {"total_components": 3, "successful": 2, "failed": 1},
        "results": [
            {
                "component": "Redis  7.0",
                "status": "completed",
                "active_date": "2022-04-27",
                "eos_date": null
            },
            {
                "component": "nginx 1.24",
                "status": "completed",
                "active_date": "Unknown",
                "eos_date": "Unknown",
                "error": "error:request failed"
            },
            {"component": "Kafka 3.5", "status": "failed", "error": "session panicked"}
        ]
    }"#;

    #[test]
    fn indexes_results_by_normalized_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.json");
        fs::write(&path, BATCH).expect("write");

        let outputs = load_outputs(&path).expect("load");

        assert_eq!(outputs.len(), 3);
        let redis = &outputs["redis 7.0"];
        assert_eq!(redis.active_date.as_deref(), Some("2022-04-27"));
        assert_eq!(redis.eos_date, None);
        assert_eq!(outputs["kafka 3.5"].active_date, None);
    }

    #[test]
    fn relative_names_resolve_into_outputs_dir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let resolved = resolve_outputs_path(Path::new("lifecycle_results_x.json"), temp.path());
        assert_eq!(resolved, temp.path().join("lifecycle_results_x.json"));

        let absolute = temp.path().join("abs.json");
        assert_eq!(resolve_outputs_path(&absolute, Path::new("outputs")), absolute);
    }

    #[test]
    fn digest_is_stable_hex() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.json");
        fs::write(&path, "abc").expect("write");
        assert_eq!(
            file_sha256(&path).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
