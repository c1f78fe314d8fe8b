//! Component list loading for batch runs.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum ComponentsJson {
    List(Vec<String>),
    Object { components: Vec<String> },
}

/// Load component names from `path`.
///
/// `.json` files hold either an array of names or `{"components": [...]}`;
/// anything else is read as one name per non-empty line.
pub fn load_components(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let components = if is_json {
        let parsed: ComponentsJson =
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        let names = match parsed {
            ComponentsJson::List(names) | ComponentsJson::Object { components: names } => names,
        };
        names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
    } else {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    };
    if components.is_empty() {
        bail!("no components found in {}", path.display());
    }
    Ok(components)
}
