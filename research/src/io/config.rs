//! Research configuration stored in `research.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::policy::ResearchPolicy;
use crate::io::chat::ChatSettings;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "research.toml";

/// Research configuration (TOML).
///
/// Missing fields and a missing file fall back to the defaults below. API
/// keys are never stored here; only the names of the env vars holding them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResearchConfig {
    pub search: SearchConfig,
    pub oracle: OracleConfig,
    pub batch: BatchConfig,
    pub policy: ResearchPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Model used for the initial, fast search.
    pub fast_model: String,
    /// Model used for follow-up, deep searches.
    pub deep_model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.perplexity.ai".to_string(),
            fast_model: "sonar-pro".to_string(),
            deep_model: "sonar-deep-research".to_string(),
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
            // Deep research calls routinely take minutes.
            timeout_secs: 600,
            max_retries: 2,
        }
    }
}

impl SearchConfig {
    pub fn chat_settings(&self) -> Result<ChatSettings> {
        Ok(ChatSettings {
            base_url: self.base_url.clone(),
            api_key: read_api_key(&self.api_key_env)?,
            api_version: None,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OracleConfig {
    /// OpenAI-compatible base URL (for Azure: the deployment URL).
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    /// Set for Azure OpenAI deployments.
    pub api_version: Option<String>,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_version: None,
            temperature: 0.0,
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

impl OracleConfig {
    pub fn chat_settings(&self) -> Result<ChatSettings> {
        Ok(ChatSettings {
            base_url: self.base_url.clone(),
            api_key: read_api_key(&self.api_key_env)?,
            api_version: self.api_version.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of sessions in flight at once.
    pub max_concurrent: usize,
    /// Directory for exported batch results.
    pub output_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            output_dir: PathBuf::from("outputs"),
        }
    }
}

impl ResearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch.max_concurrent == 0 {
            return Err(anyhow!("batch.max_concurrent must be > 0"));
        }
        if self.search.timeout_secs == 0 || self.oracle.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        for (name, value) in [
            ("search.base_url", &self.search.base_url),
            ("search.fast_model", &self.search.fast_model),
            ("search.deep_model", &self.search.deep_model),
            ("oracle.base_url", &self.oracle.base_url),
            ("oracle.model", &self.oracle.model),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must be non-empty"));
            }
        }
        self.policy.validate()
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ResearchConfig::default()`.
pub fn load_config(path: &Path) -> Result<ResearchConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = ResearchConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ResearchConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

fn read_api_key(env_var: &str) -> Result<String> {
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| anyhow!("missing api key: env var {env_var} is not set"))
}
