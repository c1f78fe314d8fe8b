//! Confidence and iteration policy for the research loop.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Overridable thresholds and caps that gate the loop.
///
/// Loaded from the `[policy]` section of the config file. The defaults are
/// uncalibrated values carried over from the production prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPolicy {
    /// Minimum active-date confidence for `activeOk`.
    pub active_confidence_threshold: f64,
    /// Minimum EOS confidence for `eosOk` (ignored when EOS is not applicable).
    pub eos_confidence_threshold: f64,
    /// Sources at or above this credibility are partitioned as verified.
    pub credibility_threshold: f64,
    /// DecisionStep returns `finish` once `iteration_count` reaches this value.
    pub iteration_cap: u32,
    /// Maximum decision/follow-up rounds driven by the orchestrator.
    pub max_followups: u32,
}

impl Default for ResearchPolicy {
    fn default() -> Self {
        Self {
            active_confidence_threshold: 85.0,
            eos_confidence_threshold: 85.0,
            credibility_threshold: 70.0,
            iteration_cap: 2,
            max_followups: 2,
        }
    }
}

impl ResearchPolicy {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            (
                "active_confidence_threshold",
                self.active_confidence_threshold,
            ),
            ("eos_confidence_threshold", self.eos_confidence_threshold),
            ("credibility_threshold", self.credibility_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("policy.{name} must be within [0, 100] (got {value})");
            }
        }
        if self.iteration_cap == 0 {
            bail!("policy.iteration_cap must be > 0");
        }
        if self.max_followups == 0 {
            bail!("policy.max_followups must be > 0");
        }
        Ok(())
    }
}
