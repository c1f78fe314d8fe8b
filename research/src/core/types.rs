//! Shared deterministic types for the research loop.
//!
//! These types define stable contracts between the steps, the collaborators
//! and the exported result record. They carry no I/O.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Tier of the search collaborator used for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Low latency, used for the initial search.
    Fast,
    /// Higher latency and cost, broader retrieval. Used for follow-ups.
    Deep,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Fast => "fast",
            SearchMode::Deep => "deep",
        }
    }
}

/// Successful response from the search collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub raw_content: String,
    pub model: String,
    pub query: String,
}

/// One entry of a session's search history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAttempt {
    pub query: String,
    pub mode: SearchMode,
    pub raw_content: String,
    pub model_used: String,
}

/// The two lifecycle facts researched for every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleField {
    /// General-availability / release date.
    Active,
    /// End-of-standard-support date.
    Eos,
}

impl LifecycleField {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleField::Active => "active",
            LifecycleField::Eos => "eos",
        }
    }

    /// Whether the oracle may report the `derived` status for this field.
    pub fn allows_derived(self) -> bool {
        matches!(self, LifecycleField::Eos)
    }
}

impl fmt::Display for LifecycleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oracle-declared status of one lifecycle field.
///
/// `Derived` (inferred rather than directly sourced) is only valid for EOS;
/// the oracle boundary rejects it for the active field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Verified,
    Ambiguous,
    NotFound,
    NotApplicable,
    Derived,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldStatus::Verified => "verified",
            FieldStatus::Ambiguous => "ambiguous",
            FieldStatus::NotFound => "not_found",
            FieldStatus::NotApplicable => "not_applicable",
            FieldStatus::Derived => "derived",
        }
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source cited by the oracle for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub domain: String,
    /// Trust rating in `[0, 100]`.
    pub credibility_score: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content_snippet: String,
}

/// Models often send `null` for optional source text.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Structured extraction for a single lifecycle field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFinding {
    /// ISO-8601 calendar date, `None` when not determined.
    pub date: Option<String>,
    pub sources: Vec<SourceAttribution>,
    pub confidence: f64,
    pub status: FieldStatus,
    pub notes: String,
}

/// Outcome of one VerificationStep: both fields, always replaced together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub active: FieldFinding,
    pub eos: FieldFinding,
}

impl VerificationResult {
    /// Conservative combination: a run is only as confident as its weakest field.
    pub fn combined_confidence(&self) -> f64 {
        self.active.confidence.min(self.eos.confidence)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceAttribution> {
        self.active.sources.iter().chain(self.eos.sources.iter())
    }
}

/// Why a session stopped. Set exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The initial query was already present in the search history.
    DuplicateSearch,
    /// A collaborator call failed; carries the underlying message.
    Error(String),
    /// Normal terminal state, regardless of confidence achieved.
    Completed,
}

impl TerminationReason {
    pub fn is_error(&self) -> bool {
        matches!(self, TerminationReason::Error(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::DuplicateSearch => f.write_str("duplicate_search"),
            TerminationReason::Error(message) => write!(f, "error:{message}"),
            TerminationReason::Completed => f.write_str("completed"),
        }
    }
}

impl Serialize for TerminationReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Verdict of the DecisionStep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Finish,
    Continue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_reason_renders_stable_strings() {
        assert_eq!(
            TerminationReason::DuplicateSearch.to_string(),
            "duplicate_search"
        );
        assert_eq!(
            TerminationReason::Error("timeout".to_string()).to_string(),
            "error:timeout"
        );
        assert_eq!(TerminationReason::Completed.to_string(), "completed");
    }

    #[test]
    fn field_status_uses_snake_case_on_the_wire() {
        let status: FieldStatus = serde_json::from_str("\"not_applicable\"").expect("parse");
        assert_eq!(status, FieldStatus::NotApplicable);
        assert_eq!(
            serde_json::to_string(&FieldStatus::NotFound).expect("serialize"),
            "\"not_found\""
        );
    }

    #[test]
    fn source_defaults_optional_text_fields() {
        let source: SourceAttribution =
            serde_json::from_str(r#"{"url":"https://a.example","credibility_score":80}"#)
                .expect("parse");
        assert_eq!(source.domain, "");
        assert_eq!(source.content_snippet, "");
    }

    #[test]
    fn source_null_text_fields_become_empty() {
        let source: SourceAttribution = serde_json::from_str(
            r#"{
                "url": "https://a.example",
                "domain": null,
                "credibility_score": 80,
                "content_snippet": null
            }"#,
        )
        .expect("parse");
        assert_eq!(source.domain, "");
        assert_eq!(source.content_snippet, "");
    }
}
