//! Language-model oracle: query generation and structured field extraction.
//!
//! The [`Oracle`] trait decouples the steps from the model backend. Tests use
//! scripted oracles; [`ChatOracle`] talks to an OpenAI-compatible endpoint and
//! validates every extraction against the field's JSON Schema before
//! converting it into a typed [`FieldFinding`].

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use jsonschema::{Draft, Validator};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::core::types::{FieldFinding, FieldStatus, LifecycleField, SourceAttribution};
use crate::io::CollaboratorError;
use crate::io::chat::{ChatClient, ChatRequest};

const ACTIVE_FINDING_SCHEMA: &str = include_str!("../../schemas/active_finding.schema.json");
const EOS_FINDING_SCHEMA: &str = include_str!("../../schemas/eos_finding.schema.json");

/// Request for a free-text search query.
#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub component: &'a str,
    pub prompt: String,
}

/// Request for one field's structured extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub component: &'a str,
    pub field: LifecycleField,
    pub prompt: String,
}

/// Abstraction over the extraction/verification model.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Return free text containing a search query (normalized by the caller).
    async fn generate_query(&self, request: &QueryRequest<'_>) -> Result<String, CollaboratorError>;

    /// Return a validated finding for `request.field`.
    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<FieldFinding, CollaboratorError>;
}

/// Compiled JSON Schemas for both lifecycle fields.
pub struct FindingValidator {
    active: Validator,
    eos: Validator,
}

impl FindingValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            active: compile_schema(ACTIVE_FINDING_SCHEMA).context("compile active schema")?,
            eos: compile_schema(EOS_FINDING_SCHEMA).context("compile eos schema")?,
        })
    }

    /// Parse and validate raw model output for `field`.
    pub fn parse(
        &self,
        field: LifecycleField,
        content: &str,
    ) -> Result<FieldFinding, CollaboratorError> {
        let instance: Value = serde_json::from_str(strip_code_fence(content))
            .map_err(|e| CollaboratorError::InvalidJson(e.to_string()))?;
        let validator = match field {
            LifecycleField::Active => &self.active,
            LifecycleField::Eos => &self.eos,
        };
        let messages: Vec<String> = validator
            .iter_errors(&instance)
            .map(|err| err.to_string())
            .collect();
        if !messages.is_empty() {
            return Err(CollaboratorError::Schema(messages.join("; ")));
        }

        let finding: Result<FieldFinding, serde_json::Error> = match field {
            LifecycleField::Active => {
                serde_json::from_value::<ActiveWire>(instance).map(Into::into)
            }
            LifecycleField::Eos => serde_json::from_value::<EosWire>(instance).map(Into::into),
        };
        finding.map_err(|e| CollaboratorError::Schema(e.to_string()))
    }
}

fn compile_schema(raw: &str) -> Result<Validator> {
    let schema: Value = serde_json::from_str(raw).context("parse schema json")?;
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| anyhow!("compile json schema: {err}"))
}

/// Models sometimes wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[derive(Debug, Deserialize)]
struct ActiveWire {
    active_date: Option<String>,
    active_date_sources: Vec<SourceAttribution>,
    confidence_active: f64,
    notes_active: String,
    status_active: FieldStatus,
}

impl From<ActiveWire> for FieldFinding {
    fn from(wire: ActiveWire) -> Self {
        Self {
            date: wire.active_date,
            sources: wire.active_date_sources,
            confidence: wire.confidence_active,
            status: wire.status_active,
            notes: wire.notes_active,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EosWire {
    eos_date: Option<String>,
    eos_date_sources: Vec<SourceAttribution>,
    confidence_eos: f64,
    notes_eos: String,
    status_eos: FieldStatus,
}

impl From<EosWire> for FieldFinding {
    fn from(wire: EosWire) -> Self {
        Self {
            date: wire.eos_date,
            sources: wire.eos_date_sources,
            confidence: wire.confidence_eos,
            status: wire.status_eos,
            notes: wire.notes_eos,
        }
    }
}

/// Oracle backed by an OpenAI-compatible chat endpoint.
pub struct ChatOracle {
    chat: ChatClient,
    model: String,
    temperature: f64,
    validator: FindingValidator,
}

impl ChatOracle {
    pub fn new(chat: ChatClient, model: impl Into<String>, temperature: f64) -> Result<Self> {
        Ok(Self {
            chat,
            model: model.into(),
            temperature,
            validator: FindingValidator::new()?,
        })
    }
}

#[async_trait]
impl Oracle for ChatOracle {
    #[instrument(skip_all, fields(component = request.component))]
    async fn generate_query(
        &self,
        request: &QueryRequest<'_>,
    ) -> Result<String, CollaboratorError> {
        let completion = self
            .chat
            .complete(&ChatRequest {
                model: &self.model,
                system: None,
                user: &request.prompt,
                temperature: Some(self.temperature),
                json_mode: false,
            })
            .await?;
        debug!(raw_query = %completion.content, "oracle generated query");
        Ok(completion.content)
    }

    #[instrument(skip_all, fields(component = request.component, field = %request.field))]
    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<FieldFinding, CollaboratorError> {
        let completion = self
            .chat
            .complete(&ChatRequest {
                model: &self.model,
                system: None,
                user: &request.prompt,
                temperature: Some(self.temperature),
                json_mode: true,
            })
            .await?;
        let finding = self.validator.parse(request.field, &completion.content)?;
        debug!(
            status = %finding.status,
            confidence = finding.confidence,
            "oracle extraction parsed"
        );
        Ok(finding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FindingValidator {
        FindingValidator::new().expect("schemas compile")
    }

    const ACTIVE_OK: &str = r#"{
        "active_date": "2022-04-27",
        "active_date_sources": [
            {
                "url": "https://redis.io/blog/redis-7-generally-available/",
                "domain": "redis.io",
                "credibility_score": 95,
                "content_snippet": "Redis 7.0 is now GA"
            }
        ],
        "confidence_active": 92,
        "notes_active": "vendor announcement",
        "status_active": "verified"
    }"#;

    #[test]
    fn parses_valid_active_finding() {
        let finding = validator()
            .parse(LifecycleField::Active, ACTIVE_OK)
            .expect("parse");
        assert_eq!(finding.date.as_deref(), Some("2022-04-27"));
        assert_eq!(finding.status, FieldStatus::Verified);
        assert_eq!(finding.sources[0].domain, "redis.io");
        assert_eq!(finding.confidence, 92.0);
    }

    #[test]
    fn null_source_text_is_accepted() {
        let content = ACTIVE_OK
            .replace("\"redis.io\"", "null")
            .replace("\"Redis 7.0 is now GA\"", "null");
        assert_eq!(content.matches(": null").count(), 2);

        let finding = validator()
            .parse(LifecycleField::Active, &content)
            .expect("parse");

        let source = &finding.sources[0];
        assert_eq!(source.url, "https://redis.io/blog/redis-7-generally-available/");
        assert_eq!(source.domain, "");
        assert_eq!(source.content_snippet, "");
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{ACTIVE_OK}\n```");
        assert!(validator().parse(LifecycleField::Active, &fenced).is_ok());
    }

    #[test]
    fn derived_status_is_rejected_for_active() {
        let content = ACTIVE_OK.replace("\"verified\"", "\"derived\"");
        let err = validator()
            .parse(LifecycleField::Active, &content)
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Schema(_)));
    }

    #[test]
    fn derived_status_is_accepted_for_eos() {
        let content = r#"{
            "eos_date": "2025-02-28",
            "eos_date_sources": [],
            "confidence_eos": 86,
            "notes_eos": "computed from the 3-year policy",
            "status_eos": "derived"
        }"#;
        let finding = validator()
            .parse(LifecycleField::Eos, content)
            .expect("parse");
        assert_eq!(finding.status, FieldStatus::Derived);
        assert!(finding.sources.is_empty());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let content = ACTIVE_OK.replace("\"confidence_active\": 92", "\"confidence_active\": 140");
        assert!(matches!(
            validator().parse(LifecycleField::Active, &content),
            Err(CollaboratorError::Schema(_))
        ));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let content = ACTIVE_OK.replace("2022-04-27", "April 2022");
        assert!(validator().parse(LifecycleField::Active, &content).is_err());
    }

    #[test]
    fn non_json_is_invalid_json() {
        assert!(matches!(
            validator().parse(LifecycleField::Eos, "I could not find it"),
            Err(CollaboratorError::InvalidJson(_))
        ));
    }
}
