//! Test-only collaborators and fixtures for the research loop.
//!
//! Scripted doubles replay queued responses in call order and record what
//! they were asked. The latency doubles are for batch tests where sessions
//! interleave and call order is not deterministic.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::policy::ResearchPolicy;
use crate::core::types::{
    FieldFinding, FieldStatus, LifecycleField, SearchMode, SearchResponse, SourceAttribution,
    VerificationResult,
};
use crate::io::CollaboratorError;
use crate::io::oracle::{ExtractionRequest, Oracle, QueryRequest};
use crate::io::prompt::PromptSet;
use crate::io::search::SearchProvider;
use crate::session::Researcher;

/// Search double replaying queued raw contents (or errors) in call order.
#[derive(Default)]
pub struct ScriptedSearch {
    responses: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    calls: Mutex<Vec<(String, SearchMode)>>,
}

impl ScriptedSearch {
    pub fn new(responses: Vec<Result<String, CollaboratorError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `(query, mode)` received so far.
    pub fn calls(&self) -> Vec<(String, SearchMode)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> Result<SearchResponse, CollaboratorError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((query.to_string(), mode));
        let next = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(CollaboratorError::Request(
                    "no scripted search response".to_string(),
                ))
            });
        next.map(|raw_content| SearchResponse {
            raw_content,
            model: format!("scripted-{}", mode.as_str()),
            query: query.to_string(),
        })
    }
}

/// Oracle double with separate queues for query generation and extraction.
#[derive(Default)]
pub struct ScriptedOracle {
    queries: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    findings: Mutex<VecDeque<Result<FieldFinding, CollaboratorError>>>,
    query_calls: AtomicUsize,
    extractions: Mutex<Vec<(LifecycleField, String)>>,
}

impl ScriptedOracle {
    pub fn new(
        queries: Vec<Result<String, CollaboratorError>>,
        findings: Vec<Result<FieldFinding, CollaboratorError>>,
    ) -> Self {
        Self {
            queries: Mutex::new(queries.into()),
            findings: Mutex::new(findings.into()),
            query_calls: AtomicUsize::new(0),
            extractions: Mutex::new(Vec::new()),
        }
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Fields requested so far, with the prompt each extraction received.
    pub fn extractions(&self) -> Vec<(LifecycleField, String)> {
        self.extractions.lock().expect("extractions lock").clone()
    }

    pub fn extraction_calls(&self) -> usize {
        self.extractions.lock().expect("extractions lock").len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate_query(
        &self,
        _request: &QueryRequest<'_>,
    ) -> Result<String, CollaboratorError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("queries lock")
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Request("no scripted query".to_string())))
    }

    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<FieldFinding, CollaboratorError> {
        self.extractions
            .lock()
            .expect("extractions lock")
            .push((request.field, request.prompt.clone()));
        self.findings
            .lock()
            .expect("findings lock")
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::Request("no scripted finding".to_string())))
    }
}

/// Search double that sleeps per call and tracks how many calls overlap.
///
/// Queries containing any of `fail_markers` fail with a request error.
pub struct LatencySearch {
    delay: Duration,
    fail_markers: Vec<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl LatencySearch {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            fail_markers: Vec::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for LatencySearch {
    async fn search(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> Result<SearchResponse, CollaboratorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_markers.iter().any(|marker| query.contains(marker)) {
            return Err(CollaboratorError::Request(format!("connection reset for {query}")));
        }
        Ok(SearchResponse {
            raw_content: format!("{query}: released 2022-04-27, supported until 2025-02-28"),
            model: format!("latency-{}", mode.as_str()),
            query: query.to_string(),
        })
    }
}

/// Oracle double that always answers confidently.
///
/// Queries are `"<component> release date"`; both fields come back verified
/// at 95 with one credible source.
#[derive(Default)]
pub struct ConfidentOracle;

#[async_trait]
impl Oracle for ConfidentOracle {
    async fn generate_query(
        &self,
        request: &QueryRequest<'_>,
    ) -> Result<String, CollaboratorError> {
        Ok(format!("Query: \"{} release date\"", request.component))
    }

    async fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<FieldFinding, CollaboratorError> {
        let date = match request.field {
            LifecycleField::Active => "2022-04-27",
            LifecycleField::Eos => "2025-02-28",
        };
        Ok(FieldFinding {
            sources: vec![source("https://vendor.example/lifecycle", 95.0)],
            ..finding(FieldStatus::Verified, 95.0, Some(date))
        })
    }
}

/// A finding without sources.
pub fn finding(status: FieldStatus, confidence: f64, date: Option<&str>) -> FieldFinding {
    FieldFinding {
        date: date.map(str::to_string),
        sources: Vec::new(),
        confidence,
        status,
        notes: format!("{status} at {confidence}"),
    }
}

/// A source whose domain is derived from `url`.
pub fn source(url: &str, credibility_score: f64) -> SourceAttribution {
    let domain = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or_default()
        .to_string();
    SourceAttribution {
        url: url.to_string(),
        domain,
        credibility_score,
        content_snippet: String::new(),
    }
}

pub fn verification(active: FieldFinding, eos: FieldFinding) -> VerificationResult {
    VerificationResult { active, eos }
}

/// Researcher over the given doubles with the default policy.
pub fn researcher(search: Arc<dyn SearchProvider>, oracle: Arc<dyn Oracle>) -> Researcher {
    researcher_with_policy(search, oracle, ResearchPolicy::default())
}

pub fn researcher_with_policy(
    search: Arc<dyn SearchProvider>,
    oracle: Arc<dyn Oracle>,
    policy: ResearchPolicy,
) -> Researcher {
    let prompts = PromptSet::new().expect("prompt templates compile");
    Researcher::new(search, oracle, prompts, policy)
}

/// Temporary directory holding a one-name-per-line components file.
pub struct ComponentsFile {
    _dir: TempDir,
    pub path: PathBuf,
}

impl ComponentsFile {
    pub fn new(names: &[&str]) -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let path = dir.path().join("components.txt");
        fs::write(&path, names.join("\n")).context("write components file")?;
        Ok(Self { _dir: dir, path })
    }
}
