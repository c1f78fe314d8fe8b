//! Per-component session state threaded through the research steps.

use thiserror::Error;

use crate::core::output::ComponentResult;
use crate::core::sources::SourcePartition;
use crate::core::types::{SearchAttempt, TerminationReason, VerificationResult};

/// A step was invoked outside its contract. Fatal for the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("no search history available for verification")]
    EmptySearchHistory,
    #[error("session for '{component}' already terminated ({reason})")]
    AlreadyTerminated { component: String, reason: String },
}

/// Mutable record of one component's research session.
///
/// Owned exclusively by the session driving it. Fields are only reachable
/// through methods that keep the history append-only, the iteration count
/// monotonic and the termination reason set-once.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    component: String,
    search_history: Vec<SearchAttempt>,
    current_result: Option<VerificationResult>,
    confidence_score: f64,
    iteration_count: u32,
    verified_sources: Vec<String>,
    failed_sources: Vec<String>,
    termination_reason: Option<TerminationReason>,
    output: Option<ComponentResult>,
}

impl RunState {
    pub fn new(component: impl Into<String>) -> Self {
        Self::resume(component, Vec::new())
    }

    /// Start a session on top of searches already issued for this component.
    ///
    /// Prior attempts take part in the initial-query duplicate guard but do
    /// not count as iterations of this session.
    pub fn resume(component: impl Into<String>, search_history: Vec<SearchAttempt>) -> Self {
        Self {
            component: component.into(),
            search_history,
            current_result: None,
            confidence_score: 0.0,
            iteration_count: 0,
            verified_sources: Vec::new(),
            failed_sources: Vec::new(),
            termination_reason: None,
            output: None,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn search_history(&self) -> &[SearchAttempt] {
        &self.search_history
    }

    pub fn last_attempt(&self) -> Option<&SearchAttempt> {
        self.search_history.last()
    }

    pub fn has_query(&self, query: &str) -> bool {
        self.search_history.iter().any(|attempt| attempt.query == query)
    }

    pub fn current_result(&self) -> Option<&VerificationResult> {
        self.current_result.as_ref()
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn verified_sources(&self) -> &[String] {
        &self.verified_sources
    }

    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.termination_reason.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.termination_reason.is_some()
    }

    pub fn output(&self) -> Option<&ComponentResult> {
        self.output.as_ref()
    }

    /// Fail with [`ContractViolation::AlreadyTerminated`] once a reason is set.
    pub fn ensure_running(&self) -> Result<(), ContractViolation> {
        match &self.termination_reason {
            Some(reason) => Err(ContractViolation::AlreadyTerminated {
                component: self.component.clone(),
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Set the termination reason if none is set yet.
    ///
    /// Returns `false` (leaving the first reason in place) otherwise.
    pub fn terminate(&mut self, reason: TerminationReason) -> bool {
        if self.termination_reason.is_some() {
            return false;
        }
        self.termination_reason = Some(reason);
        true
    }

    /// Append a successful search and count it as an iteration.
    pub fn record_attempt(&mut self, attempt: SearchAttempt) {
        self.search_history.push(attempt);
        self.iteration_count += 1;
    }

    /// A research-producing call failed: terminate and still count the iteration.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.terminate(TerminationReason::Error(message.into()));
        self.iteration_count += 1;
    }

    /// Verification failed: confidence drops to zero, then same as [`Self::record_failure`].
    pub fn record_verification_failure(&mut self, message: impl Into<String>) {
        self.confidence_score = 0.0;
        self.record_failure(message);
    }

    /// Replace the current result wholesale and accumulate its sources.
    pub fn apply_verification(&mut self, result: VerificationResult, partition: SourcePartition) {
        self.confidence_score = result.combined_confidence();
        self.current_result = Some(result);
        self.verified_sources.extend(partition.verified);
        self.failed_sources.extend(partition.failed);
    }

    pub(crate) fn set_output(&mut self, output: ComponentResult) {
        self.output = Some(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearchMode;

    fn attempt(query: &str) -> SearchAttempt {
        SearchAttempt {
            query: query.to_string(),
            mode: SearchMode::Fast,
            raw_content: "content".to_string(),
            model_used: "sonar-pro".to_string(),
        }
    }

    #[test]
    fn terminate_keeps_first_reason() {
        let mut state = RunState::new("nginx 1.24");
        assert!(state.terminate(TerminationReason::DuplicateSearch));
        assert!(!state.terminate(TerminationReason::Completed));
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::DuplicateSearch)
        );
    }

    #[test]
    fn failure_counts_iteration_and_terminates() {
        let mut state = RunState::new("nginx 1.24");
        state.record_failure("boom");
        assert_eq!(state.iteration_count(), 1);
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::Error("boom".to_string()))
        );
        assert!(state.ensure_running().is_err());
    }

    #[test]
    fn resumed_history_is_not_counted() {
        let state = RunState::resume("nginx 1.24", vec![attempt("nginx 1.24 release date")]);
        assert_eq!(state.iteration_count(), 0);
        assert!(state.has_query("nginx 1.24 release date"));
        assert!(!state.has_query("nginx 1.24"));
    }

    #[test]
    fn record_attempt_appends_and_counts() {
        let mut state = RunState::new("nginx 1.24");
        state.record_attempt(attempt("q1"));
        state.record_attempt(attempt("q2"));
        assert_eq!(state.iteration_count(), 2);
        assert_eq!(state.last_attempt().map(|a| a.query.as_str()), Some("q2"));
    }
}
