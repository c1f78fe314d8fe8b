//! Dual-field structured extraction over the latest search content.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::policy::ResearchPolicy;
use crate::core::run_state::{ContractViolation, RunState};
use crate::core::sources::partition_sources;
use crate::core::types::{FieldFinding, FieldStatus, LifecycleField, VerificationResult};
use crate::io::CollaboratorError;
use crate::io::oracle::{ExtractionRequest, Oracle};
use crate::io::prompt::PromptSet;

pub struct VerificationStep {
    oracle: Arc<dyn Oracle>,
    prompts: PromptSet,
    policy: ResearchPolicy,
}

impl VerificationStep {
    pub fn new(oracle: Arc<dyn Oracle>, prompts: PromptSet, policy: ResearchPolicy) -> Self {
        Self {
            oracle,
            prompts,
            policy,
        }
    }

    /// Extract both lifecycle fields from the most recent search attempt.
    ///
    /// The two extractions run one after the other and the result is only
    /// applied when both succeed. Either failure zeroes the confidence and
    /// terminates the session with `error:<message>`.
    ///
    /// An empty search history is a contract violation and makes no call.
    #[instrument(skip_all, fields(component = state.component()))]
    pub async fn run(&self, state: &mut RunState) -> Result<(), ContractViolation> {
        state.ensure_running()?;
        let raw_content = state
            .last_attempt()
            .map(|attempt| attempt.raw_content.clone())
            .ok_or(ContractViolation::EmptySearchHistory)?;
        let component = state.component().to_string();

        let extracted = self.extract_both(&component, &raw_content).await;
        let result = match extracted {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "verification failed");
                state.record_verification_failure(err.to_string());
                return Ok(());
            }
        };

        let partition = partition_sources(result.sources(), self.policy.credibility_threshold);
        debug!(
            verified = partition.verified.len(),
            failed = partition.failed.len(),
            "sources partitioned"
        );
        state.apply_verification(result, partition);
        info!(
            confidence = state.confidence_score(),
            "verification applied"
        );
        Ok(())
    }

    async fn extract_both(
        &self,
        component: &str,
        raw_content: &str,
    ) -> Result<VerificationResult, CollaboratorError> {
        let active = self
            .extract(LifecycleField::Active, component, raw_content)
            .await?;
        let eos = self
            .extract(LifecycleField::Eos, component, raw_content)
            .await?;
        Ok(VerificationResult { active, eos })
    }

    async fn extract(
        &self,
        field: LifecycleField,
        component: &str,
        raw_content: &str,
    ) -> Result<FieldFinding, CollaboratorError> {
        let prompt = self
            .prompts
            .verification(field, component, raw_content)
            .map_err(|err| CollaboratorError::Prompt(format!("{err:#}")))?;
        let finding = self
            .oracle
            .extract(&ExtractionRequest {
                component,
                field,
                prompt,
            })
            .await?;
        check_finding(field, &finding)?;
        Ok(finding)
    }
}

/// Boundary checks that hold for every oracle, not just schema-backed ones.
fn check_finding(field: LifecycleField, finding: &FieldFinding) -> Result<(), CollaboratorError> {
    if finding.status == FieldStatus::Derived && !field.allows_derived() {
        return Err(CollaboratorError::Schema(format!(
            "status_{field} may not be derived"
        )));
    }
    let in_range = |value: f64| (0.0..=100.0).contains(&value);
    if !in_range(finding.confidence) {
        return Err(CollaboratorError::Schema(format!(
            "confidence_{field} {} is outside [0, 100]",
            finding.confidence
        )));
    }
    if let Some(source) = finding
        .sources
        .iter()
        .find(|source| !in_range(source.credibility_score))
    {
        return Err(CollaboratorError::Schema(format!(
            "credibility_score {} of {} is outside [0, 100]",
            source.credibility_score, source.url
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{SearchAttempt, SearchMode, TerminationReason};
    use crate::test_support::{ScriptedOracle, finding, source};

    fn step(oracle: &Arc<ScriptedOracle>) -> VerificationStep {
        VerificationStep::new(
            oracle.clone(),
            PromptSet::new().expect("prompts"),
            ResearchPolicy::default(),
        )
    }

    fn searched_state(raw_contents: &[&str]) -> RunState {
        let mut state = RunState::new("PostgreSQL 15");
        for (i, raw) in raw_contents.iter().enumerate() {
            state.record_attempt(SearchAttempt {
                query: format!("q{i}"),
                mode: SearchMode::Fast,
                raw_content: (*raw).to_string(),
                model_used: "sonar-pro".to_string(),
            });
        }
        state
    }

    #[tokio::test]
    async fn empty_history_fails_without_calling_oracle() {
        let oracle = Arc::new(ScriptedOracle::default());
        let mut state = RunState::new("PostgreSQL 15");

        let err = step(&oracle).run(&mut state).await.unwrap_err();

        assert_eq!(err, ContractViolation::EmptySearchHistory);
        assert_eq!(oracle.extraction_calls(), 0);
        assert!(!state.is_terminated());
    }

    #[tokio::test]
    async fn extracts_both_fields_from_latest_attempt() {
        let active = FieldFinding {
            sources: vec![
                source("https://www.postgresql.org/about/news/", 95.0),
                source("https://blog.example/pg15", 40.0),
            ],
            ..finding(FieldStatus::Verified, 92.0, Some("2022-10-13"))
        };
        let eos = FieldFinding {
            sources: vec![source("https://www.postgresql.org/support/versioning/", 70.0)],
            ..finding(FieldStatus::Verified, 88.0, Some("2027-11-11"))
        };
        let oracle = Arc::new(ScriptedOracle::new(
            Vec::new(),
            vec![Ok(active.clone()), Ok(eos.clone())],
        ));
        let mut state = searched_state(&["stale content", "fresh content"]);

        step(&oracle).run(&mut state).await.expect("run");

        let extractions = oracle.extractions();
        assert_eq!(
            extractions.iter().map(|(field, _)| *field).collect::<Vec<_>>(),
            vec![LifecycleField::Active, LifecycleField::Eos]
        );
        assert!(extractions.iter().all(|(_, prompt)| prompt.contains("fresh content")));
        assert!(extractions.iter().all(|(_, prompt)| !prompt.contains("stale content")));

        assert_eq!(state.current_result(), Some(&VerificationResult { active, eos }));
        assert_eq!(state.confidence_score(), 88.0);
        assert_eq!(
            state.verified_sources(),
            &[
                "https://www.postgresql.org/about/news/".to_string(),
                "https://www.postgresql.org/support/versioning/".to_string(),
            ]
        );
        assert_eq!(state.failed_sources(), &["https://blog.example/pg15".to_string()]);
        assert_eq!(state.iteration_count(), 2);
    }

    #[tokio::test]
    async fn eos_failure_discards_fresh_active_finding() {
        let previous = VerificationResult {
            active: finding(FieldStatus::Ambiguous, 50.0, None),
            eos: finding(FieldStatus::NotFound, 30.0, None),
        };
        let oracle = Arc::new(ScriptedOracle::new(
            Vec::new(),
            vec![
                Ok(previous.active.clone()),
                Ok(previous.eos.clone()),
                Ok(finding(FieldStatus::Verified, 95.0, Some("2022-10-13"))),
                Err(CollaboratorError::InvalidJson("expected value".to_string())),
            ],
        ));
        let mut state = searched_state(&["first"]);
        step(&oracle).run(&mut state).await.expect("first run");
        assert_eq!(state.confidence_score(), 30.0);

        state.record_attempt(SearchAttempt {
            query: "followup".to_string(),
            mode: SearchMode::Deep,
            raw_content: "second".to_string(),
            model_used: "sonar-deep-research".to_string(),
        });
        step(&oracle).run(&mut state).await.expect("second run");

        assert_eq!(state.current_result(), Some(&previous));
        assert_eq!(state.confidence_score(), 0.0);
        assert_eq!(state.iteration_count(), 3);
        assert_eq!(
            state.termination_reason(),
            Some(&TerminationReason::Error(
                "invalid json: expected value".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn derived_active_status_is_rejected() {
        let oracle = Arc::new(ScriptedOracle::new(
            Vec::new(),
            vec![
                Ok(finding(FieldStatus::Derived, 90.0, Some("2022-10-13"))),
                Ok(finding(FieldStatus::Derived, 90.0, Some("2027-11-11"))),
            ],
        ));
        let mut state = searched_state(&["content"]);

        step(&oracle).run(&mut state).await.expect("run");

        assert_eq!(oracle.extraction_calls(), 1);
        assert!(state.current_result().is_none());
        assert!(state.termination_reason().is_some_and(TerminationReason::is_error));
    }

    #[test]
    fn credibility_outside_range_is_rejected() {
        let bad = FieldFinding {
            sources: vec![source("https://example.com", 130.0)],
            ..finding(FieldStatus::Verified, 90.0, None)
        };
        assert!(check_finding(LifecycleField::Eos, &bad).is_err());
        assert!(
            check_finding(
                LifecycleField::Eos,
                &finding(FieldStatus::Derived, 90.0, None)
            )
            .is_ok()
        );
    }
}
