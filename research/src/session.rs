//! Orchestration for one component's research session.
//!
//! A session drives a fixed sequence: initial search, verification, then at
//! most `max_followups` rounds of decision, follow-up search and
//! re-verification, and finally the output projection. Every session ends
//! with an output record, including sessions terminated by an error or a
//! duplicate query.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::core::decision::decide;
use crate::core::output::{ComponentResult, finalize};
use crate::core::policy::ResearchPolicy;
use crate::core::run_state::{ContractViolation, RunState};
use crate::core::types::{Decision, SearchAttempt, TerminationReason, VerificationResult};
use crate::io::oracle::Oracle;
use crate::io::prompt::PromptSet;
use crate::io::search::SearchProvider;
use crate::steps::{FollowupStep, SearchStep, VerificationStep};

/// Progress notification emitted after each step of a session.
#[derive(Debug, Clone, Copy)]
pub enum SessionEvent<'a> {
    /// The initial fast search was recorded.
    Searched(&'a SearchAttempt),
    /// A verification result was applied.
    Verified {
        result: &'a VerificationResult,
        confidence_score: f64,
        verified_sources: usize,
        failed_sources: usize,
    },
    Decided {
        decision: Decision,
        iteration_count: u32,
    },
    /// A deep follow-up search was recorded.
    FollowedUp(&'a SearchAttempt),
    /// A step ended the session early (duplicate query or collaborator error).
    Terminated(&'a TerminationReason),
    /// The output record was produced.
    Finished(&'a ComponentResult),
}

/// Runs research sessions against shared collaborators.
///
/// Holds no per-session state; one instance serves any number of
/// concurrent sessions.
pub struct Researcher {
    search: SearchStep,
    verification: VerificationStep,
    followup: FollowupStep,
    policy: ResearchPolicy,
}

impl Researcher {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        oracle: Arc<dyn Oracle>,
        prompts: PromptSet,
        policy: ResearchPolicy,
    ) -> Self {
        Self {
            search: SearchStep::new(oracle.clone(), search.clone(), prompts.clone()),
            verification: VerificationStep::new(oracle, prompts.clone(), policy.clone()),
            followup: FollowupStep::new(search, prompts),
            policy,
        }
    }

    pub fn policy(&self) -> &ResearchPolicy {
        &self.policy
    }

    /// Research `component` from a fresh state.
    pub async fn research(&self, component: &str) -> Result<RunState, ContractViolation> {
        self.run_session(RunState::new(component), |_| {}).await
    }

    /// Drive `state` to completion, reporting each step to `on_event`.
    ///
    /// Returns the final state, whose output is always set. Errors are
    /// contract violations only; collaborator failures end up in the
    /// output record.
    #[instrument(skip_all, fields(component = state.component()))]
    pub async fn run_session<F>(
        &self,
        mut state: RunState,
        mut on_event: F,
    ) -> Result<RunState, ContractViolation>
    where
        F: FnMut(SessionEvent<'_>),
    {
        let history_len = state.search_history().len();
        self.search.run(&mut state).await?;
        if let Some(attempt) = state
            .last_attempt()
            .filter(|_| state.search_history().len() > history_len)
        {
            on_event(SessionEvent::Searched(attempt));
        }
        if self.stopped(&state, &mut on_event) {
            return Ok(self.finish(state, &mut on_event));
        }

        self.verify(&mut state, &mut on_event).await?;
        if self.stopped(&state, &mut on_event) {
            return Ok(self.finish(state, &mut on_event));
        }

        for round in 0..self.policy.max_followups {
            let decision = decide(
                state.current_result(),
                state.iteration_count(),
                &self.policy,
            );
            debug!(round, ?decision, iteration_count = state.iteration_count(), "decided");
            on_event(SessionEvent::Decided {
                decision,
                iteration_count: state.iteration_count(),
            });
            if decision == Decision::Finish {
                break;
            }

            self.followup.run(&mut state).await?;
            if self.stopped(&state, &mut on_event) {
                break;
            }
            if let Some(attempt) = state.last_attempt() {
                on_event(SessionEvent::FollowedUp(attempt));
            }

            self.verify(&mut state, &mut on_event).await?;
            if self.stopped(&state, &mut on_event) {
                break;
            }
        }

        Ok(self.finish(state, &mut on_event))
    }

    async fn verify<F>(
        &self,
        state: &mut RunState,
        on_event: &mut F,
    ) -> Result<(), ContractViolation>
    where
        F: FnMut(SessionEvent<'_>),
    {
        self.verification.run(state).await?;
        if let Some(result) = state.current_result().filter(|_| !state.is_terminated()) {
            on_event(SessionEvent::Verified {
                result,
                confidence_score: state.confidence_score(),
                verified_sources: state.verified_sources().len(),
                failed_sources: state.failed_sources().len(),
            });
        }
        Ok(())
    }

    /// Report an early termination; returns whether the session must stop.
    fn stopped<F>(&self, state: &RunState, on_event: &mut F) -> bool
    where
        F: FnMut(SessionEvent<'_>),
    {
        match state.termination_reason() {
            Some(reason) => {
                on_event(SessionEvent::Terminated(reason));
                true
            }
            None => false,
        }
    }

    fn finish<F>(&self, mut state: RunState, on_event: &mut F) -> RunState
    where
        F: FnMut(SessionEvent<'_>),
    {
        let output = finalize(&mut state);
        info!(
            iteration_count = output.iteration_count,
            confidence = output.confidence_score,
            reason = ?state.termination_reason().map(ToString::to_string),
            "session finished"
        );
        on_event(SessionEvent::Finished(&output));
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FieldStatus;
    use crate::test_support::{ScriptedOracle, ScriptedSearch, finding, researcher};

    #[tokio::test]
    async fn confident_first_pass_finishes_without_followup() {
        let search = Arc::new(ScriptedSearch::new(vec![Ok("GA 2022-10-13".to_string())]));
        let oracle = Arc::new(ScriptedOracle::new(
            vec![Ok("PostgreSQL 15 release date".to_string())],
            vec![
                Ok(finding(FieldStatus::Verified, 95.0, Some("2022-10-13"))),
                Ok(finding(FieldStatus::Verified, 90.0, Some("2027-11-11"))),
            ],
        ));
        let researcher = researcher(search.clone(), oracle.clone());
        let mut events = Vec::new();

        let state = researcher
            .run_session(RunState::new("PostgreSQL 15"), |event| {
                events.push(match event {
                    SessionEvent::Searched(_) => "searched",
                    SessionEvent::Verified { .. } => "verified",
                    SessionEvent::Decided { .. } => "decided",
                    SessionEvent::FollowedUp(_) => "followed_up",
                    SessionEvent::Terminated(_) => "terminated",
                    SessionEvent::Finished(_) => "finished",
                });
            })
            .await
            .expect("session");

        assert_eq!(events, vec!["searched", "verified", "decided", "finished"]);
        assert_eq!(search.calls().len(), 1);
        assert_eq!(state.termination_reason(), Some(&TerminationReason::Completed));
        let output = state.output().expect("output");
        assert_eq!(output.eos_date.as_deref(), Some("2027-11-11"));
        assert_eq!(output.confidence_score, 90.0);
        assert!(output.error.is_none());
    }

    #[tokio::test]
    async fn query_generation_failure_still_yields_record() {
        let search = Arc::new(ScriptedSearch::default());
        let oracle = Arc::new(ScriptedOracle::default());
        let researcher = researcher(search.clone(), oracle.clone());
        let mut terminated = None;

        let state = researcher
            .run_session(RunState::new("PostgreSQL 15"), |event| {
                if let SessionEvent::Terminated(reason) = event {
                    terminated = Some(reason.clone());
                }
            })
            .await
            .expect("session");

        assert!(terminated.is_some_and(|reason| reason.is_error()));
        assert!(search.calls().is_empty());
        let output = state.output().expect("output");
        assert_eq!(output.active_date.as_deref(), Some("Unknown"));
        assert!(output.error.as_deref().is_some_and(|e| e.starts_with("error:")));
    }
}
