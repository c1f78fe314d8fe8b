//! Targeted deep-mode follow-up search.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::core::query::followup_focus;
use crate::core::run_state::{ContractViolation, RunState};
use crate::core::types::SearchMode;
use crate::io::CollaboratorError;
use crate::io::prompt::PromptSet;
use crate::io::search::SearchProvider;
use crate::steps::search_attempt;

pub struct FollowupStep {
    search: Arc<dyn SearchProvider>,
    prompts: PromptSet,
}

impl FollowupStep {
    pub fn new(search: Arc<dyn SearchProvider>, prompts: PromptSet) -> Self {
        Self { search, prompts }
    }

    /// Search again in deep mode, narrowed to EOS when only EOS is missing.
    ///
    /// Follow-up queries are not checked against the history.
    #[instrument(skip_all, fields(component = state.component()))]
    pub async fn run(&self, state: &mut RunState) -> Result<(), ContractViolation> {
        state.ensure_running()?;
        let focus = followup_focus(state.current_result());
        let query = match self.prompts.followup_query(focus, state.component()) {
            Ok(query) => query,
            Err(err) => {
                let err = CollaboratorError::Prompt(format!("{err:#}"));
                warn!(error = %err, "follow-up query rendering failed");
                state.record_failure(err.to_string());
                return Ok(());
            }
        };

        match self.search.search(&query, SearchMode::Deep).await {
            Ok(response) => {
                info!(query = %query, ?focus, model = %response.model, "follow-up search recorded");
                state.record_attempt(search_attempt(query, SearchMode::Deep, response));
            }
            Err(err) => {
                warn!(query = %query, error = %err, "follow-up search failed");
                state.record_failure(err.to_string());
            }
        }
        Ok(())
    }
}
