//! Initial fast search with the duplicate-query guard.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::core::query::normalize_query;
use crate::core::run_state::{ContractViolation, RunState};
use crate::core::types::{SearchMode, TerminationReason};
use crate::io::CollaboratorError;
use crate::io::oracle::{Oracle, QueryRequest};
use crate::io::prompt::PromptSet;
use crate::io::search::SearchProvider;
use crate::steps::search_attempt;

pub struct SearchStep {
    oracle: Arc<dyn Oracle>,
    search: Arc<dyn SearchProvider>,
    prompts: PromptSet,
}

impl SearchStep {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        search: Arc<dyn SearchProvider>,
        prompts: PromptSet,
    ) -> Self {
        Self {
            oracle,
            search,
            prompts,
        }
    }

    /// Generate one query for the component and run it in fast mode.
    ///
    /// A query already present in the history terminates the session with
    /// `duplicate_search` without searching or counting an iteration. Failed
    /// query generation or search terminates with `error:<message>` and
    /// counts the iteration.
    #[instrument(skip_all, fields(component = state.component()))]
    pub async fn run(&self, state: &mut RunState) -> Result<(), ContractViolation> {
        state.ensure_running()?;

        let query = match self.generate_query(state.component()).await {
            Ok(query) => query,
            Err(err) => {
                warn!(error = %err, "query generation failed");
                state.record_failure(err.to_string());
                return Ok(());
            }
        };

        if state.has_query(&query) {
            warn!(query = %query, "query already searched");
            state.terminate(TerminationReason::DuplicateSearch);
            return Ok(());
        }

        match self.search.search(&query, SearchMode::Fast).await {
            Ok(response) => {
                info!(query = %query, model = %response.model, "initial search recorded");
                state.record_attempt(search_attempt(query, SearchMode::Fast, response));
            }
            Err(err) => {
                warn!(query = %query, error = %err, "initial search failed");
                state.record_failure(err.to_string());
            }
        }
        Ok(())
    }

    async fn generate_query(&self, component: &str) -> Result<String, CollaboratorError> {
        let prompt = self
            .prompts
            .query_generation(component)
            .map_err(|err| CollaboratorError::Prompt(format!("{err:#}")))?;
        let raw = self
            .oracle
            .generate_query(&QueryRequest { component, prompt })
            .await?;
        let query = normalize_query(&raw);
        if query.is_empty() {
            return Err(CollaboratorError::EmptyCompletion);
        }
        Ok(query)
    }
}
