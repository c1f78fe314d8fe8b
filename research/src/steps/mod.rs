//! Research steps: each one transforms a [`RunState`] through collaborator calls.
//!
//! Steps never talk to each other. Collaborator failures are recorded on the
//! state as an `error:<message>` termination; only contract violations are
//! returned as errors.
//!
//! [`RunState`]: crate::core::run_state::RunState

pub mod followup;
pub mod search;
pub mod verification;

use crate::core::types::{SearchAttempt, SearchMode, SearchResponse};

pub use followup::FollowupStep;
pub use search::SearchStep;
pub use verification::VerificationStep;

/// History entry for a successful search of `query`.
fn search_attempt(query: String, mode: SearchMode, response: SearchResponse) -> SearchAttempt {
    SearchAttempt {
        query,
        mode,
        raw_content: response.raw_content,
        model_used: response.model,
    }
}
