//! Terminal projection of a session into its externally visible record.

use serde::{Deserialize, Serialize};

use crate::core::run_state::RunState;
use crate::core::types::{FieldStatus, SourceAttribution, TerminationReason};

/// Placeholder date reported when verification never produced a result.
pub const UNKNOWN_DATE: &str = "Unknown";

const NO_RESULT_ERROR: &str = "Unable to extract reliable information from search results";

/// Cited sources grouped by the field they support.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSources {
    pub active_date_sources: Vec<SourceAttribution>,
    pub eos_date_sources: Vec<SourceAttribution>,
}

/// Per-component result record consumed by export and evaluation.
///
/// `active_date` and `eos_date` are always present in the serialized form,
/// as `null` when a successful verification could not determine them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub component: String,
    pub active_date: Option<String>,
    pub eos_date: Option<String>,
    pub confidence_score: f64,
    pub confidence_active: f64,
    pub confidence_eos: f64,
    pub status_active: FieldStatus,
    pub status_eos: FieldStatus,
    pub sources: ResultSources,
    pub notes_active: String,
    pub notes_eos: String,
    pub iteration_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build the result record for `state` without touching it.
pub fn project(state: &RunState) -> ComponentResult {
    let termination_error = match state.termination_reason() {
        None | Some(TerminationReason::Completed) => None,
        Some(reason) => Some(reason.to_string()),
    };

    let Some(current) = state.current_result() else {
        return ComponentResult {
            component: state.component().to_string(),
            active_date: Some(UNKNOWN_DATE.to_string()),
            eos_date: Some(UNKNOWN_DATE.to_string()),
            confidence_score: 0.0,
            confidence_active: 0.0,
            confidence_eos: 0.0,
            status_active: FieldStatus::NotFound,
            status_eos: FieldStatus::NotFound,
            sources: ResultSources::default(),
            notes_active: String::new(),
            notes_eos: String::new(),
            iteration_count: state.iteration_count(),
            error: Some(termination_error.unwrap_or_else(|| NO_RESULT_ERROR.to_string())),
        };
    };

    ComponentResult {
        component: state.component().to_string(),
        active_date: current.active.date.clone(),
        eos_date: current.eos.date.clone(),
        confidence_score: state.confidence_score(),
        confidence_active: current.active.confidence,
        confidence_eos: current.eos.confidence,
        status_active: current.active.status,
        status_eos: current.eos.status,
        sources: ResultSources {
            active_date_sources: current.active.sources.clone(),
            eos_date_sources: current.eos.sources.clone(),
        },
        notes_active: current.active.notes.clone(),
        notes_eos: current.eos.notes.clone(),
        iteration_count: state.iteration_count(),
        error: termination_error,
    }
}

/// OutputStep: store the projection and mark the session completed.
///
/// The completion reason is only recorded when no earlier reason exists, so
/// error and duplicate terminations survive into the final state while still
/// yielding a well-formed record.
pub fn finalize(state: &mut RunState) -> ComponentResult {
    let output = project(state);
    state.set_output(output.clone());
    state.terminate(TerminationReason::Completed);
    output
}
