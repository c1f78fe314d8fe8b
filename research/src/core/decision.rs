//! Confidence-gated continue/finish decision.

use crate::core::policy::ResearchPolicy;
use crate::core::types::{Decision, FieldStatus, VerificationResult};

/// The active date is directly verified with enough confidence.
pub fn active_ok(result: &VerificationResult, policy: &ResearchPolicy) -> bool {
    result.active.status == FieldStatus::Verified
        && result.active.confidence >= policy.active_confidence_threshold
}

/// The EOS date is verified or derived with enough confidence, or does not apply.
pub fn eos_ok(result: &VerificationResult, policy: &ResearchPolicy) -> bool {
    match result.eos.status {
        FieldStatus::NotApplicable => true,
        FieldStatus::Verified | FieldStatus::Derived => {
            result.eos.confidence >= policy.eos_confidence_threshold
        }
        FieldStatus::Ambiguous | FieldStatus::NotFound => false,
    }
}

/// Decide whether the session has enough evidence to stop.
///
/// Pure: reads only its arguments. The iteration cap is a hard stop that
/// applies regardless of confidence; a missing result never satisfies the
/// confidence gate.
pub fn decide(
    result: Option<&VerificationResult>,
    iteration_count: u32,
    policy: &ResearchPolicy,
) -> Decision {
    let confident = result.is_some_and(|r| active_ok(r, policy) && eos_ok(r, policy));
    if confident || iteration_count >= policy.iteration_cap {
        Decision::Finish
    } else {
        Decision::Continue
    }
}
