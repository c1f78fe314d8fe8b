//! Search query normalization and follow-up targeting.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{FieldStatus, VerificationResult};

static QUERY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^query\s*:\s*").expect("query label regex is valid"));

/// Normalize free-text model output into a single search query.
///
/// Keeps the first line only, drops a leading `Query:` label and strips
/// surrounding quotation marks.
pub fn normalize_query(raw: &str) -> String {
    let first_line = raw.trim().lines().next().unwrap_or_default().trim();
    let unquoted = strip_quotes(first_line);
    let unlabeled = QUERY_LABEL_RE.replace(unquoted, "");
    strip_quotes(unlabeled.trim()).trim().to_string()
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// What a follow-up search should concentrate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowupFocus {
    /// Active date is settled; look for end-of-support evidence only.
    EndOfSupport,
    /// Look for lifecycle dates in general.
    Lifecycle,
}

/// Pick the follow-up focus from the latest verification outcome.
pub fn followup_focus(result: Option<&VerificationResult>) -> FollowupFocus {
    match result {
        Some(r)
            if r.active.status == FieldStatus::Verified
                && r.eos.status != FieldStatus::Verified =>
        {
            FollowupFocus::EndOfSupport
        }
        _ => FollowupFocus::Lifecycle,
    }
}
