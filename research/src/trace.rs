//! Console rendering of session events for `research trace`.

use std::fmt::Write as _;

use crate::core::types::{Decision, FieldFinding, SearchAttempt};
use crate::session::SessionEvent;

const WIDTH: usize = 78;
const CONTENT_PREVIEW_CHARS: usize = 800;

/// Banner printed before a component's events.
pub fn render_header(component: &str, index: usize, total: usize) -> String {
    let rule = "=".repeat(WIDTH);
    format!("{rule}\n [{}/{total}] {component} \n{rule}\n", index + 1)
}

/// Render one event as a boxed section.
pub fn render_event(event: &SessionEvent<'_>) -> String {
    match event {
        SessionEvent::Searched(attempt) => boxed("SEARCH", &search_lines(attempt)),
        SessionEvent::FollowedUp(attempt) => boxed("FOLLOW-UP", &search_lines(attempt)),
        SessionEvent::Verified {
            result,
            confidence_score,
            verified_sources,
            failed_sources,
        } => {
            let mut lines = field_lines("active", &result.active);
            lines.extend(field_lines("eos", &result.eos));
            lines.push(format!(
                "sources: {verified_sources} verified, {failed_sources} failed"
            ));
            lines.push(format!("confidence score: {confidence_score:.1}"));
            boxed("VERIFICATION", &lines)
        }
        SessionEvent::Decided {
            decision,
            iteration_count,
        } => {
            let verdict = match decision {
                Decision::Finish => "finish",
                Decision::Continue => "continue",
            };
            boxed(
                "DECISION",
                &[
                    format!("verdict: {verdict}"),
                    format!("iterations: {iteration_count}"),
                ],
            )
        }
        SessionEvent::Terminated(reason) => boxed("TERMINATED", &[reason.to_string()]),
        SessionEvent::Finished(output) => {
            let lines: Vec<String> = match serde_json::to_string_pretty(output) {
                Ok(json) => json.lines().map(str::to_string).collect(),
                Err(err) => vec![format!("<unserializable output: {err}>")],
            };
            boxed("OUTPUT", &lines)
        }
    }
}

fn search_lines(attempt: &SearchAttempt) -> Vec<String> {
    let mut lines = vec![
        format!("query: {}", attempt.query),
        format!("mode: {}", attempt.mode.as_str()),
        format!("model: {}", attempt.model_used),
        "content:".to_string(),
    ];
    lines.extend(
        preview(&attempt.raw_content)
            .lines()
            .map(|line| format!("  {line}")),
    );
    lines
}

fn field_lines(name: &str, finding: &FieldFinding) -> Vec<String> {
    vec![
        format!(
            "{name}: {} ({}, confidence {:.1})",
            finding.date.as_deref().unwrap_or("-"),
            finding.status,
            finding.confidence
        ),
        format!("  notes: {}", finding.notes),
    ]
}

fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(CONTENT_PREVIEW_CHARS).collect();
    if content.chars().count() > CONTENT_PREVIEW_CHARS {
        out.push_str(" ...");
    }
    out
}

fn boxed(title: &str, lines: &[String]) -> String {
    let mut out = String::new();
    let head = format!("┌─ {title} ");
    let fill = WIDTH.saturating_sub(head.chars().count());
    let _ = writeln!(out, "{head}{}", "─".repeat(fill));
    for line in lines {
        let _ = writeln!(out, "│ {line}");
    }
    let _ = writeln!(out, "└{}", "─".repeat(WIDTH - 1));
    out
}
