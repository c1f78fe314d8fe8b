//! Side-effecting operations: HTTP collaborators, prompts, config, files.

use thiserror::Error;

pub mod chat;
pub mod components;
pub mod config;
pub mod export;
pub mod oracle;
pub mod prompt;
pub mod search;

/// Failure reported by a search or oracle collaborator.
///
/// The `Display` text becomes the message of an `error:<message>`
/// termination reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("schema validation failed: {0}")]
    Schema(String),
    #[error("empty completion")]
    EmptyCompletion,
    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

impl CollaboratorError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CollaboratorError::Request(_) => true,
            CollaboratorError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
