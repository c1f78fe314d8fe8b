//! Minimal client for OpenAI-compatible chat completion endpoints.
//!
//! Shared by the search collaborator (Perplexity speaks the same protocol)
//! and the oracle. Timeouts and retries for transient failures live here;
//! the research loop itself never retries.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::io::CollaboratorError;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Connection settings for one chat endpoint.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Base URL without the `/chat/completions` suffix.
    pub base_url: String,
    pub api_key: String,
    /// Azure-style deployments: sent as `api-version` and switches auth to `api-key`.
    pub api_version: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Single-turn chat request.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub temperature: Option<f64>,
    /// Ask the endpoint for a JSON object response.
    pub json_mode: bool,
}

/// Content and model reported by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    settings: ChatSettings,
}

impl ChatClient {
    pub fn new(settings: ChatSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("build http client")?;
        Ok(Self { client, settings })
    }

    /// Send the request, retrying transient failures with exponential backoff.
    #[instrument(skip_all, fields(model = request.model, json_mode = request.json_mode))]
    pub async fn complete(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<ChatCompletion, CollaboratorError> {
        let body = request_body(request);
        let mut attempt = 0u32;
        loop {
            match self.send_once(&body).await {
                Ok(completion) => return Ok(completion),
                Err(err) if err.is_transient() && attempt < self.settings.max_retries => {
                    let delay = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying chat request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(&self, body: &Value) -> Result<ChatCompletion, CollaboratorError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );
        let mut builder = self.client.post(&url).json(body);
        builder = match &self.settings.api_version {
            Some(version) => builder
                .query(&[("api-version", version.as_str())])
                .header("api-key", &self.settings.api_key),
            None => builder.bearer_auth(&self.settings.api_key),
        };

        debug!(url = %url, "sending chat completion request");
        let response = builder
            .send()
            .await
            .map_err(|e| CollaboratorError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Request(format!("read response body: {e}")))?;
        if !status.is_success() {
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_completion(&text)
    }
}

fn request_body(request: &ChatRequest<'_>) -> Value {
    let mut messages = Vec::new();
    if let Some(system) = request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": request.user}));

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if request.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

/// Extract the first choice's content from a chat completion body.
pub fn parse_completion(body: &str) -> Result<ChatCompletion, CollaboratorError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CollaboratorError::InvalidJson(e.to_string()))?;
    let content = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(CollaboratorError::EmptyCompletion)?;
    let model = value
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(ChatCompletion {
        content: content.to_string(),
        model: model.to_string(),
    })
}
