//! Search collaborator abstraction and its Perplexity-backed implementation.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::core::types::{SearchMode, SearchResponse};
use crate::io::CollaboratorError;
use crate::io::chat::{ChatClient, ChatRequest};
use crate::io::prompt::PromptSet;

/// Abstraction over web search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query` in the given tier. Any failure ends the calling session.
    async fn search(&self, query: &str, mode: SearchMode)
    -> Result<SearchResponse, CollaboratorError>;
}

/// Model and system prompt used for one search tier.
#[derive(Debug, Clone)]
pub struct SearchTier {
    pub model: String,
    pub system_prompt: String,
}

/// Search through Perplexity's chat completion API.
pub struct PerplexitySearch {
    chat: ChatClient,
    fast: SearchTier,
    deep: SearchTier,
}

impl PerplexitySearch {
    pub fn new(chat: ChatClient, fast: SearchTier, deep: SearchTier) -> Self {
        Self { chat, fast, deep }
    }

    /// Build both tiers from model names and the prompt set's system prompts.
    pub fn with_prompts(
        chat: ChatClient,
        prompts: &PromptSet,
        fast_model: &str,
        deep_model: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            chat,
            SearchTier {
                model: fast_model.to_string(),
                system_prompt: prompts.search_system(SearchMode::Fast)?,
            },
            SearchTier {
                model: deep_model.to_string(),
                system_prompt: prompts.search_system(SearchMode::Deep)?,
            },
        ))
    }

    fn tier(&self, mode: SearchMode) -> &SearchTier {
        match mode {
            SearchMode::Fast => &self.fast,
            SearchMode::Deep => &self.deep,
        }
    }
}

#[async_trait]
impl SearchProvider for PerplexitySearch {
    #[instrument(skip_all, fields(mode = mode.as_str()))]
    async fn search(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> Result<SearchResponse, CollaboratorError> {
        let tier = self.tier(mode);
        let completion = self
            .chat
            .complete(&ChatRequest {
                model: &tier.model,
                system: Some(&tier.system_prompt),
                user: query,
                temperature: None,
                json_mode: false,
            })
            .await?;
        let model = if completion.model.is_empty() {
            tier.model.clone()
        } else {
            completion.model
        };
        info!(query, model = %model, "search completed");
        Ok(SearchResponse {
            raw_content: completion.content,
            model,
            query: query.to_string(),
        })
    }
}
