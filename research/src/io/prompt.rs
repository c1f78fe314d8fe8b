//! Prompt templates for the research collaborators.
//!
//! Templates are embedded at compile time and rendered with minijinja. A
//! [`PromptSet`] is built once and handed to the steps and the search client
//! as a plain immutable value.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::query::FollowupFocus;
use crate::core::types::{LifecycleField, SearchMode};

const QUERY_GENERATION_TEMPLATE: &str = include_str!("prompts/query_generation.md");
const VERIFICATION_ACTIVE_TEMPLATE: &str = include_str!("prompts/verification_active.md");
const VERIFICATION_EOS_TEMPLATE: &str = include_str!("prompts/verification_eos.md");
const SEARCH_FAST_SYSTEM_TEMPLATE: &str = include_str!("prompts/search_fast_system.md");
const SEARCH_DEEP_SYSTEM_TEMPLATE: &str = include_str!("prompts/search_deep_system.md");
const FOLLOWUP_EOS_TEMPLATE: &str = include_str!("prompts/followup_eos.txt");
const FOLLOWUP_LIFECYCLE_TEMPLATE: &str = include_str!("prompts/followup_lifecycle.txt");

/// Compiled prompt templates.
#[derive(Clone)]
pub struct PromptSet {
    env: Environment<'static>,
}

impl PromptSet {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in [
            ("query_generation", QUERY_GENERATION_TEMPLATE),
            ("verification_active", VERIFICATION_ACTIVE_TEMPLATE),
            ("verification_eos", VERIFICATION_EOS_TEMPLATE),
            ("search_fast_system", SEARCH_FAST_SYSTEM_TEMPLATE),
            ("search_deep_system", SEARCH_DEEP_SYSTEM_TEMPLATE),
            ("followup_eos", FOLLOWUP_EOS_TEMPLATE),
            ("followup_lifecycle", FOLLOWUP_LIFECYCLE_TEMPLATE),
        ] {
            env.add_template(name, source)
                .with_context(|| format!("compile prompt template {name}"))?;
        }
        Ok(Self { env })
    }

    /// Prompt asking the oracle for a single search query.
    pub fn query_generation(&self, component: &str) -> Result<String> {
        self.render("query_generation", context! { component => component })
    }

    /// Field-specific extraction prompt over raw search content.
    pub fn verification(
        &self,
        field: LifecycleField,
        component: &str,
        raw_content: &str,
    ) -> Result<String> {
        let name = match field {
            LifecycleField::Active => "verification_active",
            LifecycleField::Eos => "verification_eos",
        };
        self.render(
            name,
            context! { component => component, raw_content => raw_content },
        )
    }

    /// System prompt for the search collaborator in the given mode.
    pub fn search_system(&self, mode: SearchMode) -> Result<String> {
        let name = match mode {
            SearchMode::Fast => "search_fast_system",
            SearchMode::Deep => "search_deep_system",
        };
        self.render(name, context! {})
    }

    /// Deterministic follow-up query for `component`.
    pub fn followup_query(&self, focus: FollowupFocus, component: &str) -> Result<String> {
        let name = match focus {
            FollowupFocus::EndOfSupport => "followup_eos",
            FollowupFocus::Lifecycle => "followup_lifecycle",
        };
        let rendered = self.render(name, context! { component => component })?;
        Ok(rendered.trim().to_string())
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .with_context(|| format!("load prompt template {name}"))?;
        template
            .render(ctx)
            .with_context(|| format!("render prompt template {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> PromptSet {
        PromptSet::new().expect("templates compile")
    }

    #[test]
    fn followup_queries_are_single_line() {
        let prompts = prompts();
        assert_eq!(
            prompts
                .followup_query(FollowupFocus::EndOfSupport, "Redis 7.0")
                .expect("render"),
            "Redis 7.0 \"end of support\" OR \"EOL\" OR \"end of life\""
        );
        assert_eq!(
            prompts
                .followup_query(FollowupFocus::Lifecycle, "Redis 7.0")
                .expect("render"),
            "Redis 7.0 lifecycle support dates"
        );
    }

    #[test]
    fn verification_prompts_embed_content_verbatim() {
        let prompts = prompts();
        let raw = "Released <b>2022-04-27</b> & supported until 2025";
        let active = prompts
            .verification(LifecycleField::Active, "Redis 7.0", raw)
            .expect("render");
        assert!(active.contains(raw));
        assert!(active.contains("status_active"));

        let eos = prompts
            .verification(LifecycleField::Eos, "Redis 7.0", raw)
            .expect("render");
        assert!(eos.contains("\"derived\""));
        assert!(eos.contains("confidence_eos"));
    }

    #[test]
    fn search_system_prompts_differ_by_mode() {
        let prompts = prompts();
        let fast = prompts.search_system(SearchMode::Fast).expect("render");
        let deep = prompts.search_system(SearchMode::Deep).expect("render");
        assert_ne!(fast, deep);
    }

    #[test]
    fn query_generation_mentions_component() {
        let prompt = prompts().query_generation("PostgreSQL 15").expect("render");
        assert!(prompt.contains("Component: PostgreSQL 15"));
    }
}
