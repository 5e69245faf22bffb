//! Discussion statements: LLM first, rule-based fallback always.
//!
//! Generation never fails from the game's point of view. Any LLM error,
//! timeout or empty answer is logged and replaced by a templated line built
//! from the agent's role and its most suspected target.

use async_trait::async_trait;
use tracing::{debug, warn};
use wolfmind_core::config::LlmConfig;
use wolfmind_core::{AgentState, Role, VisibleState};

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::prompt::{PromptSet, build_statement_request};

/// Produces the text an AI agent says during discussion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A non-empty statement for `agent` given what it can see.
    async fn generate_statement(&self, agent: &AgentState, visible: &VisibleState) -> String;
}

/// LLM-backed generator with a deterministic fallback.
pub struct StatementGenerator {
    client: LlmClient,
    prompts: PromptSet,
    config: LlmConfig,
}

impl StatementGenerator {
    /// Create a generator.
    #[must_use]
    pub fn new(client: LlmClient, prompts: PromptSet, config: LlmConfig) -> Self {
        Self {
            client,
            prompts,
            config,
        }
    }

    /// Client from `[llm]` (API key read from the environment) with the
    /// built-in prompts.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(LlmClient::from_config(config), PromptSet::builtin(), config.clone())
    }

    /// A generator that only ever uses the fallback.
    #[must_use]
    pub fn rule_based() -> Self {
        Self::new(LlmClient::none(), PromptSet::builtin(), LlmConfig::default())
    }

    /// Whether an LLM backend is configured.
    #[must_use]
    pub fn uses_llm(&self) -> bool {
        self.client.is_available()
    }

    /// The cleaned LLM statement, without fallback.
    ///
    /// # Errors
    /// The client's error, or `EmptyResponse` if nothing is left after
    /// trimming whitespace and quotes.
    pub async fn llm_statement(&self, agent: &AgentState, visible: &VisibleState) -> Result<String, LlmError> {
        let request = build_statement_request(agent, visible, &self.prompts, &self.config);
        let response = self.client.generate(&request).await?;
        let text = clean_statement(&response.text);
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        debug!(
            agent = agent.name(),
            latency_ms = response.latency_ms,
            tokens = response.tokens_generated,
            "LLM statement generated"
        );
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for StatementGenerator {
    async fn generate_statement(&self, agent: &AgentState, visible: &VisibleState) -> String {
        if !self.client.is_available() {
            return fallback_statement(agent, visible);
        }

        match self.llm_statement(agent, visible).await {
            Ok(text) => text,
            Err(e) => {
                warn!(agent = agent.name(), error = %e, "LLM statement failed; using fallback");
                fallback_statement(agent, visible)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

const WOLF_TEMPLATES: [&str; 3] = [
    "I find {target}'s behaviour really suspicious. We should keep a close eye on them.",
    "What is {target} hiding? Did anyone else notice how they talked?",
    "I say we vote for {target} today. My gut tells me something is off.",
];

const VILLAGER_TEMPLATES: [&str; 3] = [
    "{target} has barely said anything today, and that makes me uneasy.",
    "Did anyone else notice how strangely {target} reacted?",
    "Does anyone else feel that something is wrong with {target}?",
];

/// Rule-based statement: a role-specific template aimed at the agent's top
/// suspect ("everyone" if it has none), picked by day.
#[must_use]
pub fn fallback_statement(agent: &AgentState, visible: &VisibleState) -> String {
    let target = agent.top_suspect().unwrap_or_else(|| "everyone".to_string());
    let templates = match agent.role() {
        Role::Wolf => &WOLF_TEMPLATES,
        Role::Villager => &VILLAGER_TEMPLATES,
    };
    let idx = visible.day.saturating_sub(1) as usize % templates.len();
    templates[idx].replace("{target}", &target)
}

/// Trim whitespace and one layer of wrapping quotes.
fn clean_statement(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use wolfmind_core::Phase;

    fn visible(day: u32) -> VisibleState {
        VisibleState {
            phase: Phase::DayDiscussion,
            day,
            human_player: Some("Player".into()),
            alive: vec!["Alice".into(), "Bob".into()],
        }
    }

    #[test]
    fn fallback_targets_top_suspect() {
        let mut agent = AgentState::new("Alice", Role::Villager, "");
        agent.set_suspicion("Alice", 0.9);
        agent.set_suspicion("Bob", 0.4);
        agent.set_suspicion("Charlie", 0.6);
        let line = fallback_statement(&agent, &visible(1));
        assert!(line.contains("Charlie"));
        assert!(!line.contains("Alice"));
    }

    #[test]
    fn fallback_without_suspicions_addresses_everyone() {
        let agent = AgentState::new("Alice", Role::Wolf, "");
        let line = fallback_statement(&agent, &visible(1));
        assert!(line.contains("everyone"));
    }

    #[test]
    fn fallback_differs_by_role_and_day() {
        let mut wolf = AgentState::new("W", Role::Wolf, "");
        wolf.set_suspicion("Bob", 0.5);
        let mut villager = AgentState::new("V", Role::Villager, "");
        villager.set_suspicion("Bob", 0.5);

        assert_ne!(fallback_statement(&wolf, &visible(1)), fallback_statement(&villager, &visible(1)));
        assert_ne!(fallback_statement(&wolf, &visible(1)), fallback_statement(&wolf, &visible(2)));
        assert_eq!(fallback_statement(&wolf, &visible(1)), fallback_statement(&wolf, &visible(4)));
    }

    #[test]
    fn clean_strips_quotes_and_space() {
        assert_eq!(clean_statement("  \"Bob is lying.\" \n"), "Bob is lying.");
        assert_eq!(clean_statement("   "), "");
        assert_eq!(clean_statement("\"unbalanced"), "\"unbalanced");
    }

    #[tokio::test]
    async fn rule_based_generator_never_returns_empty() {
        let generator = StatementGenerator::rule_based();
        assert!(!generator.uses_llm());
        let mut agent = AgentState::new("Alice", Role::Villager, "");
        agent.set_suspicion("Bob", 0.3);
        let line = generator.generate_statement(&agent, &visible(3)).await;
        assert!(!line.is_empty());
        assert!(line.contains("Bob"));
    }

    fn ollama_generator(base_url: String) -> StatementGenerator {
        let client = LlmClient::new(crate::client::LlmProvider::Ollama { base_url }, "test-model", 0);
        StatementGenerator::new(client, PromptSet::builtin(), LlmConfig::default())
    }

    #[tokio::test]
    async fn llm_statement_is_cleaned() {
        let base_url = test_server::respond_once(r#"{"response":" \"Bob is lying.\" "}"#).await;
        let generator = ollama_generator(base_url);
        let agent = AgentState::new("Alice", Role::Villager, "");
        let line = generator.generate_statement(&agent, &visible(1)).await;
        assert_eq!(line, "Bob is lying.");
    }

    #[tokio::test]
    async fn quotes_only_answer_is_empty_and_falls_back() {
        let agent = AgentState::new("Alice", Role::Wolf, "");

        let base_url = test_server::respond_once(r#"{"response":"\"\""}"#).await;
        let err = ollama_generator(base_url).llm_statement(&agent, &visible(2)).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));

        let base_url = test_server::respond_once(r#"{"response":"\"\""}"#).await;
        let line = ollama_generator(base_url).generate_statement(&agent, &visible(2)).await;
        assert_eq!(line, fallback_statement(&agent, &visible(2)));
    }
}
