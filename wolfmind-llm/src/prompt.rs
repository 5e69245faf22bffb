//! Prompt templates for discussion statements.
//!
//! The built-in templates are compiled in. A deployment can override them
//! with a TOML file:
//!
//! ```toml
//! [prompt]
//! version = "2"
//! system = "You are {agent_name} ..."
//! user = "Day {day} ..."
//! ```

use std::path::Path;

use serde::Deserialize;
use wolfmind_core::config::LlmConfig;
use wolfmind_core::{AgentState, Phase, Role, VisibleState};

use crate::error::LlmError;
use crate::types::LlmRequest;

/// Persona prompt for a discussion statement.
pub const STATEMENT_SYSTEM: &str = r"You are {agent_name}, a player in a game of Werewolf.
Your secret role: {role}. {role_goal}
Your personality: {personality}.
Your current mood: anger {anger}, fear {fear}, confidence {confidence}.

RULES:
- Speak as {agent_name}, in the first person. Never reveal that you are an AI.
- Never state your role outright.
- One or two short sentences. No stage directions, no quotation marks.";

/// Situation prompt for a discussion statement.
pub const STATEMENT_USER: &str = r"It is day {day}, during the {phase}.
Players still alive: {alive}.
The human player is {human_player}.

The people you suspect most:
{suspicions}

Say what you want to say to the group now.";

/// Render `{key}` placeholders. Unknown placeholders are left as-is.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// Prompt set
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlPromptFile {
    prompt: PromptSet,
}

/// The system and user templates used for statements.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSet {
    /// Template version tag, for logs.
    #[serde(default = "default_version")]
    pub version: String,
    /// System prompt template.
    pub system: String,
    /// User prompt template.
    pub user: String,
}

impl PromptSet {
    /// The compiled-in templates.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            version: default_version(),
            system: STATEMENT_SYSTEM.to_string(),
            user: STATEMENT_USER.to_string(),
        }
    }

    /// Load templates from a TOML file with a `[prompt]` table.
    ///
    /// # Errors
    /// `LlmError::ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LlmError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
        let parsed: TomlPromptFile = toml::from_str(&content)
            .map_err(|e| LlmError::ConfigError(format!("failed to parse {}: {e}", path.display())))?;
        Ok(parsed.prompt)
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn default_version() -> String {
    "builtin".to_string()
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Human-readable phase name for prompts.
#[must_use]
pub fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::DayDiscussion => "discussion",
        Phase::Voting => "vote",
        Phase::NightAction => "night",
        Phase::GameOver => "end of the game",
    }
}

/// Bullet list of the agent's three strongest suspicions.
#[must_use]
pub fn format_suspicions(agent: &AgentState) -> String {
    let top = agent.top_suspicions(3);
    if top.is_empty() {
        return "- nobody in particular yet".to_string();
    }
    top.iter()
        .map(|(name, score)| format!("- {name} ({score:.2})"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the statement prompts for `agent` and wrap them in a request.
#[must_use]
pub fn build_statement_request(
    agent: &AgentState,
    visible: &VisibleState,
    prompts: &PromptSet,
    config: &LlmConfig,
) -> LlmRequest {
    let emotions = agent.emotions();
    let (anger, fear, confidence) = (
        format!("{:.2}", emotions.anger()),
        format!("{:.2}", emotions.fear()),
        format!("{:.2}", emotions.confidence()),
    );
    let role_goal = match agent.role() {
        Role::Wolf => "Stay hidden and steer suspicion onto the villagers.",
        Role::Villager => "Find the wolf and convince the others to vote it out.",
    };
    let role = agent.role().to_string();
    let day = visible.day.to_string();
    let alive = visible.alive.join(", ");
    let human = visible.human_player.as_deref().unwrap_or("nobody");
    let suspicions = format_suspicions(agent);

    let vars: [(&str, &str); 12] = [
        ("agent_name", agent.name()),
        ("role", role.as_str()),
        ("role_goal", role_goal),
        ("personality", agent.personality()),
        ("anger", anger.as_str()),
        ("fear", fear.as_str()),
        ("confidence", confidence.as_str()),
        ("day", day.as_str()),
        ("phase", phase_label(visible.phase)),
        ("alive", alive.as_str()),
        ("human_player", human),
        ("suspicions", suspicions.as_str()),
    ];

    LlmRequest::statement(
        render_template(&prompts.system, &vars),
        render_template(&prompts.user, &vars),
    )
    .with_limits(config)
}
