//! Configuration for WOLFMIND games.
//!
//! Maps directly to `wolfmind.toml`. Every field has a default, so an empty
//! document is a valid configuration. The core never reads the environment;
//! the LLM layer resolves `llm.api_key_env` by name.

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Top-level WOLFMIND configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WolfmindConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Roster composition.
    #[serde(default)]
    pub roster: RosterConfig,
    /// Vote and night-kill scoring weights.
    #[serde(default)]
    pub decision: DecisionConfig,
    /// Discussion-phase propagation tuning.
    #[serde(default)]
    pub discussion: DiscussionConfig,
    /// Fixed impacts of voting, elimination and night kills.
    #[serde(default)]
    pub events: EventImpactConfig,
    /// Game rules.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Per-agent memory log limits.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// LLM integration settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Host loop and registry settings.
    #[serde(default)]
    pub host: HostConfig,
}

impl WolfmindConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `GameError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| GameError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    /// Returns `GameError::Config` describing the first violated constraint.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.roster.validate()?;

        let d = &self.discussion;
        if d.accusation_impact_min > d.accusation_impact_max {
            return Err(GameError::Config(
                "discussion.accusation_impact_min exceeds accusation_impact_max".into(),
            ));
        }
        if d.rumor_impact_min > d.rumor_impact_max {
            return Err(GameError::Config(
                "discussion.rumor_impact_min exceeds rumor_impact_max".into(),
            ));
        }
        if !(0.0..=1.0).contains(&d.rumor_probability) {
            return Err(GameError::Config(format!(
                "discussion.rumor_probability must be in [0, 1], got {}",
                d.rumor_probability
            )));
        }
        if self.decision.vote_perturbation < 0.0 || self.decision.night_perturbation < 0.0 {
            return Err(GameError::Config("decision perturbation bounds must be >= 0".into()));
        }
        if self.rules.max_days == 0 {
            return Err(GameError::Config("rules.max_days must be at least 1".into()));
        }
        if self.memory.retain_len == 0 || self.memory.retain_len > self.memory.max_log_len {
            return Err(GameError::Config(format!(
                "memory.retain_len must be in 1..={}, got {}",
                self.memory.max_log_len, self.memory.retain_len
            )));
        }
        if self.host.max_games == 0 {
            return Err(GameError::Config("host.max_games must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is unset: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of the human-readable format.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Who sits at the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Names of the AI agents, in seating order.
    #[serde(default = "default_ai_names")]
    pub ai_names: Vec<String>,
    /// Personality descriptors, paired with `ai_names` by index (cycled if shorter).
    #[serde(default = "default_personalities")]
    pub personalities: Vec<String>,
    /// Default name of the human agent. Overridable per game.
    #[serde(default = "default_human_name")]
    pub human_name: String,
    /// How many of the AI agents are wolves.
    #[serde(default = "default_1_usize")]
    pub wolf_count: usize,
}

impl RosterConfig {
    /// Personality for the AI agent at `index`.
    #[must_use]
    pub fn personality_for(&self, index: usize) -> &str {
        if self.personalities.is_empty() {
            ""
        } else {
            &self.personalities[index % self.personalities.len()]
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.ai_names.len() < 2 {
            return Err(GameError::Config("roster.ai_names needs at least 2 agents".into()));
        }
        if self.wolf_count == 0 || self.wolf_count >= self.ai_names.len() {
            return Err(GameError::Config(format!(
                "roster.wolf_count must be in 1..{}, got {}",
                self.ai_names.len(),
                self.wolf_count
            )));
        }
        // The human is the extra villager.
        let villagers = self.ai_names.len() - self.wolf_count + 1;
        if self.wolf_count >= villagers {
            return Err(GameError::Config(format!(
                "roster.wolf_count {} would start at wolf parity with {} villagers",
                self.wolf_count, villagers
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for name in self.ai_names.iter().chain(std::iter::once(&self.human_name)) {
            if name.trim().is_empty() {
                return Err(GameError::Config("roster names must be non-empty".into()));
            }
            if !seen.insert(name.as_str()) {
                return Err(GameError::Config(format!("duplicate roster name: {name}")));
            }
        }
        Ok(())
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            ai_names: default_ai_names(),
            personalities: default_personalities(),
            human_name: default_human_name(),
            wolf_count: 1,
        }
    }
}

/// Scoring weights for `DecisionEngine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Weight of suspicion toward a vote candidate.
    #[serde(default = "default_1_5")]
    pub suspicion_weight: f32,
    /// Weight of trust toward a vote candidate (subtracted).
    #[serde(default = "default_1_0")]
    pub trust_weight: f32,
    /// Weight of the voter's own anger (added to every candidate).
    #[serde(default = "default_0_5")]
    pub anger_bias: f32,
    /// Half-width of the uniform vote perturbation.
    #[serde(default = "default_0_1")]
    pub vote_perturbation: f32,
    /// Score used for a candidate the voter holds no opinion on.
    #[serde(default = "default_0_3")]
    pub unseen_score: f32,
    /// Weight of trust in the night-kill score (subtracted).
    #[serde(default = "default_2_0")]
    pub night_trust_weight: f32,
    /// Suspicion above which a night candidate gets the bonus.
    #[serde(default = "default_0_5")]
    pub night_suspicion_threshold: f32,
    /// Bonus for a suspicious night candidate.
    #[serde(default = "default_0_5")]
    pub night_suspicion_bonus: f32,
    /// Half-width of the uniform night perturbation.
    #[serde(default = "default_0_2")]
    pub night_perturbation: f32,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            suspicion_weight: 1.5,
            trust_weight: 1.0,
            anger_bias: 0.5,
            vote_perturbation: 0.1,
            unseen_score: 0.3,
            night_trust_weight: 2.0,
            night_suspicion_threshold: 0.5,
            night_suspicion_bonus: 0.5,
            night_perturbation: 0.2,
        }
    }
}

/// Discussion-phase propagation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionConfig {
    /// Lower bound of the impact drawn per name mention.
    #[serde(default = "default_0_1")]
    pub accusation_impact_min: f32,
    /// Upper bound of the impact drawn per name mention.
    #[serde(default = "default_0_3")]
    pub accusation_impact_max: f32,
    /// Fraction of the mention impact applied to the mentioned agent.
    #[serde(default = "default_0_5")]
    pub attack_ratio: f32,
    /// Chance per statement that the speaker entertains a rumor.
    #[serde(default = "default_0_3")]
    pub rumor_probability: f32,
    /// Lower bound of the rumor impact.
    #[serde(default = "default_neg_0_2")]
    pub rumor_impact_min: f32,
    /// Upper bound of the rumor impact.
    #[serde(default = "default_0_3")]
    pub rumor_impact_max: f32,
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            accusation_impact_min: 0.1,
            accusation_impact_max: 0.3,
            attack_ratio: 0.5,
            rumor_probability: 0.3,
            rumor_impact_min: -0.2,
            rumor_impact_max: 0.3,
        }
    }
}

/// Fixed impacts of the voting and night phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventImpactConfig {
    /// Impact of each vote received.
    #[serde(default = "default_0_3")]
    pub voted: f32,
    /// Impact on survivors when someone is voted out.
    #[serde(default = "default_0_2")]
    pub eliminated: f32,
    /// Impact on survivors of a night kill.
    #[serde(default = "default_0_4")]
    pub killed: f32,
}

impl Default for EventImpactConfig {
    fn default() -> Self {
        Self {
            voted: 0.3,
            eliminated: 0.2,
            killed: 0.4,
        }
    }
}

/// Game rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Once `day` exceeds this, the wolves win by default.
    #[serde(default = "default_5")]
    pub max_days: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self { max_days: 5 }
    }
}

/// Per-agent memory log limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Trim the log once it grows past this many events.
    #[serde(default = "default_20_usize")]
    pub max_log_len: usize,
    /// How many of the most recent events survive a trim.
    #[serde(default = "default_15_usize")]
    pub retain_len: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_log_len: 20,
            retain_len: 15,
        }
    }
}

/// LLM integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: openrouter, openai, ollama, none.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the provider API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Max tokens per statement.
    #[serde(default = "default_150")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_7")]
    pub temperature: f32,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Retries after the first failed attempt.
    #[serde(default = "default_1_u32")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: 150,
            temperature: 0.7,
            request_timeout_ms: 30_000,
            max_retries: 1,
        }
    }
}

/// Host loop and registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Pause between orchestrator steps (ms).
    #[serde(default = "default_500")]
    pub tick_interval_ms: u64,
    /// Pause after each AI statement (ms).
    #[serde(default = "default_1000")]
    pub statement_delay_ms: u64,
    /// How long voting waits for the human before recording an abstention (ms).
    #[serde(default = "default_15000")]
    pub human_vote_timeout_ms: u64,
    /// Sessions idle for longer than this are evicted (seconds).
    #[serde(default = "default_3600")]
    pub registry_ttl_secs: u64,
    /// Maximum concurrently registered games.
    #[serde(default = "default_64")]
    pub max_games: usize,
    /// Capacity of each game's update broadcast channel.
    #[serde(default = "default_256")]
    pub update_channel_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            statement_delay_ms: 1000,
            human_vote_timeout_ms: 15_000,
            registry_ttl_secs: 3600,
            max_games: 64,
            update_channel_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_human_name() -> String { "Player".to_string() }
fn default_provider() -> String { "openrouter".to_string() }
fn default_base_url() -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_model() -> String { "anthropic/claude-3-haiku".to_string() }
fn default_api_key_env() -> String { "OPENROUTER_API_KEY".to_string() }
fn default_ai_names() -> Vec<String> {
    ["Alice", "Bob", "Charlie", "Diana", "Eve"].map(String::from).to_vec()
}
fn default_personalities() -> Vec<String> {
    [
        "rational and cold, argues from evidence",
        "passionate and aggressive, quick to accuse",
        "a cautious observer who rarely commits",
        "social, builds alliances and seeks consensus",
        "suspicious of everyone",
    ]
    .map(String::from)
    .to_vec()
}
fn default_neg_0_2() -> f32 { -0.2 }
fn default_0_1() -> f32 { 0.1 }
fn default_0_2() -> f32 { 0.2 }
fn default_0_3() -> f32 { 0.3 }
fn default_0_4() -> f32 { 0.4 }
fn default_0_5() -> f32 { 0.5 }
fn default_0_7() -> f32 { 0.7 }
fn default_1_0() -> f32 { 1.0 }
fn default_1_5() -> f32 { 1.5 }
fn default_2_0() -> f32 { 2.0 }
fn default_1_u32() -> u32 { 1 }
fn default_5() -> u32 { 5 }
fn default_150() -> u32 { 150 }
fn default_1_usize() -> usize { 1 }
fn default_15_usize() -> usize { 15 }
fn default_20_usize() -> usize { 20 }
fn default_64() -> usize { 64 }
fn default_256() -> usize { 256 }
fn default_500() -> u64 { 500 }
fn default_1000() -> u64 { 1000 }
fn default_3600() -> u64 { 3600 }
fn default_15000() -> u64 { 15_000 }
fn default_30000() -> u64 { 30_000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WolfmindConfig::from_toml("").unwrap();
        assert_eq!(config.roster.ai_names.len(), 5);
        assert_eq!(config.roster.human_name, "Player");
        assert_eq!(config.rules.max_days, 5);
        assert!((config.decision.suspicion_weight - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.memory.max_log_len, 20);
        assert_eq!(config.memory.retain_len, 15);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = WolfmindConfig::from_toml(
            r#"
            [rules]
            max_days = 3

            [decision]
            anger_bias = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.rules.max_days, 3);
        assert!((config.decision.anger_bias - 0.9).abs() < f32::EPSILON);
        assert!((config.decision.trust_weight - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_too_many_wolves() {
        let err = WolfmindConfig::from_toml(
            r#"
            [roster]
            ai_names = ["A", "B"]
            wolf_count = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::Config(_)));
    }

    #[test]
    fn rejects_roster_that_starts_at_parity() {
        let err = WolfmindConfig::from_toml(
            r#"
            [roster]
            ai_names = ["A", "B", "C"]
            wolf_count = 2
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("parity"));

        let config = WolfmindConfig::from_toml(
            r#"
            [roster]
            ai_names = ["A", "B", "C", "D"]
            wolf_count = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.roster.wolf_count, 2);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = WolfmindConfig::from_toml(
            r#"
            [roster]
            ai_names = ["A", "B", "A"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_human_name_clash() {
        let err = WolfmindConfig::from_toml(
            r#"
            [roster]
            ai_names = ["A", "B", "Player"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::Config(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(WolfmindConfig::from_toml("[rules\nmax_days = ").is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wolfmind.toml");
        std::fs::write(&path, "[memory]\nmax_log_len = 10\nretain_len = 5\n").unwrap();
        let config = WolfmindConfig::from_file(&path).unwrap();
        assert_eq!(config.memory.max_log_len, 10);
    }

    #[test]
    fn personality_cycles() {
        let roster = RosterConfig {
            personalities: vec!["a".into(), "b".into()],
            ..RosterConfig::default()
        };
        assert_eq!(roster.personality_for(0), "a");
        assert_eq!(roster.personality_for(3), "b");
    }
}
