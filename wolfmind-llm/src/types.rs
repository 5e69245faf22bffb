//! Core types for LLM requests and responses.

use serde::{Deserialize, Serialize};
use wolfmind_core::config::LlmConfig;

/// A request to the LLM.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (persona, rules, constraints).
    pub system: String,
    /// User prompt (game situation and instructions).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Create a discussion-statement request with the default limits.
    #[must_use]
    pub fn statement(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 150,
            temperature: 0.7,
            timeout_ms: 30_000,
        }
    }

    /// Apply the token, temperature and timeout limits from `[llm]`.
    #[must_use]
    pub fn with_limits(mut self, config: &LlmConfig) -> Self {
        self.max_tokens = config.max_tokens;
        self.temperature = config.temperature;
        self.timeout_ms = config.request_timeout_ms;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}
