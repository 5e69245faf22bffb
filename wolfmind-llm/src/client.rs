//! LLM client: unified interface for OpenAI-compatible APIs and Ollama.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use wolfmind_core::config::LlmConfig;

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama {
        /// Server root, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat completions API (OpenRouter, OpenAI, ...).
    OpenAiCompatible {
        /// API root including the version segment, e.g. `https://openrouter.ai/api/v1`.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No LLM available. Every call errors, so callers use the rule-based fallback.
    None,
}

/// The main LLM client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
        }
    }

    /// Create a client with no LLM backend (all calls fail → rule-based fallback).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Build a client from `[llm]`, reading the API key from the environment
    /// variable named by `api_key_env`.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::from_config_with_key(config, api_key)
    }

    /// Build a client from `[llm]` with an explicit API key.
    ///
    /// A missing or blank key for a keyed provider yields a provider-less
    /// client, as does an unknown provider name.
    #[must_use]
    pub fn from_config_with_key(config: &LlmConfig, api_key: Option<String>) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.as_str() {
            "openrouter" | "openai" => match api_key.filter(|k| !k.trim().is_empty()) {
                Some(api_key) => LlmProvider::OpenAiCompatible { base_url, api_key },
                None => {
                    warn!(
                        env = %config.api_key_env,
                        "No API key found; statements will use rule-based fallback"
                    );
                    LlmProvider::None
                }
            },
            "ollama" => LlmProvider::Ollama { base_url },
            "none" => LlmProvider::None,
            other => {
                warn!(provider = other, "Unknown LLM provider; statements will use rule-based fallback");
                LlmProvider::None
            }
        };
        info!(provider = provider_kind(&provider), model = %config.model, "LLM client ready");
        Self::new(provider, config.model.clone(), config.max_retries)
    }

    /// Generate a response from the LLM.
    ///
    /// Returns `Err` if the LLM is unavailable or all retries fail.
    /// The caller should fall back to rule-based generation on error.
    ///
    /// # Errors
    /// Any [`LlmError`]; never retried past `max_retries`.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => {
                let url = format!("{base_url}/api/generate");
                let body = json!({
                    "model": self.model,
                    "prompt": format!("{}\n\n{}", request.system, request.user),
                    "stream": false,
                    "options": {
                        "temperature": request.temperature,
                        "num_predict": request.max_tokens,
                    }
                });
                self.send_with_retries(request, || self.http.post(&url).json(&body), |json| {
                    let text = json["response"].as_str().unwrap_or_default().to_string();
                    let tokens = json["eval_count"].as_u64().unwrap_or(0);
                    (text, tokens)
                })
                .await
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let url = format!("{base_url}/chat/completions");
                let body = json!({
                    "model": self.model,
                    "messages": [
                        { "role": "system", "content": request.system },
                        { "role": "user", "content": request.user },
                    ],
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                });
                self.send_with_retries(
                    request,
                    || self.http.post(&url).bearer_auth(api_key).json(&body),
                    |json| {
                        let text = json["choices"][0]["message"]["content"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string();
                        let tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0);
                        (text, tokens)
                    },
                )
                .await
            }
        }
    }

    /// Send a request, retrying transport and HTTP failures.
    ///
    /// A well-formed answer with blank text is `EmptyResponse` and is not
    /// retried.
    async fn send_with_retries(
        &self,
        request: &LlmRequest,
        build: impl Fn() -> RequestBuilder,
        extract: impl Fn(&Value) -> (String, u64),
    ) -> Result<LlmResponse, LlmError> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, of = self.max_retries + 1, "Retrying LLM call");
            }

            let start = Instant::now();
            let result = build()
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let (text, tokens) = extract(&json);
                    if text.trim().is_empty() {
                        return Err(LlmError::EmptyResponse);
                    }
                    return Ok(LlmResponse {
                        text,
                        tokens_generated: u32::try_from(tokens).unwrap_or(u32::MAX),
                        latency_ms,
                        model: self.model.clone(),
                    });
                }
                Ok(resp) => {
                    let err = LlmError::RequestFailed(format!("HTTP {}", resp.status()));
                    warn!(error = %err, "LLM API returned error");
                    last_error = Some(err);
                }
                Err(e) => {
                    let err = LlmError::from_transport(&e, request.timeout_ms);
                    warn!(error = %err, "LLM request failed");
                    last_error = Some(err);
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error: Box::new(
                last_error.unwrap_or_else(|| LlmError::RequestFailed("no attempt made".into())),
            ),
        })
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// The configured provider.
    #[must_use]
    pub fn provider(&self) -> &LlmProvider {
        &self.provider
    }
}

fn provider_kind(provider: &LlmProvider) -> &'static str {
    match provider {
        LlmProvider::Ollama { .. } => "ollama",
        LlmProvider::OpenAiCompatible { .. } => "openai_compatible",
        LlmProvider::None => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;

    fn ollama_at(base_url: String, max_retries: u32) -> LlmClient {
        LlmClient::new(LlmProvider::Ollama { base_url }, "test-model", max_retries)
    }

    #[test]
    fn missing_key_disables_the_client() {
        let client = LlmClient::from_config_with_key(&LlmConfig::default(), None);
        assert!(!client.is_available());

        let blank = LlmClient::from_config_with_key(&LlmConfig::default(), Some("  ".into()));
        assert!(!blank.is_available());
    }

    #[test]
    fn key_enables_openrouter() {
        let client = LlmClient::from_config_with_key(&LlmConfig::default(), Some("sk-test".into()));
        match client.provider() {
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                assert_eq!(base_url, "https://openrouter.ai/api/v1");
                assert_eq!(api_key, "sk-test");
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn ollama_needs_no_key() {
        let config = LlmConfig {
            provider: "ollama".into(),
            base_url: "http://localhost:11434/".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::from_config_with_key(&config, None);
        assert!(matches!(
            client.provider(),
            LlmProvider::Ollama { base_url } if base_url == "http://localhost:11434"
        ));
    }

    #[test]
    fn unknown_provider_falls_back_to_none() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        assert!(!LlmClient::from_config_with_key(&config, Some("k".into())).is_available());
    }

    #[tokio::test]
    async fn none_provider_errors_immediately() {
        let client = LlmClient::none();
        let err = client
            .generate(&LlmRequest::statement("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_server_exhausts_retries() {
        let client = LlmClient::new(
            LlmProvider::Ollama {
                base_url: "http://127.0.0.1:9".into(),
            },
            "test-model",
            1,
        );
        let req = LlmRequest::statement("s", "u").with_timeout(500);
        let err = client.generate(&req).await.unwrap_err();
        match err {
            LlmError::RetriesExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last_error, LlmError::Unavailable(_) | LlmError::RequestFailed(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn ollama_answer_is_extracted() {
        let base_url = test_server::respond_once(r#"{"response":"Bob is lying.","eval_count":7}"#).await;
        let response = ollama_at(base_url, 0)
            .generate(&LlmRequest::statement("s", "u"))
            .await
            .unwrap();
        assert_eq!(response.text, "Bob is lying.");
        assert_eq!(response.tokens_generated, 7);
        assert_eq!(response.model, "test-model");
    }

    #[tokio::test]
    async fn blank_answer_is_an_empty_response() {
        let base_url = test_server::respond_once(r#"{"response":"   ","eval_count":0}"#).await;
        let err = ollama_at(base_url, 2)
            .generate(&LlmRequest::statement("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn slow_server_reports_the_request_timeout() {
        let base_url = test_server::never_respond().await;
        let req = LlmRequest::statement("s", "u").with_timeout(50);
        let err = ollama_at(base_url, 0).generate(&req).await.unwrap_err();
        match err {
            LlmError::RetriesExhausted { attempts: 1, last_error } => {
                assert!(matches!(*last_error, LlmError::Timeout(50)), "got {last_error}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
