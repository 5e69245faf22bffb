//! # wolfmind-llm: Statement Generation for WOLFMIND
//!
//! Gives AI agents a voice during discussion. Backends:
//!   - **OpenAI-compatible API** (OpenRouter by default)
//!   - **Ollama** (local)
//!   - **None** (rule-based only)
//!
//! The psychological model never depends on this crate's output beyond
//! literal name mentions, and generation cannot fail: every error path ends
//! in [`statement::fallback_statement`].
//!
//! # Architecture
//!
//! ```text
//! AgentState + VisibleState ──▶ prompt ──▶ LlmClient ──▶ cleaned text
//!                                               │ (error / empty)
//!                                               ▼
//!                                       fallback_statement
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod statement;
pub mod types;

#[cfg(test)]
mod test_server;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use statement::{StatementGenerator, TextGenerator, fallback_statement};
pub use types::{LlmRequest, LlmResponse};
