//! Host error types.

use thiserror::Error;
use wolfmind_core::GameError;

/// Errors surfaced by the registry and orchestrator.
#[derive(Debug, Error)]
pub enum HostError {
    /// The game rejected the action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// No session with this id is registered.
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    /// The registry is at capacity and nothing could be evicted.
    #[error("Registry full: {limit} games already running")]
    RegistryFull {
        /// Configured maximum.
        limit: usize,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HostError>;
