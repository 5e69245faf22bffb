//! Error types for the WOLFMIND core library.
//!
//! Every error here is a *rejection*: the offending call leaves the game
//! untouched. Numeric state is clamped rather than validated, so there is
//! no fatal error class inside the core.

use thiserror::Error;

use crate::types::{Phase, PlayerAction, Winner};

/// Top-level error type for all WOLFMIND game operations.
#[derive(Error, Debug)]
pub enum GameError {
    /// An action was submitted outside of the phase that accepts it.
    #[error("{action} is not accepted during {phase}")]
    InvalidPhaseAction {
        /// What the caller tried to do.
        action: PlayerAction,
        /// The phase the game was in.
        phase: Phase,
    },

    /// The same agent already submitted this action in the current phase.
    #[error("{agent} already submitted a {action} this phase")]
    DuplicateSubmission {
        /// What the caller tried to do.
        action: PlayerAction,
        /// Who tried to do it.
        agent: String,
    },

    /// The acting agent has been eliminated and can no longer act.
    #[error("{0} has been eliminated and cannot act")]
    AgentEliminated(String),

    /// A vote or query referenced a name that is not a (living) roster member.
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// The operation needs a human agent but the roster has none.
    #[error("No human agent in this game")]
    MissingHumanAgent,

    /// The game already has a winner; no further mutation is accepted.
    #[error("Game is over (winner: {winner})")]
    GameOver {
        /// The final winner.
        winner: Winner,
    },

    /// Voting cannot be resolved until every living agent has voted.
    #[error("Still waiting for votes from: {}", pending.join(", "))]
    AwaitingVotes {
        /// Living agents that have not voted yet.
        pending: Vec<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GameError {
    /// Whether this error belongs to the "invalid phase action" category
    /// (wrong phase, duplicate submission, or acting while eliminated).
    #[must_use]
    pub fn is_phase_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidPhaseAction { .. } | Self::DuplicateSubmission { .. } | Self::AgentEliminated(_)
        )
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, GameError>;
