//! # WOLFMIND Core Library
//!
//! Psychological decision engine for hidden-role social deduction games.
//!
//! Every agent at the table carries a purely numeric model of its inner
//! life, and that model alone decides how it votes and whom it kills:
//!
//! - **Trust & suspicion** toward each other agent, in [0, 1]
//! - **Emotion**: anger, fear and confidence, in [0, 1]
//! - **Memory**: a capped log of the events that moved the numbers
//!
//! Text is somebody else's job. The core never generates language; it only
//! scans statements for literal name mentions.
//!
//! ## Layout
//!
//! - [`propagation`] turns discrete events into numeric nudges
//! - [`decision`] turns numbers into vote and night-kill choices
//! - [`game`] sequences discussion, voting and night and decides the winner
//! - [`snapshot`] exposes read-only, role-hiding views

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod decision;
pub mod error;
pub mod game;
pub mod memory;
pub mod propagation;
pub mod random;
pub mod snapshot;
pub mod types;

pub use agent::{AgentState, NightActor};
pub use config::WolfmindConfig;
pub use decision::{DecisionEngine, VoteTally};
pub use error::GameError;
pub use game::{
    GameState, Mention, NightOutcome, RevealedAgent, Rumor, StatementOutcome, VoteOutcome,
};
pub use memory::{MemoryEvent, MemoryLog};
pub use random::{RandomSource, SeededRandom, SequenceRandom};
pub use snapshot::{AgentSnapshot, GameSnapshot, Viewer, VisibleState};
pub use types::*;
