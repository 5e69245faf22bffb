//! # wolfmind-host: Game Hosting for WOLFMIND
//!
//! Runs many games concurrently on tokio:
//!
//! - [`registry`]: bounded session map with TTL eviction and the human
//!   action channel
//! - [`orchestrator`]: async phase loop, LLM calls outside the game lock
//! - [`events`]: `GameUpdate` events broadcast per session
//! - [`telemetry`]: tracing subscriber setup
//!
//! ```text
//! human ──submit_statement / submit_vote──▶ GameRegistry ──▶ GameSession ◀── Orchestrator
//!                                                                │
//!                                                     broadcast::<GameUpdate>
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod telemetry;

pub use error::HostError;
pub use events::{GameUpdate, PlayerInfo};
pub use orchestrator::Orchestrator;
pub use registry::{GameRegistry, GameSession};
