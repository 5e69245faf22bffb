//! Read-only views of a game for clients and text generation.
//!
//! Roles stay hidden: a snapshot shows an agent's role only to that agent
//! itself, or to everyone once the game is over.

use serde::Serialize;

use crate::agent::AgentState;
use crate::game::GameState;
use crate::types::{EmotionalState, Phase, Role, Winner};

/// Who is looking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// A spectator with no seat at the table.
    Observer,
    /// The agent with this name.
    Agent(String),
}

impl Viewer {
    fn is(&self, name: &str) -> bool {
        matches!(self, Self::Agent(n) if n == name)
    }
}

/// Public view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    /// Agent name.
    pub name: String,
    /// Role, if the viewer may see it.
    pub role: Option<Role>,
    /// Whether the agent is alive.
    pub alive: bool,
    /// Whether the human controls this agent.
    pub is_human: bool,
    /// Emotional scalars.
    pub emotions: EmotionalState,
    /// Up to three strongest suspicions toward others, descending.
    pub top_suspicions: Vec<(String, f32)>,
    /// Votes received so far.
    pub vote_count: u32,
    /// Display-only influence.
    pub influence: f32,
}

impl AgentSnapshot {
    /// Capture `agent` as seen by `viewer`.
    #[must_use]
    pub fn capture(agent: &AgentState, viewer: &Viewer, game_over: bool) -> Self {
        let role = (game_over || viewer.is(agent.name())).then_some(agent.role());
        Self {
            name: agent.name().to_string(),
            role,
            alive: agent.is_alive(),
            is_human: agent.is_human(),
            emotions: *agent.emotions(),
            top_suspicions: agent.top_suspicions(3),
            vote_count: agent.vote_count(),
            influence: agent.influence(),
        }
    }
}

/// Public view of a whole game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    /// Game id.
    pub game_id: String,
    /// Current phase.
    pub phase: Phase,
    /// Current day.
    pub day: u32,
    /// Statements so far.
    pub turn: u32,
    /// Winner, once decided.
    pub winner: Option<Winner>,
    /// Every agent in seating order.
    pub agents: Vec<AgentSnapshot>,
}

impl GameSnapshot {
    /// Capture `game` as seen by `viewer`.
    #[must_use]
    pub fn capture(game: &GameState, viewer: &Viewer) -> Self {
        let game_over = game.phase().is_terminal();
        Self {
            game_id: game.id().to_string(),
            phase: game.phase(),
            day: game.day(),
            turn: game.turn(),
            winner: game.winner(),
            agents: game
                .agents()
                .iter()
                .map(|a| AgentSnapshot::capture(a, viewer, game_over))
                .collect(),
        }
    }
}

/// The slice of game state a speaker is allowed to know when composing a
/// statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleState {
    /// Current phase.
    pub phase: Phase,
    /// Current day.
    pub day: u32,
    /// Name of the human player, if any.
    pub human_player: Option<String>,
    /// Living agents in seating order.
    pub alive: Vec<String>,
}

impl VisibleState {
    /// Capture the public facts of `game`.
    #[must_use]
    pub fn of(game: &GameState) -> Self {
        Self {
            phase: game.phase(),
            day: game.day(),
            human_player: game.human().map(|h| h.name().to_string()),
            alive: game.list_alive(),
        }
    }
}

impl GameState {
    /// Snapshot of the game as seen by `viewer`.
    #[must_use]
    pub fn snapshot(&self, viewer: &Viewer) -> GameSnapshot {
        GameSnapshot::capture(self, viewer)
    }

    /// Snapshot of one agent as seen by `viewer`.
    #[must_use]
    pub fn agent_snapshot(&self, name: &str, viewer: &Viewer) -> Option<AgentSnapshot> {
        let game_over = self.phase().is_terminal();
        self.agent(name)
            .map(|a| AgentSnapshot::capture(a, viewer, game_over))
    }

    /// Public facts for text generation.
    #[must_use]
    pub fn visible_state(&self) -> VisibleState {
        VisibleState::of(self)
    }
}
