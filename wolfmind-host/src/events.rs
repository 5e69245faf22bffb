//! Game updates broadcast to observers.
//!
//! Every phase outcome from the core is translated into one or more
//! [`GameUpdate`]s. On the wire they are tagged JSON objects:
//!
//! ```json
//! { "type": "vote_results", "data": { "votes": { "Alice": "Bob" }, "counts": { "Bob": 1 } } }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use wolfmind_core::{GameState, NightOutcome, Phase, Role, StatementOutcome, VoteOutcome, Winner};

/// Public view of a seat at game start. Roles stay hidden.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    /// Agent name.
    pub name: String,
    /// Whether the agent is alive.
    pub alive: bool,
    /// Whether this seat belongs to the human.
    pub is_human: bool,
}

/// An observable change in a running game.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GameUpdate {
    /// The orchestrator picked the game up.
    GameStart {
        /// Game id.
        game_id: String,
        /// Seating order.
        players: Vec<PlayerInfo>,
        /// The human's name, if present.
        human_player: Option<String>,
        /// Current day.
        day: u32,
        /// Current phase.
        phase: Phase,
    },
    /// An AI agent spoke.
    AiStatement {
        /// Speaker.
        player: String,
        /// What was said.
        statement: String,
        /// When it was recorded.
        timestamp: DateTime<Utc>,
    },
    /// The human spoke.
    PlayerStatement {
        /// Speaker.
        player: String,
        /// What was said.
        statement: String,
        /// When it was recorded.
        timestamp: DateTime<Utc>,
    },
    /// The human voted, or abstained when `target` is `None`.
    PlayerVote {
        /// Voter.
        player: String,
        /// Chosen target.
        target: Option<String>,
    },
    /// Every ballot of the round and the resulting counts.
    VoteResults {
        /// Voter to target.
        votes: BTreeMap<String, String>,
        /// Votes received per target.
        counts: BTreeMap<String, u32>,
    },
    /// A unique vote leader was eliminated.
    PlayerEliminated {
        /// Eliminated agent.
        player: String,
        /// Revealed role.
        role: Role,
    },
    /// The wolves killed someone overnight.
    NightKill {
        /// Victim.
        victim: String,
        /// Revealed role.
        role: Role,
    },
    /// The game entered a new phase.
    PhaseChange {
        /// New phase.
        phase: Phase,
    },
    /// A new day began.
    NewDay {
        /// Day number.
        day: u32,
    },
    /// The game is decided.
    GameOver {
        /// Winning side.
        winner: Winner,
        /// Day on which it ended.
        day: u32,
    },
}

impl GameUpdate {
    /// The opening update for `game`.
    #[must_use]
    pub fn game_start(game: &GameState) -> Self {
        Self::GameStart {
            game_id: game.id().to_string(),
            players: game
                .agents()
                .iter()
                .map(|a| PlayerInfo {
                    name: a.name().to_string(),
                    alive: a.is_alive(),
                    is_human: a.is_human(),
                })
                .collect(),
            human_player: game.human().map(|h| h.name().to_string()),
            day: game.day(),
            phase: game.phase(),
        }
    }

    /// Updates for a recorded statement.
    #[must_use]
    pub fn for_statement(outcome: &StatementOutcome, from_human: bool, day: u32) -> Vec<Self> {
        let player = outcome.speaker.clone();
        let statement = outcome.text.clone();
        let timestamp = Utc::now();
        let mut updates = vec![if from_human {
            Self::PlayerStatement {
                player,
                statement,
                timestamp,
            }
        } else {
            Self::AiStatement {
                player,
                statement,
                timestamp,
            }
        }];
        match outcome.winner {
            Some(winner) => updates.push(Self::GameOver { winner, day }),
            None if outcome.phase_advanced => updates.push(Self::PhaseChange {
                phase: Phase::Voting,
            }),
            None => {}
        }
        updates
    }

    /// Updates for a resolved vote.
    #[must_use]
    pub fn for_vote(outcome: &VoteOutcome, day: u32) -> Vec<Self> {
        let mut updates = vec![Self::VoteResults {
            votes: outcome.tally.ballots.iter().cloned().collect(),
            counts: outcome.tally.counts.clone(),
        }];
        if let Some(out) = &outcome.eliminated {
            updates.push(Self::PlayerEliminated {
                player: out.name.clone(),
                role: out.role,
            });
        }
        updates.push(match outcome.winner {
            Some(winner) => Self::GameOver { winner, day },
            None => Self::PhaseChange {
                phase: Phase::NightAction,
            },
        });
        updates
    }

    /// Updates for a resolved night.
    #[must_use]
    pub fn for_night(outcome: &NightOutcome) -> Vec<Self> {
        let mut updates = Vec::new();
        if let Some(victim) = &outcome.victim {
            updates.push(Self::NightKill {
                victim: victim.name.clone(),
                role: victim.role,
            });
        }
        match outcome.winner {
            Some(winner) => updates.push(Self::GameOver {
                winner,
                day: outcome.day,
            }),
            None => {
                updates.push(Self::NewDay { day: outcome.day });
                updates.push(Self::PhaseChange {
                    phase: Phase::DayDiscussion,
                });
            }
        }
        updates
    }

    /// The wire name of this update.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameStart { .. } => "game_start",
            Self::AiStatement { .. } => "ai_statement",
            Self::PlayerStatement { .. } => "player_statement",
            Self::PlayerVote { .. } => "player_vote",
            Self::VoteResults { .. } => "vote_results",
            Self::PlayerEliminated { .. } => "player_eliminated",
            Self::NightKill { .. } => "night_kill",
            Self::PhaseChange { .. } => "phase_change",
            Self::NewDay { .. } => "new_day",
            Self::GameOver { .. } => "game_over",
        }
    }
}
