//! Core type definitions for the WOLFMIND game model.
//!
//! All types are serializable so the host layer can ship them to clients
//! unchanged.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Roles & Teams
// ---------------------------------------------------------------------------

/// Hidden role of an agent. Fixed at game creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Benign majority; wins by eliminating every wolf.
    Villager,
    /// Hidden adversary; the only role with a night action.
    Wolf,
}

impl Role {
    /// The team this role plays for.
    #[must_use]
    pub fn team(self) -> Winner {
        match self {
            Self::Villager => Winner::Villagers,
            Self::Wolf => Winner::Wolves,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Villager => write!(f, "villager"),
            Self::Wolf => write!(f, "wolf"),
        }
    }
}

/// The winning side of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// Every wolf was eliminated.
    Villagers,
    /// Wolves reached parity, or the day limit ran out.
    Wolves,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Villagers => write!(f, "villagers"),
            Self::Wolves => write!(f, "wolves"),
        }
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Game phase. Exactly one is current per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Every living agent speaks once.
    DayDiscussion,
    /// Every living agent votes; a unique leader is eliminated.
    Voting,
    /// The first deciding wolf picks a victim.
    NightAction,
    /// Terminal. Reachable from any other phase.
    GameOver,
}

impl Phase {
    /// Whether this is the terminal phase.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GameOver)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DayDiscussion => write!(f, "day_discussion"),
            Self::Voting => write!(f, "voting"),
            Self::NightAction => write!(f, "night_action"),
            Self::GameOver => write!(f, "game_over"),
        }
    }
}

/// Actions that are only accepted during specific phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    /// A discussion statement.
    Statement,
    /// A vote during the voting phase.
    Vote,
    /// Tallying the votes.
    ResolveVoting,
    /// The wolves' night kill.
    NightKill,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement => write!(f, "statement"),
            Self::Vote => write!(f, "vote"),
            Self::ResolveVoting => write!(f, "vote resolution"),
            Self::NightKill => write!(f, "night kill"),
        }
    }
}

// ---------------------------------------------------------------------------
// Psychological Events
// ---------------------------------------------------------------------------

/// Kind of a discrete psychological event applied to an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Someone named this agent (or was named in front of it) in discussion.
    Accused,
    /// Someone spoke up for this agent.
    Defended,
    /// This agent received a vote.
    Voted,
    /// Someone was killed during the night.
    Killed,
    /// Unverified talk about a third party.
    Rumor,
    /// Someone was voted out.
    Eliminated,
    /// This agent was named by a speaker.
    Attacked,
}

impl EventKind {
    /// Stable wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accused => "accused",
            Self::Defended => "defended",
            Self::Voted => "voted",
            Self::Killed => "killed",
            Self::Rumor => "rumor",
            Self::Eliminated => "eliminated",
            Self::Attacked => "attacked",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accused" => Ok(Self::Accused),
            "defended" => Ok(Self::Defended),
            "voted" => Ok(Self::Voted),
            "killed" => Ok(Self::Killed),
            "rumor" => Ok(Self::Rumor),
            "eliminated" => Ok(Self::Eliminated),
            "attacked" => Ok(Self::Attacked),
            _ => Err(format!("unknown event kind: '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Emotional Model
// ---------------------------------------------------------------------------

/// Three bounded emotional scalars, each in [0, 1].
///
/// Fields are private so the only way to change them is through the
/// clamping mutators below. Deserialization goes through [`Self::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEmotions")]
pub struct EmotionalState {
    anger: f32,
    fear: f32,
    confidence: f32,
}

/// Unchecked serialized form of [`EmotionalState`].
#[derive(Deserialize)]
struct RawEmotions {
    anger: f32,
    fear: f32,
    confidence: f32,
}

impl From<RawEmotions> for EmotionalState {
    fn from(raw: RawEmotions) -> Self {
        Self::new(raw.anger, raw.fear, raw.confidence)
    }
}

impl EmotionalState {
    /// Calm starting state: no anger, no fear, middling confidence.
    pub const NEUTRAL: Self = Self {
        anger: 0.0,
        fear: 0.0,
        confidence: 0.5,
    };

    /// Create a state, clamping every value to [0, 1].
    #[must_use]
    pub fn new(anger: f32, fear: f32, confidence: f32) -> Self {
        Self {
            anger: clamp_unit(anger),
            fear: clamp_unit(fear),
            confidence: clamp_unit(confidence),
        }
    }

    /// Anger in [0, 1].
    #[must_use]
    pub fn anger(&self) -> f32 {
        self.anger
    }

    /// Fear in [0, 1].
    #[must_use]
    pub fn fear(&self) -> f32 {
        self.fear
    }

    /// Confidence in [0, 1].
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Shift anger by `delta`, clamped.
    pub fn add_anger(&mut self, delta: f32) {
        self.anger = clamp_unit(self.anger + delta);
    }

    /// Shift fear by `delta`, clamped.
    pub fn add_fear(&mut self, delta: f32) {
        self.fear = clamp_unit(self.fear + delta);
    }

    /// Lower confidence by `delta`, never below `floor`.
    pub fn shake_confidence(&mut self, delta: f32, floor: f32) {
        self.confidence = clamp_unit((self.confidence - delta).max(floor));
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for EmotionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "anger={:.2} fear={:.2} confidence={:.2}",
            self.anger, self.fear, self.confidence
        )
    }
}

/// Clamp to [0, 1], mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

// ---------------------------------------------------------------------------
// Decision Score
// ---------------------------------------------------------------------------

/// Totally ordered score used to rank vote and night-kill candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DecisionScore(pub OrderedFloat<f32>);

impl DecisionScore {
    /// Create a decision score from a raw f32.
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self(OrderedFloat(score))
    }

    /// Get the raw score value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0.into_inner()
    }
}
