//! Per-agent psychological state.
//!
//! An [`AgentState`] holds trust and suspicion toward every other agent,
//! three emotional scalars and a capped memory log. Every numeric mutator
//! clamps to [0, 1], so callers never need to validate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::memory::{MemoryEvent, MemoryLog};
use crate::random::RandomSource;
use crate::types::{EmotionalState, Role, clamp_unit};

/// Numeric psychological model of one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "AgentRecord")]
pub struct AgentState {
    name: String,
    role: Role,
    personality: String,
    alive: bool,
    is_human: bool,
    trust: BTreeMap<String, f32>,
    suspicion: BTreeMap<String, f32>,
    emotions: EmotionalState,
    memory: MemoryLog,
    vote_count: u32,
    influence: f32,
}

/// Serialized form of [`AgentState`]; social scores are clamped on load.
#[derive(Deserialize)]
struct AgentRecord {
    name: String,
    role: Role,
    personality: String,
    alive: bool,
    is_human: bool,
    trust: BTreeMap<String, f32>,
    suspicion: BTreeMap<String, f32>,
    emotions: EmotionalState,
    memory: MemoryLog,
    vote_count: u32,
    influence: f32,
}

impl From<AgentRecord> for AgentState {
    fn from(raw: AgentRecord) -> Self {
        fn clamp_all(map: BTreeMap<String, f32>) -> BTreeMap<String, f32> {
            map.into_iter().map(|(k, v)| (k, clamp_unit(v))).collect()
        }
        Self {
            name: raw.name,
            role: raw.role,
            personality: raw.personality,
            alive: raw.alive,
            is_human: raw.is_human,
            trust: clamp_all(raw.trust),
            suspicion: clamp_all(raw.suspicion),
            emotions: raw.emotions,
            memory: raw.memory,
            vote_count: raw.vote_count,
            influence: raw.influence,
        }
    }
}

impl AgentState {
    /// Create a living AI agent with neutral emotions and empty maps.
    #[must_use]
    pub fn new(name: impl Into<String>, role: Role, personality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            personality: personality.into(),
            alive: true,
            is_human: false,
            trust: BTreeMap::new(),
            suspicion: BTreeMap::new(),
            emotions: EmotionalState::NEUTRAL,
            memory: MemoryLog::default(),
            vote_count: 0,
            influence: 1.0,
        }
    }

    /// Mark this agent as controlled by the human player.
    #[must_use]
    pub fn as_human(mut self) -> Self {
        self.is_human = true;
        self
    }

    /// Replace the memory log with one using the given limits.
    #[must_use]
    pub fn with_memory_limits(mut self, cap: usize, retain: usize) -> Self {
        self.memory = MemoryLog::new(cap, retain);
        self
    }

    /// Fill the self-keyed trust and suspicion entries with uniform
    /// [0.1, 0.3] noise. These entries are never read as social scores.
    pub fn seed_self_noise(&mut self, rng: &mut dyn RandomSource) {
        let trust = rng.uniform(0.1, 0.3);
        let suspicion = rng.uniform(0.1, 0.3);
        self.trust.insert(self.name.clone(), trust);
        self.suspicion.insert(self.name.clone(), suspicion);
    }

    // -- identity ------------------------------------------------------------

    /// Unique name within the roster.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hidden role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Free-form personality text. Only text generation reads it.
    #[must_use]
    pub fn personality(&self) -> &str {
        &self.personality
    }

    /// Whether the agent is still in the game.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Whether the human player controls this agent.
    #[must_use]
    pub fn is_human(&self) -> bool {
        self.is_human
    }

    /// The night-action capability. `Some` only for living wolves.
    #[must_use]
    pub fn night_actor(&self) -> Option<NightActor<'_>> {
        (self.alive && self.role == Role::Wolf).then_some(NightActor { agent: self })
    }

    // -- social scores -------------------------------------------------------

    /// Trust toward `other`, if an opinion exists.
    #[must_use]
    pub fn trust_of(&self, other: &str) -> Option<f32> {
        self.trust.get(other).copied()
    }

    /// Suspicion toward `other`, if an opinion exists.
    #[must_use]
    pub fn suspicion_of(&self, other: &str) -> Option<f32> {
        self.suspicion.get(other).copied()
    }

    /// Full trust map, including the self-keyed noise entry.
    #[must_use]
    pub fn trust_map(&self) -> &BTreeMap<String, f32> {
        &self.trust
    }

    /// Full suspicion map, including the self-keyed noise entry.
    #[must_use]
    pub fn suspicion_map(&self) -> &BTreeMap<String, f32> {
        &self.suspicion
    }

    /// Overwrite trust toward `other`, clamped.
    pub fn set_trust(&mut self, other: impl Into<String>, value: f32) {
        self.trust.insert(other.into(), clamp_unit(value));
    }

    /// Overwrite suspicion toward `other`, clamped.
    pub fn set_suspicion(&mut self, other: impl Into<String>, value: f32) {
        self.suspicion.insert(other.into(), clamp_unit(value));
    }

    /// Shift trust toward `other` by `delta`. A missing entry starts at 0.
    pub fn adjust_trust(&mut self, other: &str, delta: f32) {
        let entry = self.trust.entry(other.to_string()).or_insert(0.0);
        *entry = clamp_unit(*entry + delta);
    }

    /// Shift suspicion toward `other` by `delta`. A missing entry starts at 0.
    pub fn adjust_suspicion(&mut self, other: &str, delta: f32) {
        let entry = self.suspicion.entry(other.to_string()).or_insert(0.0);
        *entry = clamp_unit(*entry + delta);
    }

    /// Up to `n` highest suspicions toward others, descending.
    ///
    /// Equal values keep name order.
    #[must_use]
    pub fn top_suspicions(&self, n: usize) -> Vec<(String, f32)> {
        let mut ranked: Vec<(String, f32)> = self
            .suspicion
            .iter()
            .filter(|(name, _)| name.as_str() != self.name)
            .map(|(name, v)| (name.clone(), *v))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }

    /// The single most suspected other agent, if any.
    #[must_use]
    pub fn top_suspect(&self) -> Option<String> {
        self.top_suspicions(1).into_iter().next().map(|(name, _)| name)
    }

    // -- emotion & memory ----------------------------------------------------

    /// Current emotions.
    #[must_use]
    pub fn emotions(&self) -> &EmotionalState {
        &self.emotions
    }

    /// Mutable emotions. All mutators on [`EmotionalState`] clamp.
    pub fn emotions_mut(&mut self) -> &mut EmotionalState {
        &mut self.emotions
    }

    /// Remembered events.
    #[must_use]
    pub fn memory(&self) -> &MemoryLog {
        &self.memory
    }

    /// Append to the memory log.
    pub fn remember(&mut self, event: MemoryEvent) {
        self.memory.push(event);
    }

    // -- bookkeeping ---------------------------------------------------------

    /// Votes received over the whole game.
    #[must_use]
    pub fn vote_count(&self) -> u32 {
        self.vote_count
    }

    /// Display-only influence score.
    #[must_use]
    pub fn influence(&self) -> f32 {
        self.influence
    }

    /// Count one received vote.
    pub fn record_vote_received(&mut self) {
        self.vote_count += 1;
    }

    /// Remove from play. Irreversible.
    pub fn eliminate(&mut self) {
        self.alive = false;
    }
}

/// Borrowed view of an agent that may act at night.
///
/// Only obtainable through [`AgentState::night_actor`].
#[derive(Debug, Clone, Copy)]
pub struct NightActor<'a> {
    agent: &'a AgentState,
}

impl<'a> NightActor<'a> {
    /// The acting agent.
    #[must_use]
    pub fn agent(&self) -> &'a AgentState {
        self.agent
    }

    /// The acting agent's name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.agent.name
    }
}
