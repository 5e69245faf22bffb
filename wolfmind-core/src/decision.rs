//! Decision engine: numeric vote and night-kill choices.
//!
//! Both decisions score every other living candidate, add a small uniform
//! perturbation and take the arg-max. Candidates are scored in roster order
//! with one perturbation draw each, and an exact tie keeps the earlier
//! candidate, so a fixed seed reproduces the same choice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentState, NightActor};
use crate::config::DecisionConfig;
use crate::random::RandomSource;
use crate::types::DecisionScore;

/// Scores candidates and picks vote or night-kill targets.
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    weights: DecisionConfig,
}

impl DecisionEngine {
    /// Create an engine with the given weights.
    #[must_use]
    pub fn new(weights: DecisionConfig) -> Self {
        Self { weights }
    }

    /// The weights in use.
    #[must_use]
    pub fn weights(&self) -> &DecisionConfig {
        &self.weights
    }

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------

    /// Score every living candidate other than `agent`, in `alive` order.
    ///
    /// `score = suspicion·W_susp + anger·W_anger − trust·W_trust + noise`
    pub fn score_vote_candidates(
        &self,
        agent: &AgentState,
        alive: &[String],
        rng: &mut dyn RandomSource,
    ) -> Vec<(String, DecisionScore)> {
        let w = &self.weights;
        let anger_term = agent.emotions().anger() * w.anger_bias;

        alive
            .iter()
            .filter(|c| c.as_str() != agent.name())
            .map(|candidate| {
                let suspicion = agent.suspicion_of(candidate).unwrap_or(w.unseen_score);
                let trust = agent.trust_of(candidate).unwrap_or(w.unseen_score);
                let noise = rng.uniform(-w.vote_perturbation, w.vote_perturbation);
                let score =
                    suspicion * w.suspicion_weight + anger_term - trust * w.trust_weight + noise;
                (candidate.clone(), DecisionScore::new(score))
            })
            .collect()
    }

    /// Pick the vote target for `agent`.
    ///
    /// Returns the agent's own name only when no other living candidate
    /// exists; callers treat that as an abstention.
    pub fn decide_vote(
        &self,
        agent: &AgentState,
        alive: &[String],
        rng: &mut dyn RandomSource,
    ) -> String {
        let scores = self.score_vote_candidates(agent, alive, rng);
        debug!(voter = agent.name(), ?scores, "Vote scores");
        arg_max(scores).unwrap_or_else(|| agent.name().to_string())
    }

    // -----------------------------------------------------------------------
    // Night
    // -----------------------------------------------------------------------

    /// Score night-kill candidates for a wolf, in `alive` order.
    ///
    /// `score = −trust·W_night_trust + bonus(suspicion > threshold) + noise`
    pub fn score_night_candidates(
        &self,
        actor: NightActor<'_>,
        alive: &[String],
        rng: &mut dyn RandomSource,
    ) -> Vec<(String, DecisionScore)> {
        let w = &self.weights;
        let agent = actor.agent();

        alive
            .iter()
            .filter(|c| c.as_str() != agent.name())
            .map(|candidate| {
                let trust = agent.trust_of(candidate).unwrap_or(w.unseen_score);
                let bonus = match agent.suspicion_of(candidate) {
                    Some(s) if s > w.night_suspicion_threshold => w.night_suspicion_bonus,
                    _ => 0.0,
                };
                let noise = rng.uniform(-w.night_perturbation, w.night_perturbation);
                let score = -trust * w.night_trust_weight + bonus + noise;
                (candidate.clone(), DecisionScore::new(score))
            })
            .collect()
    }

    /// Pick the night victim for `agent`.
    ///
    /// `None` for villagers, dead agents, or when nobody else is alive.
    pub fn decide_night_kill(
        &self,
        agent: &AgentState,
        alive: &[String],
        rng: &mut dyn RandomSource,
    ) -> Option<String> {
        let actor = agent.night_actor()?;
        let scores = self.score_night_candidates(actor, alive, rng);
        debug!(wolf = actor.name(), ?scores, "Night scores");
        arg_max(scores)
    }
}

/// First strictly-greatest entry.
fn arg_max(scores: Vec<(String, DecisionScore)>) -> Option<String> {
    let mut best: Option<(String, DecisionScore)> = None;
    for (name, score) in scores {
        match &best {
            Some((_, top)) if score <= *top => {}
            _ => best = Some((name, score)),
        }
    }
    best.map(|(name, _)| name)
}

// ---------------------------------------------------------------------------
// Tallying
// ---------------------------------------------------------------------------

/// Ballots cast in one voting phase and their per-target counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// `(voter, target)` in casting order.
    pub ballots: Vec<(String, String)>,
    /// Votes received per target.
    pub counts: BTreeMap<String, u32>,
}

impl VoteTally {
    /// Count a list of ballots.
    #[must_use]
    pub fn from_ballots(ballots: Vec<(String, String)>) -> Self {
        let mut counts = BTreeMap::new();
        for (_, target) in &ballots {
            *counts.entry(target.clone()).or_insert(0) += 1;
        }
        Self { ballots, counts }
    }

    /// The target with strictly the most votes, or `None` on a tie or when
    /// nobody voted.
    #[must_use]
    pub fn unique_leader(&self) -> Option<&str> {
        let max = self.counts.values().copied().max()?;
        let mut leaders = self.counts.iter().filter(|(_, c)| **c == max);
        let (leader, _) = leaders.next()?;
        if leaders.next().is_some() {
            None
        } else {
            Some(leader.as_str())
        }
    }

    /// Votes received by `name`.
    #[must_use]
    pub fn count_for(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }
}
