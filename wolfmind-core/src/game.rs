//! The phase state machine.
//!
//! A [`GameState`] owns the roster and sequences the day:
//!
//! ```text
//! DayDiscussion ──(every living AI spoke)──▶ Voting
//!       ▲                                      │
//!       │                            (votes resolved)
//!       │                                      ▼
//!       └──────────(kill computed, day+1)── NightAction
//!
//! any ──(win condition)──▶ GameOver
//! ```
//!
//! AI agents speak in an order shuffled afresh at the start of each day.
//!
//! Win conditions are checked before every phase action and again after
//! every transition. Once a winner is set the game is frozen: every
//! mutating call returns [`GameError::GameOver`].
//!
//! A `GameState` is single-threaded. Callers serialise access per game.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::agent::AgentState;
use crate::config::{DiscussionConfig, EventImpactConfig, RulesConfig, WolfmindConfig};
use crate::decision::{DecisionEngine, VoteTally};
use crate::error::{GameError, Result};
use crate::propagation::apply_event;
use crate::random::{RandomSource, shuffle};
use crate::types::{EventKind, Phase, PlayerAction, Role, Winner};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// An agent whose role became public (eliminated or killed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedAgent {
    /// Agent name.
    pub name: String,
    /// The role that was hidden until now.
    pub role: Role,
}

/// A name detected in a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mention {
    /// The mentioned agent.
    pub name: String,
    /// Impact applied to listeners; the mentioned agent got a fraction of it.
    pub impact: f32,
}

/// A rumor the speaker entertained after speaking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rumor {
    /// Whom the rumor concerns.
    pub target: String,
    /// Signed impact; positive raises suspicion, negative raises trust.
    pub impact: f32,
}

/// Result of one discussion statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementOutcome {
    /// Who spoke.
    pub speaker: String,
    /// What was said.
    pub text: String,
    /// Other living agents named in the text, in roster order.
    pub mentions: Vec<Mention>,
    /// Rumor applied to the speaker, if one was drawn.
    pub rumor: Option<Rumor>,
    /// Whether this statement closed the discussion.
    pub phase_advanced: bool,
    /// Set if the game ended.
    pub winner: Option<Winner>,
}

/// Result of resolving a voting phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteOutcome {
    /// All ballots and counts.
    pub tally: VoteTally,
    /// The unique vote leader, if there was one.
    pub eliminated: Option<RevealedAgent>,
    /// Set if the game ended.
    pub winner: Option<Winner>,
}

/// Result of resolving a night.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightOutcome {
    /// Who died, if the deciding wolf chose anyone.
    pub victim: Option<RevealedAgent>,
    /// The wolf whose choice was applied. Not for broadcast.
    #[serde(skip)]
    pub decided_by: Option<String>,
    /// The day that starts now.
    pub day: u32,
    /// Set if the game ended.
    pub winner: Option<Winner>,
}

/// The human's ballot for the current voting phase.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HumanBallot {
    Vote(String),
    Abstain,
}

// ---------------------------------------------------------------------------
// Game State
// ---------------------------------------------------------------------------

/// One game: roster, phase, clock and the randomness that drives it.
pub struct GameState {
    id: String,
    agents: Vec<AgentState>,
    phase: Phase,
    day: u32,
    turn: u32,
    winner: Option<Winner>,
    engine: DecisionEngine,
    discussion: DiscussionConfig,
    impacts: EventImpactConfig,
    rules: RulesConfig,
    rng: Box<dyn RandomSource>,
    speaking_order: Vec<String>,
    spoken_today: HashSet<String>,
    human_ballot: Option<HumanBallot>,
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameState")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("day", &self.day)
            .field("turn", &self.turn)
            .field("winner", &self.winner)
            .field("alive", &self.list_alive())
            .finish_non_exhaustive()
    }
}

impl GameState {
    /// Create a game from the configured roster.
    ///
    /// AI agents take `roster.ai_names` in order; `wolf_count` wolf roles are
    /// shuffled among them. The human villager is appended last, named
    /// `human_name` or the configured default.
    ///
    /// # Errors
    /// Returns `GameError::Config` if the configuration (including the
    /// human name override) is invalid.
    pub fn new(
        id: impl Into<String>,
        config: &WolfmindConfig,
        human_name: Option<&str>,
        mut rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        let mut config = config.clone();
        if let Some(name) = human_name {
            config.roster.human_name = name.to_string();
        }
        config.validate()?;

        let roster = &config.roster;
        let ai_count = roster.ai_names.len();
        let mut roles: Vec<Role> = (0..ai_count)
            .map(|i| if i < roster.wolf_count { Role::Wolf } else { Role::Villager })
            .collect();
        shuffle(rng.as_mut(), &mut roles);

        let (cap, retain) = (config.memory.max_log_len, config.memory.retain_len);
        let mut agents: Vec<AgentState> = roster
            .ai_names
            .iter()
            .zip(roles)
            .enumerate()
            .map(|(i, (name, role))| {
                AgentState::new(name.clone(), role, roster.personality_for(i))
                    .with_memory_limits(cap, retain)
            })
            .collect();
        agents.push(
            AgentState::new(roster.human_name.clone(), Role::Villager, "")
                .as_human()
                .with_memory_limits(cap, retain),
        );
        for agent in &mut agents {
            agent.seed_self_noise(rng.as_mut());
        }

        Self::with_agents(id, agents, &config, rng)
    }

    /// Create a game from a prepared roster, in seating order.
    ///
    /// # Errors
    /// Returns `GameError::Config` if the roster is empty or names are not
    /// unique and non-empty.
    pub fn with_agents(
        id: impl Into<String>,
        agents: Vec<AgentState>,
        config: &WolfmindConfig,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self> {
        if agents.is_empty() {
            return Err(GameError::Config("roster is empty".into()));
        }
        let mut seen = HashSet::new();
        for agent in &agents {
            if agent.name().trim().is_empty() {
                return Err(GameError::Config("agent names must be non-empty".into()));
            }
            if !seen.insert(agent.name()) {
                return Err(GameError::Config(format!("duplicate agent name: {}", agent.name())));
            }
        }

        let mut game = Self {
            id: id.into(),
            agents,
            phase: Phase::DayDiscussion,
            day: 1,
            turn: 0,
            winner: None,
            engine: DecisionEngine::new(config.decision.clone()),
            discussion: config.discussion.clone(),
            impacts: config.events.clone(),
            rules: config.rules.clone(),
            rng,
            speaking_order: Vec::new(),
            spoken_today: HashSet::new(),
            human_ballot: None,
        };
        game.shuffle_speaking_order();
        info!(
            game = %game.id,
            agents = game.agents.len(),
            wolves = game.count_by_role(Role::Wolf),
            "Game created"
        );
        Ok(game)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Opaque game id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current day, starting at 1.
    #[must_use]
    pub fn day(&self) -> u32 {
        self.day
    }

    /// Statements made so far.
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// The winner, once decided.
    #[must_use]
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Configured day limit.
    #[must_use]
    pub fn max_days(&self) -> u32 {
        self.rules.max_days
    }

    /// Every agent in seating order, dead ones included.
    #[must_use]
    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    /// Look up an agent by name.
    #[must_use]
    pub fn agent(&self, name: &str) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// The human agent, if the roster has one.
    #[must_use]
    pub fn human(&self) -> Option<&AgentState> {
        self.agents.iter().find(|a| a.is_human())
    }

    /// Names of living agents in seating order.
    #[must_use]
    pub fn list_alive(&self) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Number of living agents with `role`.
    #[must_use]
    pub fn count_by_role(&self, role: Role) -> usize {
        self.agents
            .iter()
            .filter(|a| a.is_alive() && a.role() == role)
            .count()
    }

    /// Living AI agents that have not spoken today, in today's speaking order.
    #[must_use]
    pub fn pending_speakers(&self) -> Vec<String> {
        self.speaking_order
            .iter()
            .filter(|name| !self.spoken_today.contains(name.as_str()))
            .filter(|name| self.agent(name).is_some_and(AgentState::is_alive))
            .cloned()
            .collect()
    }

    /// Whether `name` has spoken today.
    #[must_use]
    pub fn has_spoken(&self, name: &str) -> bool {
        self.spoken_today.contains(name)
    }

    /// Whether the human has voted or abstained in the current voting phase.
    #[must_use]
    pub fn human_has_voted(&self) -> bool {
        self.human_ballot.is_some()
    }

    /// Evaluate the win conditions, setting the winner on first success.
    ///
    /// Idempotent: once a winner is set it is returned unchanged.
    pub fn check_game_end(&mut self) -> Option<Winner> {
        if self.winner.is_some() {
            return self.winner;
        }

        let wolves = self.count_by_role(Role::Wolf);
        let villagers = self.count_by_role(Role::Villager);
        let winner = if wolves == 0 {
            Some(Winner::Villagers)
        } else if wolves >= villagers || self.day > self.rules.max_days {
            Some(Winner::Wolves)
        } else {
            None
        };

        if let Some(w) = winner {
            self.winner = Some(w);
            self.phase = Phase::GameOver;
            info!(game = %self.id, winner = %w, day = self.day, wolves, villagers, "Game over");
        }
        winner
    }

    // -----------------------------------------------------------------------
    // Discussion
    // -----------------------------------------------------------------------

    /// Record one statement by `speaker` and propagate its effects.
    ///
    /// Every other living agent named in `text` counts as a mention: listeners
    /// receive `accused`, the mentioned agent receives `attacked`. The speaker
    /// may then entertain a rumor. When the last living AI agent has spoken,
    /// the phase moves to voting.
    ///
    /// # Errors
    /// Rejects without mutation when the game is over, the phase is wrong,
    /// the speaker is unknown or eliminated, or already spoke today.
    pub fn record_statement(&mut self, speaker: &str, text: &str) -> Result<StatementOutcome> {
        self.guard(PlayerAction::Statement, Phase::DayDiscussion)?;
        let speaker_idx = self.living_index(speaker)?;
        if self.spoken_today.contains(speaker) {
            return Err(GameError::DuplicateSubmission {
                action: PlayerAction::Statement,
                agent: speaker.to_string(),
            });
        }

        let turn = self.turn;
        let alive = self.list_alive();

        let mut mentions = Vec::new();
        for mentioned in alive.iter().filter(|n| n.as_str() != speaker) {
            if !text.contains(mentioned.as_str()) {
                continue;
            }
            let impact = self.rng.uniform(
                self.discussion.accusation_impact_min,
                self.discussion.accusation_impact_max,
            );
            let attack = impact * self.discussion.attack_ratio;
            for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
                if agent.name() == speaker {
                    continue;
                }
                if agent.name() == mentioned.as_str() {
                    apply_event(agent, EventKind::Attacked, speaker, mentioned, attack, turn);
                } else {
                    apply_event(agent, EventKind::Accused, speaker, mentioned, impact, turn);
                }
            }
            mentions.push(Mention {
                name: mentioned.clone(),
                impact,
            });
        }

        let mut rumor = None;
        if self.rng.chance(self.discussion.rumor_probability) {
            let others: Vec<&String> = alive.iter().filter(|n| n.as_str() != speaker).collect();
            if !others.is_empty() {
                let target = others[self.rng.index(others.len())].clone();
                let impact = self
                    .rng
                    .uniform(self.discussion.rumor_impact_min, self.discussion.rumor_impact_max);
                apply_event(
                    &mut self.agents[speaker_idx],
                    EventKind::Rumor,
                    speaker,
                    &target,
                    impact,
                    turn,
                );
                rumor = Some(Rumor { target, impact });
            }
        }

        self.turn += 1;
        self.spoken_today.insert(speaker.to_string());
        debug!(game = %self.id, speaker, mentions = mentions.len(), turn = self.turn, "Statement recorded");

        let phase_advanced = self.pending_speakers().is_empty();
        if phase_advanced {
            self.transition(Phase::Voting);
        }
        let winner = self.check_game_end();

        Ok(StatementOutcome {
            speaker: speaker.to_string(),
            text: text.to_string(),
            mentions,
            rumor,
            phase_advanced,
            winner,
        })
    }

    /// Record the human's statement for today.
    ///
    /// The text is scanned like any other statement, but the human never
    /// gates the move to voting.
    ///
    /// # Errors
    /// As [`Self::record_statement`], plus `MissingHumanAgent`.
    pub fn submit_human_statement(&mut self, text: &str) -> Result<StatementOutcome> {
        let human = self.human_name()?;
        self.record_statement(&human, text)
    }

    // -----------------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------------

    /// Record the human's vote against a living roster member.
    ///
    /// # Errors
    /// Rejects without mutation when the game is over, the phase is wrong,
    /// the human is missing, eliminated or already voted, or the target is
    /// not a living roster member.
    pub fn submit_human_vote(&mut self, target: &str) -> Result<()> {
        let human = self.ready_human_ballot()?;
        if self.living_index(target).is_err() {
            return Err(GameError::UnknownTarget(target.to_string()));
        }
        debug!(game = %self.id, voter = %human, target, "Human vote recorded");
        self.human_ballot = Some(HumanBallot::Vote(target.to_string()));
        Ok(())
    }

    /// Record that the human will not vote this phase.
    ///
    /// # Errors
    /// Same phase and eligibility rules as [`Self::submit_human_vote`].
    pub fn abstain_human_vote(&mut self) -> Result<()> {
        let human = self.ready_human_ballot()?;
        debug!(game = %self.id, voter = %human, "Human abstained");
        self.human_ballot = Some(HumanBallot::Abstain);
        Ok(())
    }

    /// Cast every AI vote, apply them, and eliminate a unique leader.
    ///
    /// The phase advances to night whether or not anyone was eliminated.
    ///
    /// # Errors
    /// `AwaitingVotes` if the living human has neither voted nor abstained,
    /// plus the usual phase and game-over rejections.
    pub fn resolve_voting(&mut self) -> Result<VoteOutcome> {
        self.guard(PlayerAction::ResolveVoting, Phase::Voting)?;
        if let Some(human) = self.human().filter(|h| h.is_alive())
            && self.human_ballot.is_none()
        {
            return Err(GameError::AwaitingVotes {
                pending: vec![human.name().to_string()],
            });
        }

        let alive = self.list_alive();
        let mut ballots = Vec::with_capacity(alive.len());
        for agent in self.agents.iter().filter(|a| a.is_alive()) {
            if agent.is_human() {
                if let Some(HumanBallot::Vote(target)) = &self.human_ballot {
                    ballots.push((agent.name().to_string(), target.clone()));
                }
                continue;
            }
            let target = self.engine.decide_vote(agent, &alive, self.rng.as_mut());
            if target == agent.name() {
                if alive.len() >= 2 {
                    error!(game = %self.id, voter = agent.name(), "Agent voted for itself; counting as abstention");
                }
                continue;
            }
            ballots.push((agent.name().to_string(), target));
        }

        let impact = self.impacts.voted;
        for (voter, target) in &ballots {
            if let Some(agent) = self.agents.iter_mut().find(|a| a.name() == target) {
                apply_event(agent, EventKind::Voted, voter, target, impact, self.turn);
                agent.record_vote_received();
            }
        }

        let tally = VoteTally::from_ballots(ballots);
        let eliminated = tally.unique_leader().map(str::to_string).and_then(|name| self.eliminate(&name));
        match &eliminated {
            Some(out) => info!(game = %self.id, day = self.day, eliminated = %out.name, role = %out.role, "Vote eliminated agent"),
            None => info!(game = %self.id, day = self.day, counts = ?tally.counts, "Vote tied; nobody eliminated"),
        }

        self.transition(Phase::NightAction);
        let winner = self.check_game_end();
        Ok(VoteOutcome {
            tally,
            eliminated,
            winner,
        })
    }

    // -----------------------------------------------------------------------
    // Night
    // -----------------------------------------------------------------------

    /// Apply the night kill and start the next day.
    ///
    /// Wolves are asked in seating order; the first one that names a victim
    /// decides. `day` increments even when nobody dies.
    ///
    /// # Errors
    /// The usual phase and game-over rejections.
    pub fn resolve_night(&mut self) -> Result<NightOutcome> {
        self.guard(PlayerAction::NightKill, Phase::NightAction)?;

        let alive = self.list_alive();
        let mut decision = None;
        for agent in &self.agents {
            if agent.night_actor().is_none() {
                continue;
            }
            if let Some(target) = self.engine.decide_night_kill(agent, &alive, self.rng.as_mut()) {
                decision = Some((agent.name().to_string(), target));
                break;
            }
        }

        let (decided_by, victim) = match decision {
            Some((wolf, target)) => {
                let revealed = self.kill(&target);
                (Some(wolf), revealed)
            }
            None => (None, None),
        };
        match &victim {
            Some(v) => info!(game = %self.id, day = self.day, victim = %v.name, role = %v.role, "Night kill"),
            None => info!(game = %self.id, day = self.day, "Quiet night"),
        }

        self.day += 1;
        self.spoken_today.clear();
        self.human_ballot = None;
        self.shuffle_speaking_order();
        self.transition(Phase::DayDiscussion);
        let winner = self.check_game_end();

        Ok(NightOutcome {
            victim,
            decided_by,
            day: self.day,
            winner,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn guard(&mut self, action: PlayerAction, expected: Phase) -> Result<()> {
        if let Some(winner) = self.check_game_end() {
            return Err(GameError::GameOver { winner });
        }
        if self.phase != expected {
            return Err(GameError::InvalidPhaseAction {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Draw today's speaking order from the living AI agents.
    fn shuffle_speaking_order(&mut self) {
        let mut order: Vec<String> = self
            .agents
            .iter()
            .filter(|a| a.is_alive() && !a.is_human())
            .map(|a| a.name().to_string())
            .collect();
        shuffle(self.rng.as_mut(), &mut order);
        debug!(game = %self.id, day = self.day, order = ?order, "Speaking order drawn");
        self.speaking_order = order;
    }

    fn transition(&mut self, to: Phase) {
        info!(game = %self.id, from = %self.phase, to = %to, day = self.day, "Phase transition");
        self.phase = to;
    }

    fn living_index(&self, name: &str) -> Result<usize> {
        let idx = self
            .agents
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| GameError::UnknownTarget(name.to_string()))?;
        if self.agents[idx].is_alive() {
            Ok(idx)
        } else {
            Err(GameError::AgentEliminated(name.to_string()))
        }
    }

    fn human_name(&self) -> Result<String> {
        self.human()
            .map(|h| h.name().to_string())
            .ok_or(GameError::MissingHumanAgent)
    }

    fn ready_human_ballot(&mut self) -> Result<String> {
        self.guard(PlayerAction::Vote, Phase::Voting)?;
        let human = self.human_name()?;
        self.living_index(&human)?;
        if self.human_ballot.is_some() {
            return Err(GameError::DuplicateSubmission {
                action: PlayerAction::Vote,
                agent: human,
            });
        }
        Ok(human)
    }

    /// Vote someone out; survivors get `eliminated`.
    fn eliminate(&mut self, name: &str) -> Option<RevealedAgent> {
        let impact = self.impacts.eliminated;
        self.remove_and_notify(name, EventKind::Eliminated, impact)
    }

    /// Night kill; survivors get `killed`.
    fn kill(&mut self, name: &str) -> Option<RevealedAgent> {
        let impact = self.impacts.killed;
        self.remove_and_notify(name, EventKind::Killed, impact)
    }

    fn remove_and_notify(&mut self, name: &str, kind: EventKind, impact: f32) -> Option<RevealedAgent> {
        let turn = self.turn;
        let victim = self.agents.iter_mut().find(|a| a.name() == name && a.is_alive())?;
        victim.eliminate();
        let revealed = RevealedAgent {
            name: victim.name().to_string(),
            role: victim.role(),
        };
        for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
            apply_event(agent, kind, name, name, impact, turn);
        }
        Some(revealed)
    }
}
