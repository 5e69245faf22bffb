//! Async game loop.
//!
//! The orchestrator advances one session at a time through its phases:
//!
//! ```text
//! DayDiscussion ──(every AI spoke)──▶ Voting ──(human voted or timed out)──▶ NightAction
//!       ▲                                                                         │
//!       └──────────────────────────────── day + 1 ◀──────────────────────────────┘
//! ```
//!
//! Text generation is the only slow step. The agent and its visible state
//! are cloned out under the lock, the lock is released for the LLM call, and
//! the result is recorded under a fresh lock.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info};
use wolfmind_core::config::HostConfig;
use wolfmind_core::{AgentState, GameState, Phase, VisibleState, Winner, WolfmindConfig};
use wolfmind_llm::{StatementGenerator, TextGenerator};

use crate::error::{HostError, Result};
use crate::events::GameUpdate;
use crate::registry::GameSession;

/// Drives sessions from first statement to game over.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    settings: HostConfig,
}

impl Orchestrator {
    /// Create an orchestrator with an explicit text generator.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, settings: HostConfig) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Orchestrator using the configured LLM, falling back to templates.
    #[must_use]
    pub fn from_config(config: &WolfmindConfig) -> Self {
        Self::new(
            Arc::new(StatementGenerator::from_config(&config.llm)),
            config.host.clone(),
        )
    }

    /// Perform the action the current phase calls for and return the phase
    /// the game is in afterwards.
    ///
    /// A game decided by the win check that precedes the action is announced
    /// with `game_over` here.
    ///
    /// # Errors
    /// A core rejection, which only happens if something other than this
    /// orchestrator advanced the same game concurrently.
    pub async fn step(&self, session: &GameSession) -> Result<Phase> {
        let (phase, decided) = session.with_game(|game| {
            let already_over = game.winner().is_some();
            let decided = game
                .check_game_end()
                .filter(|_| !already_over)
                .map(|winner| GameUpdate::GameOver {
                    winner,
                    day: game.day(),
                });
            (game.phase(), decided)
        });
        if let Some(update) = decided {
            info!(game = %session.id(), "Game decided before the phase action");
            session.publish([update]);
        }
        match phase {
            Phase::DayDiscussion => self.run_discussion(session).await?,
            Phase::Voting => self.run_voting(session).await?,
            Phase::NightAction => Self::run_night(session)?,
            Phase::GameOver => {}
        }
        Ok(session.read(GameState::phase))
    }

    /// Step until the game is decided.
    ///
    /// # Errors
    /// See [`Self::step`].
    pub async fn run_to_completion(&self, session: &GameSession) -> Result<Winner> {
        session.publish([session.read(GameUpdate::game_start)]);
        info!(game = %session.id(), "Orchestrator started");
        loop {
            if let Some(winner) = session.read(GameState::winner) {
                let day = session.read(GameState::day);
                info!(game = %session.id(), winner = ?winner, day, "Game finished");
                return Ok(winner);
            }
            self.step(session).await?;
            sleep(Duration::from_millis(self.settings.tick_interval_ms)).await;
        }
    }

    /// Run a session to completion on the tokio runtime.
    #[must_use]
    pub fn spawn(self: Arc<Self>, session: Arc<GameSession>) -> JoinHandle<Result<Winner>> {
        tokio::spawn(async move { self.run_to_completion(&session).await })
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn run_discussion(&self, session: &GameSession) -> Result<()> {
        let delay = Duration::from_millis(self.settings.statement_delay_ms);
        while let Some((agent, visible)) = session.read(next_speaker) {
            let text = self.generator.generate_statement(&agent, &visible).await;
            let updates = session.with_game(|game| {
                let outcome = game.record_statement(agent.name(), &text)?;
                Ok::<_, HostError>(GameUpdate::for_statement(&outcome, false, game.day()))
            })?;
            session.publish(updates);
            sleep(delay).await;
        }
        Ok(())
    }

    async fn run_voting(&self, session: &GameSession) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(self.settings.human_vote_timeout_ms);
        while session.read(awaiting_human_vote) {
            if timeout_at(deadline, session.vote_cast()).await.is_err() {
                Self::record_abstention(session);
                break;
            }
        }

        let updates = session.with_game(|game| {
            let outcome = game.resolve_voting()?;
            Ok::<_, HostError>(GameUpdate::for_vote(&outcome, game.day()))
        })?;
        session.publish(updates);
        Ok(())
    }

    fn record_abstention(session: &GameSession) {
        let result = session.with_game(|game| {
            let player = game.human().map(|h| h.name().to_string()).unwrap_or_default();
            game.abstain_human_vote().map(|()| player)
        });
        match result {
            Ok(player) => {
                info!(game = %session.id(), player = %player, "Human vote timed out; abstaining");
                session.publish([GameUpdate::PlayerVote {
                    player,
                    target: None,
                }]);
            }
            // The vote landed between the timeout and the lock.
            Err(e) => debug!(game = %session.id(), error = %e, "Abstention not recorded"),
        }
    }

    fn run_night(session: &GameSession) -> Result<()> {
        let updates = session.with_game(|game| {
            let outcome = game.resolve_night()?;
            if let Some(wolf) = &outcome.decided_by {
                debug!(game = %game.id(), wolf = %wolf, "Night kill decided");
            }
            Ok::<_, HostError>(GameUpdate::for_night(&outcome))
        })?;
        session.publish(updates);
        Ok(())
    }
}

/// The next AI agent due to speak, with what it can see.
fn next_speaker(game: &GameState) -> Option<(AgentState, VisibleState)> {
    if game.phase() != Phase::DayDiscussion {
        return None;
    }
    let name = game.pending_speakers().into_iter().next()?;
    let agent = game.agent(&name)?.clone();
    Some((agent, game.visible_state()))
}

fn awaiting_human_vote(game: &GameState) -> bool {
    game.phase() == Phase::Voting
        && game.human().is_some_and(AgentState::is_alive)
        && !game.human_has_voted()
}
