//! Game registry: bounded, concurrent map of running sessions.
//!
//! Each [`GameSession`] owns one [`GameState`] behind a `parking_lot::Mutex`.
//! The lock is only ever held for synchronous core calls, never across an
//! `.await`, so sessions advance independently on any tokio worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use tracing::{debug, info, warn};
use uuid::Uuid;
use wolfmind_core::{
    GameSnapshot, GameState, RandomSource, Role, SeededRandom, StatementOutcome, Viewer, Winner,
    WolfmindConfig,
};

use crate::error::{HostError, Result};
use crate::events::GameUpdate;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One running game and its update channel.
pub struct GameSession {
    id: String,
    game: Mutex<GameState>,
    last_activity: Mutex<Instant>,
    updates: broadcast::Sender<GameUpdate>,
    vote_cast: Notify,
}

impl GameSession {
    /// Wrap a game. `capacity` bounds the update backlog per subscriber.
    #[must_use]
    pub fn new(game: GameState, capacity: usize) -> Self {
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self {
            id: game.id().to_string(),
            game: Mutex::new(game),
            last_activity: Mutex::new(Instant::now()),
            updates,
            vote_cast: Notify::new(),
        }
    }

    /// Game id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Receive every update published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GameUpdate> {
        self.updates.subscribe()
    }

    /// Run `f` with exclusive access to the game and mark the session active.
    pub fn with_game<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        *self.last_activity.lock() = Instant::now();
        let mut game = self.game.lock();
        f(&mut game)
    }

    /// Run `f` against the game without touching the activity clock.
    pub fn read<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        let game = self.game.lock();
        f(&game)
    }

    /// Broadcast updates. Having no subscribers is not an error.
    pub fn publish(&self, updates: impl IntoIterator<Item = GameUpdate>) {
        for update in updates {
            if self.updates.send(update).is_err() {
                debug!(game = %self.id, "No subscribers for update");
            }
        }
    }

    /// Time since the last mutation.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Whether the game has a winner.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.read(|g| g.winner().is_some())
    }

    /// A snapshot as seen by `viewer`.
    #[must_use]
    pub fn snapshot(&self, viewer: &Viewer) -> GameSnapshot {
        self.read(|g| g.snapshot(viewer))
    }

    /// Resolves once the human votes (or a stale notification is pending).
    pub(crate) async fn vote_cast(&self) {
        self.vote_cast.notified().await;
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("subscribers", &self.updates.receiver_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All sessions hosted by this process.
#[derive(Debug)]
pub struct GameRegistry {
    sessions: DashMap<String, Arc<GameSession>>,
    /// Serialises the capacity check with the insert.
    creation: Mutex<()>,
    config: WolfmindConfig,
}

impl GameRegistry {
    /// Create an empty registry. Every game it creates uses `config`.
    #[must_use]
    pub fn new(config: WolfmindConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            creation: Mutex::new(()),
            config,
        }
    }

    /// The configuration games are created with.
    #[must_use]
    pub fn config(&self) -> &WolfmindConfig {
        &self.config
    }

    /// Create and register a new game.
    ///
    /// `player_name` overrides the configured human name. A `seed` makes the
    /// game reproducible; without one the game draws from OS entropy.
    /// Concurrent calls are serialised, so `max_games` is a hard limit.
    ///
    /// # Errors
    /// `RegistryFull` when at capacity after evicting expired sessions, or
    /// the game's configuration error.
    pub fn create_game(&self, player_name: Option<&str>, seed: Option<u64>) -> Result<Arc<GameSession>> {
        let limit = self.config.host.max_games;
        let _creating = self.creation.lock();
        if self.sessions.len() >= limit {
            self.evict_expired();
            if self.sessions.len() >= limit {
                warn!(limit, "Game registry full");
                return Err(HostError::RegistryFull { limit });
            }
        }

        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        let rng: Box<dyn RandomSource> = match seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        };
        let game = GameState::new(id.clone(), &self.config, player_name, rng)?;
        let session = Arc::new(GameSession::new(game, self.config.host.update_channel_capacity));

        self.sessions.insert(id.clone(), Arc::clone(&session));
        info!(game = %id, seeded = seed.is_some(), active = self.sessions.len(), "Game registered");
        Ok(session)
    }

    /// Look up a session.
    ///
    /// # Errors
    /// `UnknownGame` if no session has this id.
    pub fn get(&self, game_id: &str) -> Result<Arc<GameSession>> {
        self.sessions
            .get(game_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| HostError::UnknownGame(game_id.to_string()))
    }

    /// Remove a session. Returns whether it existed.
    pub fn close(&self, game_id: &str) -> bool {
        let removed = self.sessions.remove(game_id).is_some();
        if removed {
            info!(game = %game_id, "Game closed");
        }
        removed
    }

    /// Drop sessions idle for longer than the configured TTL. Returns how
    /// many were removed.
    pub fn evict_expired(&self) -> usize {
        let ttl = Duration::from_secs(self.config.host.registry_ttl_secs);
        self.evict_idle_longer_than(ttl)
    }

    /// Drop sessions idle for longer than `ttl`.
    pub fn evict_idle_longer_than(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.idle_for() <= ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted, ttl_secs = ttl.as_secs(), "Evicted idle games");
        }
        evicted
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // -----------------------------------------------------------------------
    // Human actions
    // -----------------------------------------------------------------------

    /// The human speaks in the current discussion.
    ///
    /// # Errors
    /// `UnknownGame`, or the core's rejection (wrong phase, already spoke,
    /// eliminated, game over). Rejections leave the game untouched.
    pub fn submit_statement(&self, game_id: &str, text: &str) -> Result<StatementOutcome> {
        let session = self.get(game_id)?;
        let result = session.with_game(|game| {
            let outcome = game.submit_human_statement(text)?;
            let updates = GameUpdate::for_statement(&outcome, true, game.day());
            Ok::<_, HostError>((outcome, updates))
        });
        match result {
            Ok((outcome, updates)) => {
                session.publish(updates);
                Ok(outcome)
            }
            Err(e) => {
                warn!(game = %game_id, error = %e, "Rejected human statement");
                Err(e)
            }
        }
    }

    /// The human votes against `target`.
    ///
    /// # Errors
    /// `UnknownGame`, or the core's rejection (wrong phase, already voted,
    /// unknown or dead target, game over).
    pub fn submit_vote(&self, game_id: &str, target: &str) -> Result<()> {
        let session = self.get(game_id)?;
        let result = session.with_game(|game| {
            game.submit_human_vote(target)?;
            Ok::<_, HostError>(game.human().map(|h| h.name().to_string()).unwrap_or_default())
        });
        match result {
            Ok(player) => {
                session.publish([GameUpdate::PlayerVote {
                    player,
                    target: Some(target.to_string()),
                }]);
                session.vote_cast.notify_one();
                Ok(())
            }
            Err(e) => {
                warn!(game = %game_id, target, error = %e, "Rejected human vote");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Game queries
    // -----------------------------------------------------------------------

    /// Names of the living agents in `game_id`, in seating order.
    ///
    /// # Errors
    /// `UnknownGame` if no session has this id.
    pub fn list_alive(&self, game_id: &str) -> Result<Vec<String>> {
        Ok(self.get(game_id)?.read(GameState::list_alive))
    }

    /// Living agents with `role` in `game_id`.
    ///
    /// # Errors
    /// `UnknownGame` if no session has this id.
    pub fn count_by_role(&self, game_id: &str, role: Role) -> Result<usize> {
        Ok(self.get(game_id)?.read(|game| game.count_by_role(role)))
    }

    /// Evaluate the win conditions of `game_id`. A game decided by this
    /// call is announced with `game_over`.
    ///
    /// # Errors
    /// `UnknownGame` if no session has this id.
    pub fn check_game_end(&self, game_id: &str) -> Result<Option<Winner>> {
        let session = self.get(game_id)?;
        let (winner, newly_decided) = session.with_game(|game| {
            let already_over = game.winner().is_some();
            let winner = game.check_game_end();
            (winner, winner.is_some() && !already_over)
        });
        if let Some(winner) = winner.filter(|_| newly_decided) {
            let day = session.read(GameState::day);
            session.publish([GameUpdate::GameOver { winner, day }]);
        }
        Ok(winner)
    }

    /// Snapshot of a game as seen by `viewer`.
    ///
    /// # Errors
    /// `UnknownGame` if no session has this id.
    pub fn snapshot(&self, game_id: &str, viewer: &Viewer) -> Result<GameSnapshot> {
        Ok(self.get(game_id)?.snapshot(viewer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wolfmind_core::{GameError, Phase};

    fn registry(max_games: usize) -> GameRegistry {
        let mut config = WolfmindConfig::default();
        config.host.max_games = max_games;
        GameRegistry::new(config)
    }

    #[test]
    fn create_and_get() {
        let reg = registry(4);
        let session = reg.create_game(Some("Hero"), Some(7)).unwrap();
        assert_eq!(session.id().len(), 8);
        assert_eq!(reg.len(), 1);

        let again = reg.get(session.id()).unwrap();
        assert!(Arc::ptr_eq(&session, &again));
        assert_eq!(again.read(|g| g.human().map(|h| h.name().to_string())), Some("Hero".to_string()));
    }

    #[test]
    fn unknown_game_is_reported() {
        let reg = registry(4);
        assert!(matches!(reg.get("nope"), Err(HostError::UnknownGame(id)) if id == "nope"));
        assert!(!reg.close("nope"));
    }

    #[test]
    fn capacity_is_enforced() {
        let reg = registry(2);
        reg.create_game(None, Some(1)).unwrap();
        reg.create_game(None, Some(2)).unwrap();
        let err = reg.create_game(None, Some(3)).unwrap_err();
        assert!(matches!(err, HostError::RegistryFull { limit: 2 }));
    }

    #[test]
    fn concurrent_creation_respects_capacity() {
        let reg = registry(3);
        let shared = &reg;
        let created = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|seed| scope.spawn(move || shared.create_game(None, Some(seed)).is_ok()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap_or(false)).filter(|&ok| ok).count()
        });
        assert_eq!(created, 3);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn game_queries_are_keyed_by_id() {
        let reg = registry(4);
        let session = reg.create_game(Some("Hero"), Some(2)).unwrap();
        let id = session.id();

        let alive = reg.list_alive(id).unwrap();
        assert_eq!(alive.len(), 6);
        assert_eq!(alive.last().map(String::as_str), Some("Hero"));
        assert_eq!(reg.count_by_role(id, Role::Wolf).unwrap(), 1);
        assert_eq!(reg.count_by_role(id, Role::Villager).unwrap(), 5);
        assert_eq!(reg.check_game_end(id).unwrap(), None);

        assert!(matches!(reg.list_alive("nope"), Err(HostError::UnknownGame(_))));
        assert!(matches!(reg.count_by_role("nope", Role::Wolf), Err(HostError::UnknownGame(_))));
        assert!(matches!(reg.check_game_end("nope"), Err(HostError::UnknownGame(_))));
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let reg = registry(4);
        let session = reg.create_game(None, Some(1)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(reg.evict_idle_longer_than(Duration::from_secs(60)), 0);
        assert_eq!(reg.evict_idle_longer_than(Duration::from_millis(5)), 1);
        assert!(reg.is_empty());
        assert!(matches!(reg.get(session.id()), Err(HostError::UnknownGame(_))));
    }

    #[test]
    fn close_removes_session() {
        let reg = registry(4);
        let session = reg.create_game(None, Some(1)).unwrap();
        assert!(reg.close(session.id()));
        assert!(reg.is_empty());
    }

    #[test]
    fn human_statement_is_broadcast() {
        let reg = registry(4);
        let session = reg.create_game(Some("Hero"), Some(3)).unwrap();
        let mut rx = session.subscribe();

        let outcome = reg.submit_statement(session.id(), "I trust nobody").unwrap();
        assert_eq!(outcome.speaker, "Hero");
        match rx.try_recv().unwrap() {
            GameUpdate::PlayerStatement { player, statement, .. } => {
                assert_eq!(player, "Hero");
                assert_eq!(statement, "I trust nobody");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = reg.submit_statement(session.id(), "again").unwrap_err();
        assert!(matches!(err, HostError::Game(GameError::DuplicateSubmission { .. })));
    }

    #[test]
    fn vote_outside_voting_is_rejected() {
        let reg = registry(4);
        let session = reg.create_game(None, Some(3)).unwrap();
        let target = session.read(|g| g.list_alive()[0].clone());
        let err = reg.submit_vote(session.id(), &target).unwrap_err();
        assert!(matches!(err, HostError::Game(e) if e.is_phase_violation()));
        assert_eq!(session.read(GameState::phase), Phase::DayDiscussion);
    }

    #[test]
    fn snapshot_hides_roles_from_observers() {
        let reg = registry(4);
        let session = reg.create_game(None, Some(3)).unwrap();
        let snap = reg.snapshot(session.id(), &Viewer::Observer).unwrap();
        assert_eq!(snap.game_id, session.id());
        assert!(snap.agents.iter().all(|a| a.role.is_none()));
    }
}
