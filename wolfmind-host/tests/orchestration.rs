//! End-to-end hosting tests: registry, orchestrator and update stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use wolfmind_core::{
    AgentState, GameState, Phase, Role, SequenceRandom, VisibleState, Winner, WolfmindConfig,
};
use wolfmind_host::{GameRegistry, GameSession, GameUpdate, Orchestrator};
use wolfmind_llm::{StatementGenerator, TextGenerator, fallback_statement};

/// Config with no pauses, a short human vote timeout and an API key
/// variable that is never set.
fn fast_config() -> WolfmindConfig {
    let mut config = WolfmindConfig::default();
    config.host.tick_interval_ms = 0;
    config.host.statement_delay_ms = 0;
    config.host.human_vote_timeout_ms = 20;
    config.llm.api_key_env = "WOLFMIND_TEST_KEY_THAT_IS_NEVER_SET".into();
    config
}

/// What an agent knew when it spoke, and what it said.
#[derive(Debug, Clone)]
struct Spoken {
    speaker: AgentState,
    visible: VisibleState,
    text: String,
}

/// Wraps a generator and records every statement it produces.
struct Recording {
    inner: StatementGenerator,
    seen: Mutex<Vec<Spoken>>,
}

impl Recording {
    fn new(inner: StatementGenerator) -> Self {
        Self {
            inner,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<Spoken> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for Recording {
    async fn generate_statement(&self, agent: &AgentState, visible: &VisibleState) -> String {
        let text = self.inner.generate_statement(agent, visible).await;
        self.seen.lock().push(Spoken {
            speaker: agent.clone(),
            visible: visible.clone(),
            text: text.clone(),
        });
        text
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<GameUpdate>) -> Vec<GameUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

// ---------------------------------------------------------------------------
// Discussion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn without_credential_every_statement_is_a_targeted_fallback() {
    let config = fast_config();
    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(Some("Player"), Some(11)).unwrap();
    let mut rx = session.subscribe();

    let recorder = Arc::new(Recording::new(StatementGenerator::from_config(&config.llm)));
    let orchestrator = Orchestrator::new(recorder.clone(), config.host.clone());

    let phase = orchestrator.step(&session).await.unwrap();
    assert_eq!(phase, Phase::Voting);

    let seen = recorder.seen();
    assert_eq!(seen.len(), 5, "one statement per AI agent");
    for spoken in &seen {
        assert!(!spoken.text.is_empty());
        let target = spoken.speaker.top_suspect().unwrap_or_else(|| "everyone".into());
        assert!(
            spoken.text.contains(&target),
            "{} said {:?} but suspects {target} most",
            spoken.speaker.name(),
            spoken.text
        );
        assert_eq!(spoken.text, fallback_statement(&spoken.speaker, &spoken.visible));
    }

    let updates = drain(&mut rx);
    let statements = updates
        .iter()
        .filter(|u| matches!(u, GameUpdate::AiStatement { .. }))
        .count();
    assert_eq!(statements, 5);
    assert!(matches!(
        updates.last(),
        Some(GameUpdate::PhaseChange {
            phase: Phase::Voting
        })
    ));
}

#[tokio::test]
async fn unreachable_llm_never_stalls_discussion() {
    let mut config = fast_config();
    config.llm.provider = "ollama".into();
    config.llm.base_url = "http://127.0.0.1:9".into();
    config.llm.max_retries = 0;
    config.llm.request_timeout_ms = 200;

    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(None, Some(3)).unwrap();
    let recorder = Arc::new(Recording::new(StatementGenerator::from_config(&config.llm)));
    let orchestrator = Orchestrator::new(recorder.clone(), config.host.clone());

    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::Voting);
    for spoken in recorder.seen() {
        assert_eq!(spoken.text, fallback_statement(&spoken.speaker, &spoken.visible));
    }
}

#[tokio::test]
async fn human_statement_between_ai_turns_is_accepted() {
    let config = fast_config();
    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(Some("Player"), Some(8)).unwrap();

    let target = session.read(|g| g.list_alive()[0].clone());
    let outcome = registry
        .submit_statement(session.id(), &format!("I am watching {target} closely."))
        .unwrap();
    assert_eq!(outcome.mentions.len(), 1);
    assert!(!outcome.phase_advanced);

    let orchestrator = Orchestrator::from_config(&config);
    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::Voting);
}

// ---------------------------------------------------------------------------
// Voting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn voting_waits_for_the_human() {
    let mut config = fast_config();
    config.host.human_vote_timeout_ms = 10_000;
    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(Some("Player"), Some(5)).unwrap();
    let orchestrator = Arc::new(Orchestrator::from_config(&config));

    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::Voting);
    let mut rx = session.subscribe();

    let voting = {
        let orchestrator = Arc::clone(&orchestrator);
        let session = Arc::clone(&session);
        tokio::spawn(async move { orchestrator.step(&session).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!voting.is_finished(), "voting must not resolve before the human acts");

    let target = session
        .read(|g| g.list_alive().into_iter().find(|n| n.as_str() != "Player"))
        .unwrap();
    registry.submit_vote(session.id(), &target).unwrap();

    let phase = tokio::time::timeout(Duration::from_secs(5), voting)
        .await
        .expect("voting resolves once the human voted")
        .unwrap()
        .unwrap();
    assert_ne!(phase, Phase::Voting);

    let updates = drain(&mut rx);
    assert!(matches!(
        &updates[0],
        GameUpdate::PlayerVote { player, target: Some(t) } if player == "Player" && *t == target
    ));
    let votes = updates
        .iter()
        .find_map(|u| match u {
            GameUpdate::VoteResults { votes, .. } => Some(votes.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(votes.get("Player"), Some(&target));
}

#[tokio::test]
async fn silent_human_abstains_after_timeout() {
    let config = fast_config();
    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(Some("Player"), Some(5)).unwrap();
    let orchestrator = Orchestrator::from_config(&config);

    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::Voting);
    let mut rx = session.subscribe();
    let phase = orchestrator.step(&session).await.unwrap();
    assert_ne!(phase, Phase::Voting);

    let updates = drain(&mut rx);
    assert!(matches!(
        &updates[0],
        GameUpdate::PlayerVote { player, target: None } if player == "Player"
    ));
    match &updates[1] {
        GameUpdate::VoteResults { votes, .. } => assert!(!votes.contains_key("Player")),
        other => panic!("expected vote results, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Whole games
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seeded_game_runs_to_completion() {
    let config = fast_config();
    let registry = GameRegistry::new(config.clone());
    let session = registry.create_game(None, Some(42)).unwrap();
    let mut rx = session.subscribe();
    let orchestrator = Orchestrator::from_config(&config);

    let winner = orchestrator.run_to_completion(&session).await.unwrap();
    assert!(session.is_over());

    let updates = drain(&mut rx);
    assert_eq!(updates.first().map(GameUpdate::kind), Some("game_start"));
    match updates.last() {
        Some(GameUpdate::GameOver { winner: announced, .. }) => assert_eq!(*announced, winner),
        other => panic!("expected game_over last, got {other:?}"),
    }
    assert!(
        updates
            .iter()
            .any(|u| matches!(u, GameUpdate::PlayerVote { target: None, .. })),
        "the silent human abstains on day one"
    );

    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::GameOver);
}

#[tokio::test]
async fn game_decided_before_any_action_still_announces_game_over() {
    let config = fast_config();
    let agents = vec![
        AgentState::new("A", Role::Wolf, ""),
        AgentState::new("B", Role::Wolf, ""),
        AgentState::new("C", Role::Villager, ""),
        AgentState::new("Player", Role::Villager, "").as_human(),
    ];
    let game = GameState::with_agents("parity", agents, &config, Box::new(SequenceRandom::neutral())).unwrap();
    let session = GameSession::new(game, 16);
    let mut rx = session.subscribe();
    let orchestrator = Orchestrator::from_config(&config);

    let winner = orchestrator.run_to_completion(&session).await.unwrap();
    assert_eq!(winner, Winner::Wolves);

    let kinds: Vec<&str> = drain(&mut rx).iter().map(GameUpdate::kind).collect();
    assert_eq!(kinds, ["game_start", "game_over"]);

    // A decided game is announced once.
    assert_eq!(orchestrator.step(&session).await.unwrap(), Phase::GameOver);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn games_advance_concurrently() {
    let config = fast_config();
    let registry = GameRegistry::new(config.clone());
    let orchestrator = Arc::new(Orchestrator::from_config(&config));

    let handles: Vec<_> = (1..=6)
        .map(|seed| {
            let session = registry.create_game(None, Some(seed)).unwrap();
            Arc::clone(&orchestrator).spawn(session)
        })
        .collect();
    assert_eq!(registry.len(), 6);

    for handle in handles {
        let result = tokio::time::timeout(Duration::from_secs(30), handle)
            .await
            .expect("game finishes")
            .unwrap();
        assert!(result.is_ok());
    }
}
