//! Event propagation: how a discrete event moves an agent's psychology.
//!
//! Each application first records a [`MemoryEvent`] and then applies the
//! event-specific nudge:
//!
//! | event | effect |
//! |---|---|
//! | accused | anger += 0.3·i, suspicion\[source\] += 0.2·i |
//! | defended | trust\[source\] += 0.2·i |
//! | voted | anger += 0.5·i, confidence −= 0.1 (floor 0.1) |
//! | killed | fear += 0.4·i |
//! | rumor | i > 0: suspicion\[target\] += 0.15·i, else trust\[target\] += 0.15·\|i\| |
//! | eliminated, attacked | accused-style nudge unless the recipient is the source |
//!
//! Every value is clamped to [0, 1] afterwards.

use tracing::debug;

use crate::agent::AgentState;
use crate::memory::MemoryEvent;
use crate::types::EventKind;

const ACCUSED_ANGER: f32 = 0.3;
const ACCUSED_SUSPICION: f32 = 0.2;
const DEFENDED_TRUST: f32 = 0.2;
const VOTED_ANGER: f32 = 0.5;
const VOTED_CONFIDENCE_DROP: f32 = 0.1;
const CONFIDENCE_FLOOR: f32 = 0.1;
const KILLED_FEAR: f32 = 0.4;
const RUMOR_FACTOR: f32 = 0.15;

/// Record and apply one event to `agent`.
pub fn apply_event(
    agent: &mut AgentState,
    kind: EventKind,
    source: &str,
    target: &str,
    impact: f32,
    turn: u32,
) {
    agent.remember(MemoryEvent::new(kind, source, target, impact, turn));

    match kind {
        EventKind::Accused => accused_nudge(agent, source, impact),
        EventKind::Defended => agent.adjust_trust(source, impact * DEFENDED_TRUST),
        EventKind::Voted => {
            let emotions = agent.emotions_mut();
            emotions.add_anger(impact * VOTED_ANGER);
            emotions.shake_confidence(VOTED_CONFIDENCE_DROP, CONFIDENCE_FLOOR);
        }
        EventKind::Killed => agent.emotions_mut().add_fear(impact * KILLED_FEAR),
        EventKind::Rumor => {
            if impact > 0.0 {
                agent.adjust_suspicion(target, impact * RUMOR_FACTOR);
            } else {
                agent.adjust_trust(target, impact.abs() * RUMOR_FACTOR);
            }
        }
        EventKind::Eliminated | EventKind::Attacked => {
            if agent.name() != source {
                accused_nudge(agent, source, impact);
            }
        }
    }

    debug!(
        agent = agent.name(),
        event = %kind,
        source,
        target,
        impact,
        emotions = %agent.emotions(),
        "Applied psychological event"
    );
}

fn accused_nudge(agent: &mut AgentState, source: &str, impact: f32) {
    agent.emotions_mut().add_anger(impact * ACCUSED_ANGER);
    agent.adjust_suspicion(source, impact * ACCUSED_SUSPICION);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn villager() -> AgentState {
        AgentState::new("Alice", Role::Villager, "")
    }

    #[test]
    fn accused_raises_anger_and_suspicion() {
        let mut a = villager();
        apply_event(&mut a, EventKind::Accused, "Bob", "Charlie", 0.2, 1);
        assert!(approx(a.emotions().anger(), 0.06));
        assert!(approx(a.suspicion_of("Bob").unwrap(), 0.04));
        assert_eq!(a.memory().len(), 1);
    }

    #[test]
    fn defended_raises_trust() {
        let mut a = villager();
        a.set_trust("Bob", 0.5);
        apply_event(&mut a, EventKind::Defended, "Bob", "Alice", 0.5, 1);
        assert!(approx(a.trust_of("Bob").unwrap(), 0.6));
    }

    #[test]
    fn voted_shakes_confidence_with_floor() {
        let mut a = villager();
        for _ in 0..10 {
            apply_event(&mut a, EventKind::Voted, "Bob", "Alice", 0.3, 1);
        }
        assert!(approx(a.emotions().confidence(), 0.1));
        assert!(approx(a.emotions().anger(), 1.0));
    }

    #[test]
    fn killed_raises_fear() {
        let mut a = villager();
        apply_event(&mut a, EventKind::Killed, "Eve", "Eve", 0.4, 3);
        assert!(approx(a.emotions().fear(), 0.16));
    }

    #[test]
    fn rumor_sign_selects_map() {
        let mut a = villager();
        apply_event(&mut a, EventKind::Rumor, "Alice", "Bob", 0.2, 1);
        assert!(approx(a.suspicion_of("Bob").unwrap(), 0.03));
        assert!(a.trust_of("Bob").is_none());

        apply_event(&mut a, EventKind::Rumor, "Alice", "Charlie", -0.2, 1);
        assert!(approx(a.trust_of("Charlie").unwrap(), 0.03));
        assert!(a.suspicion_of("Charlie").is_none());
    }

    #[test]
    fn attacked_nudges_toward_speaker() {
        let mut a = villager();
        apply_event(&mut a, EventKind::Attacked, "Bob", "Alice", 0.1, 1);
        assert!(approx(a.suspicion_of("Bob").unwrap(), 0.02));
        assert!(approx(a.emotions().anger(), 0.03));
    }

    #[test]
    fn eliminated_skips_the_source_itself() {
        let mut a = villager();
        apply_event(&mut a, EventKind::Eliminated, "Alice", "Alice", 0.2, 1);
        assert!(a.suspicion_of("Alice").is_none());
        assert!(approx(a.emotions().anger(), 0.0));
        assert_eq!(a.memory().len(), 1);

        apply_event(&mut a, EventKind::Eliminated, "Bob", "Bob", 0.2, 1);
        assert!(approx(a.suspicion_of("Bob").unwrap(), 0.04));
    }
}
