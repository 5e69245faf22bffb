//! Per-agent episodic memory: an append-only, capped event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EventKind;

/// One remembered psychological event. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// What happened.
    pub event_type: EventKind,
    /// Who caused it.
    pub source: String,
    /// Who it was about.
    pub target: String,
    /// Signed strength of the event.
    pub impact: f32,
    /// Game turn at which it happened.
    pub turn: u32,
    /// Wall-clock time of recording.
    pub timestamp: DateTime<Utc>,
}

impl MemoryEvent {
    /// Record an event now.
    #[must_use]
    pub fn new(
        event_type: EventKind,
        source: impl Into<String>,
        target: impl Into<String>,
        impact: f32,
        turn: u32,
    ) -> Self {
        Self {
            event_type,
            source: source.into(),
            target: target.into(),
            impact,
            turn,
            timestamp: Utc::now(),
        }
    }
}

/// Capped, order-preserving event log.
///
/// When a push takes the length past `cap`, the oldest events are dropped
/// until only the most recent `retain` remain. A deserialized log is
/// rebuilt through [`Self::new`] and [`Self::push`], so it obeys the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawMemoryLog")]
pub struct MemoryLog {
    events: Vec<MemoryEvent>,
    cap: usize,
    retain: usize,
}

#[derive(Deserialize)]
struct RawMemoryLog {
    events: Vec<MemoryEvent>,
    cap: usize,
    retain: usize,
}

impl From<RawMemoryLog> for MemoryLog {
    fn from(raw: RawMemoryLog) -> Self {
        let mut log = Self::new(raw.cap, raw.retain);
        for event in raw.events {
            log.push(event);
        }
        log
    }
}

impl MemoryLog {
    /// Create an empty log. `retain` is clamped to `1..=cap`.
    #[must_use]
    pub fn new(cap: usize, retain: usize) -> Self {
        let cap = cap.max(1);
        Self {
            events: Vec::with_capacity(cap + 1),
            cap,
            retain: retain.clamp(1, cap),
        }
    }

    /// Append an event, trimming if the cap is exceeded.
    pub fn push(&mut self, event: MemoryEvent) {
        self.events.push(event);
        if self.events.len() > self.cap {
            let excess = self.events.len() - self.retain;
            self.events.drain(..excess);
        }
    }

    /// Events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The most recent `n` events, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[MemoryEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Maximum length before a trim.
    #[must_use]
    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new(20, 15)
    }
}
