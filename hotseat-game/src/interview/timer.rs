//! Logical timers driven by the caller's clock.
//!
//! Nothing here sleeps. The orchestrator schedules deadlines in milliseconds and
//! the caller advances time through `tick`, which keeps runs reproducible.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Intro presentation has run its course; open the interview.
    IntroElapsed,
    /// The player has been silent for too long this turn.
    Silence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub kind: TimerKind,
    pub due_ms: u64,
}

/// At most one pending timer per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerQueue {
    timers: SmallVec<[Timer; 2]>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind`, replacing any pending timer of the same kind.
    pub fn schedule(&mut self, kind: TimerKind, due_ms: u64) {
        self.cancel(kind);
        self.timers.push(Timer { kind, due_ms });
    }

    /// Returns whether a timer was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.kind != kind);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    #[must_use]
    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|timer| timer.kind == kind)
    }

    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|timer| timer.due_ms).min()
    }

    /// Remove and return the earliest timer due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<Timer> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due_ms <= now_ms)
            .min_by_key(|(_, timer)| timer.due_ms)
            .map(|(idx, _)| idx)?;
        Some(self.timers.remove(idx))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
