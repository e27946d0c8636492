//! Structured events emitted by the interview orchestrator.
//!
//! Presentation layers drain these instead of diffing state; every variant
//! carries what a renderer needs and nothing it has to recompute.

use serde::{Deserialize, Serialize};

use crate::answers::{AnswerBucket, AnswerSet};
use crate::interview::{InterviewPhase, Outcome, RetryKind};
use crate::scoring::Tone;
use crate::session::SessionId;

/// Stable, deterministic identifier for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId {
    /// Turn index in effect when the event was emitted (0 before the interview opens).
    pub turn: u32,
    /// Monotonic sequence number across the whole run.
    pub seq: u64,
}

/// Severity tier for an interview event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Mechanical event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
    PhaseChanged {
        from: InterviewPhase,
        to: InterviewPhase,
    },
    HostLine {
        text: String,
    },
    OptionsOffered {
        options: AnswerSet,
    },
    TurnScored {
        bucket: AnswerBucket,
        delta: f64,
        tone: Tone,
        price: f64,
    },
    RetryArmed {
        retry: RetryKind,
    },
    SilenceNudge,
    SessionLost {
        session: SessionId,
    },
    Finished {
        outcome: Outcome,
        price: f64,
    },
}

impl EventKind {
    #[must_use]
    pub const fn severity(&self) -> EventSeverity {
        match self {
            Self::PhaseChanged { .. }
            | Self::HostLine { .. }
            | Self::OptionsOffered { .. }
            | Self::TurnScored { .. }
            | Self::Finished { .. } => EventSeverity::Info,
            Self::RetryArmed { .. } | Self::SilenceNudge => EventSeverity::Warning,
            Self::SessionLost { .. } => EventSeverity::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewEvent {
    pub id: EventId,
    pub severity: EventSeverity,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl InterviewEvent {
    #[must_use]
    pub fn new(id: EventId, kind: EventKind) -> Self {
        Self {
            id,
            severity: kind.severity(),
            kind,
        }
    }
}
