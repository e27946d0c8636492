//! Hotseat Game Engine
//!
//! Platform-agnostic core logic for Hotseat, the live-interview stock game.
//! The crate owns the turn state machine, local scoring, and the normalization
//! of whatever the generative backend sends back. It performs no I/O of its own;
//! the backend is injected through [`GenerativeBackend`].

pub mod answers;
pub mod constants;
pub mod interview;
pub mod normalizer;
pub mod numbers;
pub mod prompt;
pub mod result;
pub mod rng;
pub mod scoring;
pub mod session;

// Re-export commonly used types
pub use answers::{AnswerBucket, AnswerOption, AnswerSet};
pub use interview::{
    ConfigError, DeltaGuards, EventKind, EventSeverity, InterviewConfig, InterviewError,
    InterviewEvent, InterviewOrchestrator, InterviewPhase, InterviewState, Outcome, Recovery,
    RetryKind, ScoredTurn, Speaker, TimerKind, TranscriptEntry, TurnResolution, TurnTicket,
    WorstAnswer,
};
pub use normalizer::{
    HostTurnPayload, Repair, ResponseEnvelope, ResponseNormalizer, classify_envelope,
    parse_backend_text,
};
pub use prompt::{ChatMessage, Profile, ProfileError, Role};
pub use result::{InterviewSummary, Verdict, summarize};
pub use rng::CountingRng;
pub use scoring::{
    Band, Pressure, ScoreContext, ScoreOutcome, ScoringCfg, ScoringConfigError, ScoringEngine,
    Tone, score,
};
pub use session::{Conversation, SessionError, SessionId, SessionStore};

/// Trait for abstracting the generative conversation backend.
/// Platform-specific implementations should provide this
pub trait GenerativeBackend {
    type Error: std::error::Error + 'static;

    /// Produce the next host reply for `history`, constrained by `schema`.
    ///
    /// The reply is raw text; the engine parses and normalizes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or refuses the request.
    fn generate(
        &self,
        history: &[ChatMessage],
        schema: &serde_json::Value,
    ) -> Result<String, Self::Error>;
}

/// One player's run: an orchestrator paired with the store that serves it.
#[derive(Debug)]
pub struct HotseatEngine<B: GenerativeBackend> {
    orchestrator: InterviewOrchestrator,
    store: SessionStore<B>,
}

impl<B: GenerativeBackend> HotseatEngine<B> {
    /// Create an engine whose scoring and session ids derive from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn new(cfg: InterviewConfig, backend: B, seed: u64) -> Result<Self, ConfigError> {
        let orchestrator = InterviewOrchestrator::new(cfg, seed)?;
        let store = orchestrator.open_store(backend, seed);
        Ok(Self {
            orchestrator,
            store,
        })
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &InterviewOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub const fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut SessionStore<B> {
        &mut self.store
    }

    /// # Errors
    ///
    /// See [`InterviewOrchestrator::submit_profile`].
    pub fn submit_profile(&mut self, profile: Profile) -> Result<(), InterviewError> {
        self.orchestrator.submit_profile(profile)
    }

    pub fn tick(&mut self, now_ms: u64) -> Vec<TimerKind> {
        self.orchestrator.tick(now_ms, &mut self.store)
    }

    /// Skip the rest of the intro and open the interview now.
    ///
    /// # Errors
    ///
    /// See [`InterviewOrchestrator::start_interview`].
    pub fn start_interview(&mut self) -> Result<TurnResolution, InterviewError> {
        self.orchestrator.start_interview(&mut self.store)
    }

    /// # Errors
    ///
    /// See [`InterviewOrchestrator::resolve_answer`].
    pub fn answer(&mut self, choice: AnswerBucket) -> Result<TurnResolution, InterviewError> {
        self.orchestrator.resolve_answer(&mut self.store, choice)
    }

    /// # Errors
    ///
    /// See [`InterviewOrchestrator::retry`].
    pub fn retry(&mut self) -> Result<TurnResolution, InterviewError> {
        self.orchestrator.retry(&mut self.store)
    }

    /// # Errors
    ///
    /// See [`InterviewOrchestrator::restart`].
    pub fn restart(&mut self) -> Result<(), InterviewError> {
        self.orchestrator.restart(&mut self.store)
    }

    pub fn drain_events(&mut self) -> Vec<InterviewEvent> {
        self.orchestrator.drain_events()
    }

    #[must_use]
    pub fn summary(&self) -> Option<InterviewSummary> {
        self.orchestrator.summary()
    }

    #[must_use]
    pub fn into_parts(self) -> (InterviewOrchestrator, SessionStore<B>) {
        (self.orchestrator, self.store)
    }
}
