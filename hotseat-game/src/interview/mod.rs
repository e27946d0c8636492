//! Interview orchestration: phases, the turn lifecycle, and recovery paths.
//!
//! The orchestrator owns the authoritative [`InterviewState`]. The generative
//! backend only ever contributes text, options, and a contradiction flag; every
//! price change is computed locally by the [`ScoringEngine`] and clamped by the
//! configured delta guards before it lands.
//!
//! A turn is split into [`InterviewOrchestrator::begin_answer`] and
//! [`InterviewOrchestrator::complete_answer`] so callers can perform the backend
//! round trip however they like. Input is locked between the two calls, which
//! makes a second submission for the same turn impossible.

mod config;
pub mod event;
pub mod timer;

pub use config::{ConfigError, DeltaGuards, InterviewConfig};
pub use event::{EventId, EventKind, EventSeverity, InterviewEvent};
pub use timer::{Timer, TimerKind, TimerQueue};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::GenerativeBackend;
use crate::answers::{AnswerBucket, AnswerSet};
use crate::constants::{SESSION_LOST_LINE, SILENCE_NUDGE_LINE, TECHNICAL_DIFFICULTY_LINE};
use crate::normalizer::{HostTurnPayload, ResponseNormalizer};
use crate::numbers::round_cents;
use crate::prompt::{Profile, ProfileError};
use crate::result::{InterviewSummary, summarize};
use crate::scoring::{Pressure, ScoreContext, ScoringEngine, Tone};
use crate::session::{SessionError, SessionId, SessionStore};

/// Top-level screen the interview is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewPhase {
    #[default]
    Setup,
    Intro,
    Interview,
    Summary,
}

impl InterviewPhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Intro => "intro",
            Self::Interview => "interview",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for InterviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Still running.
    #[default]
    Pending,
    Success,
    Failure,
}

impl Outcome {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Which backend round trip a retry repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryKind {
    Opening,
    Answer,
}

/// Recovery the player has to take before play can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Transient backend failure; the same request may be sent again.
    Retry(RetryKind),
    /// The session is gone; only a full restart helps.
    Restart,
}

/// Most damaging answer of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstAnswer {
    pub turn: u32,
    pub bucket: AnswerBucket,
    pub text: String,
    pub delta: f64,
}

/// Authoritative per-run numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewState {
    pub price: f64,
    pub lowest_price: f64,
    pub awaiting_answer: bool,
    pub evasive_streak: u32,
    /// One-based index of the current question; 0 before the opening arrives.
    pub turn_index: u32,
    pub max_turns: u32,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_answer: Option<WorstAnswer>,
}

impl InterviewState {
    #[must_use]
    pub fn seeded(cfg: &InterviewConfig) -> Self {
        let price = round_cents(cfg.start_price);
        Self {
            price,
            lowest_price: price,
            awaiting_answer: false,
            evasive_streak: 0,
            turn_index: 0,
            max_turns: cfg.max_turns,
            outcome: Outcome::Pending,
            worst_answer: None,
        }
    }

    /// Apply a guarded delta. The price is floored at zero and rounded to cents.
    pub fn apply_delta(&mut self, delta: f64) -> f64 {
        self.price = round_cents((self.price + delta).max(0.0));
        self.lowest_price = self.lowest_price.min(self.price);
        self.price
    }

    /// Questions left after the current one.
    #[must_use]
    pub const fn turns_remaining(&self) -> u32 {
        self.max_turns.saturating_sub(self.turn_index)
    }

    fn record_worst(&mut self, turn: u32, bucket: AnswerBucket, text: &str, delta: f64) {
        if delta >= 0.0 {
            return;
        }
        // Ties keep the earlier answer.
        let replaces = self
            .worst_answer
            .as_ref()
            .is_none_or(|worst| delta < worst.delta);
        if replaces {
            self.worst_answer = Some(WorstAnswer {
                turn,
                bucket,
                text: text.to_string(),
                delta,
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Host,
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub turn: u32,
    pub speaker: Speaker,
    pub text: String,
}

/// Proof that input was locked for one submission.
///
/// Only the ticket for the turn in flight is accepted by
/// [`InterviewOrchestrator::complete_answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTicket {
    seq: u64,
    session: SessionId,
    turn: u32,
    bucket: AnswerBucket,
    text: String,
}

impl TurnTicket {
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    #[must_use]
    pub const fn session(&self) -> &SessionId {
        &self.session
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub const fn bucket(&self) -> AnswerBucket {
        self.bucket
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A scored answer as it was applied to the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTurn {
    pub turn: u32,
    pub bucket: AnswerBucket,
    pub contradiction: bool,
    pub delta: f64,
    pub tone: Tone,
    pub price: f64,
    /// Set when this answer ended the run.
    pub outcome: Option<Outcome>,
}

/// How a backend round trip resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnResolution {
    /// The opening question arrived and options are on offer.
    Opened,
    Scored(ScoredTurn),
    /// The round trip failed transiently; nothing was scored.
    RetryArmed(RetryKind),
}

/// Errors from orchestrator operations. Only `SessionLost` follows a state change.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterviewError {
    #[error("operation needs the {expected} phase, interview is in {actual}")]
    WrongPhase {
        expected: InterviewPhase,
        actual: InterviewPhase,
    },
    #[error("input is locked until the current turn resolves")]
    InputLocked,
    #[error("no answer options are on offer")]
    NoOptions,
    #[error("`{0}` was not offered this turn")]
    UnknownChoice(AnswerBucket),
    #[error("the interview has already finished")]
    Terminal,
    #[error("ticket {0} does not match the turn in flight")]
    StaleTicket(u64),
    #[error("there is nothing to retry")]
    NothingToRetry,
    #[error("no profile has been submitted")]
    MissingProfile,
    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),
    #[error("session `{0}` was lost; restart the interview")]
    SessionLost(SessionId),
}

/// Drives one player through setup, intro, interview, and summary.
#[derive(Debug)]
pub struct InterviewOrchestrator {
    cfg: InterviewConfig,
    phase: InterviewPhase,
    profile: Option<Profile>,
    state: InterviewState,
    session: Option<SessionId>,
    lost_session: Option<SessionId>,
    options: Option<AnswerSet>,
    in_flight: Option<u64>,
    next_ticket: u64,
    recovery: Option<Recovery>,
    pending_retry: Option<TurnTicket>,
    scoring: ScoringEngine,
    normalizer: ResponseNormalizer,
    timers: TimerQueue,
    clock_ms: u64,
    interview_started_ms: u64,
    transcript: Vec<TranscriptEntry>,
    events: Vec<InterviewEvent>,
    event_seq: u64,
}

impl InterviewOrchestrator {
    /// Build an orchestrator whose scoring stream is derived from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `cfg` fails validation.
    pub fn new(cfg: InterviewConfig, seed: u64) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let scoring = ScoringEngine::from_seed(cfg.scoring.clone(), seed);
        let normalizer = ResponseNormalizer::new(&cfg.option_keys, cfg.max_option_words);
        Ok(Self {
            state: InterviewState::seeded(&cfg),
            cfg,
            phase: InterviewPhase::Setup,
            profile: None,
            session: None,
            lost_session: None,
            options: None,
            in_flight: None,
            next_ticket: 1,
            recovery: None,
            pending_retry: None,
            scoring,
            normalizer,
            timers: TimerQueue::new(),
            clock_ms: 0,
            interview_started_ms: 0,
            transcript: Vec::new(),
            events: Vec::new(),
            event_seq: 0,
        })
    }

    /// Session store matching this orchestrator's option layout and turn count.
    #[must_use]
    pub fn open_store<B: GenerativeBackend>(&self, backend: B, seed: u64) -> SessionStore<B> {
        SessionStore::new(backend, &self.cfg.option_keys, self.cfg.max_turns, seed)
    }

    #[must_use]
    pub const fn config(&self) -> &InterviewConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn phase(&self) -> InterviewPhase {
        self.phase
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub const fn state(&self) -> &InterviewState {
        &self.state
    }

    #[must_use]
    pub const fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Session the store stopped recognizing, held until the next restart.
    #[must_use]
    pub const fn lost_session(&self) -> Option<&SessionId> {
        self.lost_session.as_ref()
    }

    #[must_use]
    pub const fn options(&self) -> Option<&AnswerSet> {
        self.options.as_ref()
    }

    #[must_use]
    pub const fn recovery(&self) -> Option<Recovery> {
        self.recovery
    }

    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    #[must_use]
    pub const fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Earliest pending timer deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Scoring draws consumed so far.
    #[must_use]
    pub const fn scoring_draws(&self) -> u64 {
        self.scoring.draws()
    }

    /// True whenever an answer cannot be submitted right now.
    #[must_use]
    pub const fn is_input_locked(&self) -> bool {
        self.in_flight.is_some() || !self.state.awaiting_answer
    }

    #[must_use]
    pub fn pending_events(&self) -> &[InterviewEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<InterviewEvent> {
        std::mem::take(&mut self.events)
    }

    /// Summary of the finished run; `None` until the summary phase.
    #[must_use]
    pub fn summary(&self) -> Option<InterviewSummary> {
        (self.phase == InterviewPhase::Summary).then(|| summarize(&self.state, &self.cfg))
    }

    /// Accept the player's profile and start the intro countdown.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside setup and `InvalidProfile` for blank fields.
    pub fn submit_profile(&mut self, profile: Profile) -> Result<(), InterviewError> {
        self.expect_phase(InterviewPhase::Setup)?;
        profile.validate()?;
        info!("profile accepted for {}", profile.name.trim());
        self.profile = Some(profile);
        self.enter_intro();
        Ok(())
    }

    /// Advance the logical clock and fire every timer that has come due.
    ///
    /// Clock values earlier than the current one are ignored.
    pub fn tick<B: GenerativeBackend>(
        &mut self,
        now_ms: u64,
        store: &mut SessionStore<B>,
    ) -> Vec<TimerKind> {
        if now_ms < self.clock_ms {
            debug!("ignoring clock regression from {} to {now_ms}", self.clock_ms);
        } else {
            self.clock_ms = now_ms;
        }
        let mut fired = Vec::new();
        while let Some(timer) = self.timers.pop_due(self.clock_ms) {
            fired.push(timer.kind);
            match timer.kind {
                TimerKind::IntroElapsed => {
                    if self.phase == InterviewPhase::Intro
                        && let Err(err) = self.open_interview(store)
                    {
                        error!("intro elapsed but the interview could not open: {err}");
                    }
                }
                TimerKind::Silence => self.nudge(),
            }
        }
        fired
    }

    /// Open the interview immediately instead of waiting for the intro timer.
    ///
    /// # Errors
    ///
    /// Returns `WrongPhase` outside the intro and `MissingProfile` if no profile
    /// was accepted.
    pub fn start_interview<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
    ) -> Result<TurnResolution, InterviewError> {
        self.expect_phase(InterviewPhase::Intro)?;
        self.open_interview(store)
    }

    /// Lock input and stage the chosen answer for sending.
    ///
    /// # Errors
    ///
    /// Returns `Terminal` once finished, `WrongPhase` outside the interview,
    /// `SessionLost` while a restart is required, `InputLocked` while a turn is
    /// in flight or not awaited, `NoOptions` when nothing is on offer, and
    /// `UnknownChoice` for a bucket that was not offered.
    pub fn begin_answer(&mut self, choice: AnswerBucket) -> Result<TurnTicket, InterviewError> {
        self.ensure_answerable()?;
        let text = self
            .options
            .as_ref()
            .ok_or(InterviewError::NoOptions)?
            .get(choice)
            .map(|option| option.text.clone())
            .ok_or(InterviewError::UnknownChoice(choice))?;
        let session = self.session.clone().ok_or(InterviewError::NoOptions)?;
        let ticket = self.lock_input(session, choice, text);
        self.transcript.push(TranscriptEntry {
            turn: ticket.turn,
            speaker: Speaker::Player,
            text: ticket.text.clone(),
        });
        debug!("turn {} submitted as {}", ticket.turn, ticket.bucket);
        Ok(ticket)
    }

    /// Re-lock input for the answer whose round trip failed.
    ///
    /// # Errors
    ///
    /// Returns `NothingToRetry` unless an answer retry is armed, plus the same
    /// phase and lock errors as [`Self::begin_answer`].
    pub fn begin_retry(&mut self) -> Result<TurnTicket, InterviewError> {
        self.ensure_answerable()?;
        if self.recovery != Some(Recovery::Retry(RetryKind::Answer)) {
            return Err(InterviewError::NothingToRetry);
        }
        let staged = self
            .pending_retry
            .take()
            .ok_or(InterviewError::NothingToRetry)?;
        self.recovery = None;
        info!("retrying turn {}", staged.turn);
        Ok(self.lock_input(staged.session, staged.bucket, staged.text))
    }

    /// Resolve the turn in flight with the backend's reply.
    ///
    /// A transport failure leaves price, streak, and turn untouched and arms a
    /// retry. An unknown session requires a restart and is reported as
    /// `SessionLost`.
    ///
    /// # Errors
    ///
    /// Returns `StaleTicket` for any ticket other than the one in flight,
    /// `Terminal` once finished, and `SessionLost` when the store no longer knows
    /// the session.
    pub fn complete_answer(
        &mut self,
        ticket: TurnTicket,
        reply: Result<Value, SessionError>,
    ) -> Result<TurnResolution, InterviewError> {
        if self.in_flight != Some(ticket.seq) {
            return Err(InterviewError::StaleTicket(ticket.seq));
        }
        if self.state.outcome.is_terminal() {
            return Err(InterviewError::Terminal);
        }
        self.in_flight = None;
        match reply {
            Ok(raw) => Ok(TurnResolution::Scored(self.score_turn(&ticket, &raw))),
            Err(SessionError::Backend(reason)) => {
                warn!("turn {} round trip failed: {reason}", ticket.turn);
                self.pending_retry = Some(ticket);
                Ok(self.arm_retry(RetryKind::Answer))
            }
            Err(SessionError::UnknownSession(id)) => {
                self.lose_session(&id);
                Err(InterviewError::SessionLost(id))
            }
        }
    }

    /// Submit `choice` and resolve it with a synchronous round trip.
    ///
    /// # Errors
    ///
    /// See [`Self::begin_answer`] and [`Self::complete_answer`].
    pub fn resolve_answer<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
        choice: AnswerBucket,
    ) -> Result<TurnResolution, InterviewError> {
        let ticket = self.begin_answer(choice)?;
        let reply = store.send(&ticket.session, &ticket.text, ticket.bucket);
        self.complete_answer(ticket, reply)
    }

    /// Repeat the round trip that last failed.
    ///
    /// # Errors
    ///
    /// Returns `NothingToRetry` when no retry is armed and `SessionLost` when a
    /// restart is required instead.
    pub fn retry<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
    ) -> Result<TurnResolution, InterviewError> {
        if self.state.outcome.is_terminal() {
            return Err(InterviewError::Terminal);
        }
        self.expect_phase(InterviewPhase::Interview)?;
        match self.recovery {
            Some(Recovery::Retry(RetryKind::Opening)) => {
                info!("retrying the opening request");
                self.request_opening(store)
            }
            Some(Recovery::Retry(RetryKind::Answer)) => {
                let ticket = self.begin_retry()?;
                let reply = store.send(&ticket.session, &ticket.text, ticket.bucket);
                self.complete_answer(ticket, reply)
            }
            Some(Recovery::Restart) => Err(self
                .session_lost_error()
                .unwrap_or(InterviewError::NothingToRetry)),
            None => Err(InterviewError::NothingToRetry),
        }
    }

    /// Discard the run and return to the intro with the same profile.
    ///
    /// # Errors
    ///
    /// Returns `MissingProfile` when called before a profile was accepted.
    pub fn restart<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
    ) -> Result<(), InterviewError> {
        if self.profile.is_none() {
            return Err(InterviewError::MissingProfile);
        }
        if let Some(id) = self.session.take()
            && store.end(&id)
        {
            debug!("ended session {id}");
        }
        self.lost_session = None;
        info!("restarting interview from {}", self.phase);
        self.timers.cancel_all();
        self.state = InterviewState::seeded(&self.cfg);
        self.options = None;
        self.in_flight = None;
        self.recovery = None;
        self.pending_retry = None;
        self.transcript.clear();
        self.enter_intro();
        Ok(())
    }

    fn expect_phase(&self, expected: InterviewPhase) -> Result<(), InterviewError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(InterviewError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn ensure_answerable(&self) -> Result<(), InterviewError> {
        if self.state.outcome.is_terminal() {
            return Err(InterviewError::Terminal);
        }
        self.expect_phase(InterviewPhase::Interview)?;
        if let Some(err) = self.session_lost_error() {
            return Err(err);
        }
        if self.is_input_locked() {
            return Err(InterviewError::InputLocked);
        }
        Ok(())
    }

    fn session_lost_error(&self) -> Option<InterviewError> {
        self.lost_session.clone().map(InterviewError::SessionLost)
    }

    fn transition(&mut self, to: InterviewPhase) {
        if self.phase == to {
            return;
        }
        let from = self.phase;
        self.timers.cancel_all();
        self.phase = to;
        debug!("phase {from} -> {to}");
        self.emit(EventKind::PhaseChanged { from, to });
    }

    fn enter_intro(&mut self) {
        self.transition(InterviewPhase::Intro);
        let due = self.clock_ms.saturating_add(self.cfg.intro_delay_ms);
        self.timers.schedule(TimerKind::IntroElapsed, due);
    }

    fn open_interview<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
    ) -> Result<TurnResolution, InterviewError> {
        if self.profile.is_none() {
            return Err(InterviewError::MissingProfile);
        }
        self.state = InterviewState::seeded(&self.cfg);
        self.session = None;
        self.lost_session = None;
        self.options = None;
        self.recovery = None;
        self.pending_retry = None;
        self.transition(InterviewPhase::Interview);
        self.interview_started_ms = self.clock_ms;
        self.request_opening(store)
    }

    fn request_opening<B: GenerativeBackend>(
        &mut self,
        store: &mut SessionStore<B>,
    ) -> Result<TurnResolution, InterviewError> {
        let profile = self.profile.as_ref().ok_or(InterviewError::MissingProfile)?;
        match store.create(profile) {
            Ok((id, raw)) => {
                info!("interview session {id} opened");
                self.session = Some(id);
                self.recovery = None;
                let payload = self.normalize(&raw);
                self.offer_turn(1, payload);
                Ok(TurnResolution::Opened)
            }
            Err(err) => {
                warn!("opening request failed: {err}");
                Ok(self.arm_retry(RetryKind::Opening))
            }
        }
    }

    fn lock_input(&mut self, session: SessionId, bucket: AnswerBucket, text: String) -> TurnTicket {
        let seq = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.in_flight = Some(seq);
        self.state.awaiting_answer = false;
        self.timers.cancel(TimerKind::Silence);
        TurnTicket {
            seq,
            session,
            turn: self.state.turn_index,
            bucket,
            text,
        }
    }

    fn score_turn(&mut self, ticket: &TurnTicket, raw: &Value) -> ScoredTurn {
        let payload = self.normalize(raw);
        if payload.bucket != ticket.bucket {
            debug!(
                "backend read turn {} as {}, player chose {}; keeping the player's bucket",
                ticket.turn, payload.bucket, ticket.bucket
            );
        }
        if payload.over {
            debug!("backend flagged the interview as over at turn {}", ticket.turn);
        }

        let ctx = ScoreContext {
            bucket: ticket.bucket,
            contradiction: payload.contradiction,
            evasive_streak: self.state.evasive_streak,
            pressure: Some(self.pressure()),
        };
        let scored = self.scoring.score(&ctx);
        let delta = self.cfg.delta_guards.apply(
            ticket.bucket,
            payload.contradiction,
            scored.delta,
            self.cfg.contradiction_floor,
        );
        if (delta - scored.delta).abs() > f64::EPSILON {
            warn!(
                "turn {} delta {:+.2} outside the {} guard, clamped to {delta:+.2}",
                ticket.turn, scored.delta, ticket.bucket
            );
        }

        self.state.evasive_streak = scored.next_evasive_streak;
        let price = self.state.apply_delta(delta);
        self.state
            .record_worst(ticket.turn, ticket.bucket, &ticket.text, delta);
        self.emit(EventKind::TurnScored {
            bucket: ticket.bucket,
            delta,
            tone: scored.tone,
            price,
        });
        debug!(
            "turn {} scored {:+.2} ({:?}), price {price:.2}",
            ticket.turn, delta, scored.tone
        );

        let outcome = if price < self.cfg.fail_threshold {
            Some(Outcome::Failure)
        } else if ticket.turn >= self.cfg.max_turns {
            Some(Outcome::Success)
        } else {
            None
        };
        match outcome {
            Some(outcome) => {
                self.host_line(payload.text);
                self.finish(outcome);
            }
            None => self.offer_turn(ticket.turn.saturating_add(1), payload),
        }

        ScoredTurn {
            turn: ticket.turn,
            bucket: ticket.bucket,
            contradiction: ctx.contradiction,
            delta,
            tone: scored.tone,
            price,
            outcome,
        }
    }

    fn pressure(&self) -> Pressure {
        let elapsed = self.clock_ms.saturating_sub(self.interview_started_ms);
        Pressure {
            turns_remaining: self.state.turns_remaining(),
            time_remaining_ms: self
                .cfg
                .time_budget_ms
                .map(|budget| budget.saturating_sub(elapsed)),
        }
    }

    fn offer_turn(&mut self, turn: u32, payload: HostTurnPayload) {
        self.state.turn_index = turn;
        self.host_line(payload.text);
        self.emit(EventKind::OptionsOffered {
            options: payload.options.clone(),
        });
        self.options = Some(payload.options);
        self.state.awaiting_answer = true;
        if let Some(timeout) = self.cfg.silence_timeout_ms {
            let due = self.clock_ms.saturating_add(timeout);
            self.timers.schedule(TimerKind::Silence, due);
        }
    }

    fn arm_retry(&mut self, retry: RetryKind) -> TurnResolution {
        self.host_line(TECHNICAL_DIFFICULTY_LINE.to_string());
        self.options = None;
        self.recovery = Some(Recovery::Retry(retry));
        self.state.awaiting_answer = true;
        self.emit(EventKind::RetryArmed { retry });
        TurnResolution::RetryArmed(retry)
    }

    fn lose_session(&mut self, id: &SessionId) {
        error!("session {id} is unknown to the store; restart required");
        self.host_line(SESSION_LOST_LINE.to_string());
        self.options = None;
        self.pending_retry = None;
        self.state.awaiting_answer = false;
        self.recovery = Some(Recovery::Restart);
        self.lost_session = Some(id.clone());
        self.timers.cancel(TimerKind::Silence);
        self.emit(EventKind::SessionLost {
            session: id.clone(),
        });
    }

    fn finish(&mut self, outcome: Outcome) {
        self.state.outcome = outcome;
        self.state.awaiting_answer = false;
        self.options = None;
        self.recovery = None;
        info!(
            "interview finished: {outcome:?} at {:.2} after {} turns",
            self.state.price, self.state.turn_index
        );
        self.transition(InterviewPhase::Summary);
        self.emit(EventKind::Finished {
            outcome,
            price: self.state.price,
        });
    }

    fn nudge(&mut self) {
        let waiting = self.phase == InterviewPhase::Interview
            && self.options.is_some()
            && !self.is_input_locked();
        if waiting {
            debug!("silence on turn {}", self.state.turn_index);
            self.host_line(SILENCE_NUDGE_LINE.to_string());
            self.emit(EventKind::SilenceNudge);
        }
    }

    fn normalize(&self, raw: &Value) -> HostTurnPayload {
        let (payload, repairs) = self.normalizer.normalize_with_report(raw);
        for repair in &repairs {
            warn!("host reply repaired: {repair:?}");
        }
        if let Some(sentiment) = &payload.sentiment {
            debug!("host sentiment: {sentiment}");
        }
        if let Some(reason) = &payload.reason {
            debug!("host reasoning: {reason}");
        }
        payload
    }

    fn host_line(&mut self, text: String) {
        self.transcript.push(TranscriptEntry {
            turn: self.state.turn_index,
            speaker: Speaker::Host,
            text: text.clone(),
        });
        self.emit(EventKind::HostLine { text });
    }

    fn emit(&mut self, kind: EventKind) {
        let id = EventId {
            turn: self.state.turn_index,
            seq: self.event_seq,
        };
        self.event_seq = self.event_seq.wrapping_add(1);
        self.events.push(InterviewEvent::new(id, kind));
    }
}
