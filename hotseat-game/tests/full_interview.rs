use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

use hotseat_game::{
    AnswerBucket, ChatMessage, EventKind, GenerativeBackend, HotseatEngine, InterviewConfig,
    InterviewError, InterviewPhase, Outcome, Profile, Recovery, RetryKind, Speaker,
    TurnResolution, Verdict,
};
use serde_json::{Value, json};

#[derive(Debug)]
struct Unreachable;

impl fmt::Display for Unreachable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("connection refused")
    }
}

impl std::error::Error for Unreachable {}

/// Replays raw text replies in order and records every request.
#[derive(Default)]
struct Replay {
    replies: RefCell<VecDeque<Result<String, Unreachable>>>,
    requests: Cell<usize>,
}

impl Replay {
    fn with(replies: impl IntoIterator<Item = Result<String, Unreachable>>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().collect()),
            requests: Cell::new(0),
        }
    }
}

impl GenerativeBackend for Replay {
    type Error = Unreachable;

    fn generate(&self, _history: &[ChatMessage], _schema: &Value) -> Result<String, Unreachable> {
        self.requests.set(self.requests.get() + 1);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(current("Anything else?").to_string()))
    }
}

fn current(text: &str) -> Value {
    json!({
        "text": text,
        "bucket": "good",
        "contradiction": false,
        "sentiment": "curious",
        "options": {
            "good": "Our retention is ninety percent.",
            "ok": "We are finding our footing.",
            "evasive": "Let's talk about something else."
        },
        "over": false
    })
}

fn legacy(text: &str, impact: f64) -> Value {
    json!({
        "host_line": text,
        "impact": impact,
        "tone": "skeptical",
        "answers": ["We beat guidance.", "It's complicated.", "No comment."]
    })
}

fn engine(cfg: InterviewConfig, backend: Replay, seed: u64) -> HotseatEngine<Replay> {
    let mut engine = HotseatEngine::new(cfg, backend, seed).unwrap();
    engine
        .submit_profile(Profile::new("Ada", "Make compilers friendly").with_industry("devtools"))
        .unwrap();
    engine.start_interview().unwrap();
    engine
}

fn cfg(max_turns: u32) -> InterviewConfig {
    InterviewConfig {
        max_turns,
        ..InterviewConfig::default()
    }
}

#[test]
fn legacy_envelopes_drive_a_full_interview() {
    let backend = Replay::with(
        [
            legacy("Welcome to the show.", 0.0),
            legacy("Bold claim.", 1.2),
            legacy("Hmm.", -3.0),
            legacy("Last one.", 0.1),
        ]
        .map(|value| Ok(value.to_string())),
    );
    let mut engine = engine(cfg(4), backend, 21);
    let options = engine.orchestrator().options().unwrap();
    assert_eq!(
        options.get(AnswerBucket::Good).map(|option| option.text.as_str()),
        Some("We beat guidance.")
    );

    for choice in [
        AnswerBucket::Good,
        AnswerBucket::Ok,
        AnswerBucket::Good,
        AnswerBucket::Good,
    ] {
        engine.answer(choice).unwrap();
    }
    let summary = engine.summary().unwrap();
    assert_eq!(summary.outcome, Outcome::Success);
    assert_eq!(summary.turns_played, 4);
    assert!(summary.final_price > 100.0);
    let host_lines: Vec<_> = engine
        .orchestrator()
        .transcript()
        .iter()
        .filter(|entry| entry.speaker == Speaker::Host)
        .map(|entry| entry.text.clone())
        .collect();
    assert_eq!(host_lines[0], "Welcome to the show.");
    assert_eq!(host_lines[1], "Bold claim.");
}

#[test]
fn prose_and_junk_replies_never_stall_the_interview() {
    let backend = Replay::with([
        Ok("Welcome! Tell me about yourself.".to_string()),
        Ok(String::new()),
        Ok("```json\n{\"text\": \"Fenced reply.\", \"bucket\": \"ok\"}\n```".to_string()),
        Ok("[1, 2, 3]".to_string()),
    ]);
    let mut engine = engine(cfg(3), backend, 5);
    assert_eq!(engine.orchestrator().options().map(|set| set.len()), Some(3));

    for _ in 0..3 {
        let resolution = engine.answer(AnswerBucket::Ok).unwrap();
        assert!(matches!(resolution, TurnResolution::Scored(_)));
        if let Some(options) = engine.orchestrator().options() {
            assert!(options.iter().all(|option| !option.text.trim().is_empty()));
        }
    }
    assert_eq!(engine.orchestrator().state().outcome, Outcome::Success);
    let texts: Vec<_> = engine
        .orchestrator()
        .transcript()
        .iter()
        .map(|entry| entry.text.as_str())
        .collect();
    assert!(texts.contains(&"Welcome! Tell me about yourself."));
    assert!(texts.contains(&"Fenced reply."));
}

#[test]
fn flaky_backend_recovers_through_retries() {
    let mut replies = Vec::new();
    for turn in 0..6 {
        if turn % 2 == 1 {
            replies.push(Err(Unreachable));
        }
        replies.push(Ok(current(&format!("Question {turn}")).to_string()));
    }
    let mut engine = engine(cfg(5), Replay::with(replies), 99);

    let mut scored = 0_u64;
    let mut retries = 0;
    while !engine.orchestrator().state().outcome.is_terminal() {
        let mut resolution = engine.answer(AnswerBucket::Good).unwrap();
        while resolution == TurnResolution::RetryArmed(RetryKind::Answer) {
            retries += 1;
            assert_eq!(
                engine.orchestrator().recovery(),
                Some(Recovery::Retry(RetryKind::Answer))
            );
            resolution = engine.retry().unwrap();
        }
        assert!(matches!(resolution, TurnResolution::Scored(_)));
        scored += 1;
        assert_eq!(engine.orchestrator().scoring_draws(), scored);
    }
    assert_eq!(scored, 5);
    assert!(retries >= 2);
    assert_eq!(engine.orchestrator().state().outcome, Outcome::Success);
}

#[test]
fn lost_session_restarts_from_intro() {
    let mut engine = engine(cfg(3), Replay::default(), 8);
    engine.answer(AnswerBucket::Evasive).unwrap();
    let id = engine.orchestrator().session_id().cloned().unwrap();
    engine.store_mut().end(&id);

    let err = engine.answer(AnswerBucket::Good).unwrap_err();
    assert_eq!(err, InterviewError::SessionLost(id));
    assert!(
        engine
            .drain_events()
            .iter()
            .any(|event| matches!(event.kind, EventKind::SessionLost { .. }))
    );

    engine.restart().unwrap();
    assert_eq!(engine.orchestrator().phase(), InterviewPhase::Intro);
    let due = engine.orchestrator().next_deadline().unwrap();
    engine.tick(due);
    assert_eq!(engine.orchestrator().phase(), InterviewPhase::Interview);
    assert_eq!(engine.orchestrator().state().turn_index, 1);
    assert_eq!(engine.orchestrator().state().evasive_streak, 0);
}

#[test]
fn evasive_run_collapses_before_max_turns() {
    let mut engine = engine(cfg(8), Replay::default(), 3);
    let mut turns = 0;
    while !engine.orchestrator().state().outcome.is_terminal() {
        engine.answer(AnswerBucket::Evasive).unwrap();
        turns += 1;
    }
    let summary = engine.summary().unwrap();
    assert_eq!(summary.outcome, Outcome::Failure);
    assert_eq!(summary.verdict, Verdict::Collapse);
    assert!(turns < 8);
    assert!(summary.final_price < 85.0);
    assert!((summary.lowest_price - summary.final_price).abs() < f64::EPSILON);
    let worst = summary.worst_answer.unwrap();
    assert_eq!(worst.bucket, AnswerBucket::Evasive);
    assert!(worst.delta < 0.0);
}

#[test]
fn every_request_carries_the_conversation() {
    let mut engine = engine(cfg(2), Replay::default(), 4);
    engine.answer(AnswerBucket::Good).unwrap();
    let id = engine.orchestrator().session_id().cloned().unwrap();
    let conversation = engine.store().conversation(&id).unwrap();
    // system, opening, reply, answer, reply
    assert_eq!(conversation.history.len(), 5);
    assert_eq!(conversation.turns_sent, 1);
    assert_eq!(engine.store().backend().requests.get(), 2);
}
