//! Scripted generative backends covering well-formed, legacy, flaky, and junk replies.

use std::cell::{Cell, RefCell};
use std::fmt;

use hotseat_game::{ChatMessage, GenerativeBackend, Role};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

const QUESTIONS: [&str; 6] = [
    "So what exactly does your company do?",
    "How do you plan to make money?",
    "Who are your competitors, really?",
    "What happens if your biggest customer walks away?",
    "Why should anyone trust your numbers?",
    "Where will you be in five years?",
];

const GOOD_LINES: [&str; 3] = [
    "We closed three enterprise contracts this quarter.",
    "Our margins improved for six straight months.",
    "Customers renew at ninety-four percent.",
];

const OK_LINES: [&str; 3] = [
    "We're still refining the pricing model.",
    "Growth has been steady if not spectacular.",
    "We have a plan and we're executing on it.",
];

const EVASIVE_LINES: [&str; 3] = [
    "I'd rather focus on the bigger picture.",
    "That's a conversation for another day.",
    "Let's not get lost in the details.",
];

/// Reply behavior of a [`ScriptedBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BackendKind {
    /// Schema-conformant replies.
    WellFormed,
    /// The old `{host_line, impact, tone, answers}` shape.
    Legacy,
    /// Well-formed, except every `every`-th call fails.
    Flaky { every: u32 },
    /// Prose, empty strings, fenced blocks, and wrongly typed fields.
    Garbage,
    /// Well-formed, but the session is forgotten after `forget_after` answers.
    Amnesiac { forget_after: u32 },
}

impl BackendKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WellFormed => "well-formed",
            Self::Legacy => "legacy",
            Self::Flaky { .. } => "flaky",
            Self::Garbage => "garbage",
            Self::Amnesiac { .. } => "amnesiac",
        }
    }

    #[must_use]
    pub const fn forget_after(self) -> Option<u32> {
        match self {
            Self::Amnesiac { forget_after } => Some(forget_after),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("scripted outage on call {call}")]
pub struct ScriptedOutage {
    pub call: u64,
}

/// Deterministic backend: replies depend only on the kind, seed, and history.
#[derive(Debug)]
pub struct ScriptedBackend {
    kind: BackendKind,
    calls: Cell<u64>,
    rng: RefCell<ChaCha20Rng>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new(kind: BackendKind, seed: u64) -> Self {
        Self {
            kind,
            calls: Cell::new(0),
            rng: RefCell::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    /// Requests received so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    fn well_formed(&self, history: &[ChatMessage]) -> Value {
        let mut rng = self.rng.borrow_mut();
        // The host only catches contradictions after an evasive answer.
        let contradiction = last_selected_bucket(history).as_deref() == Some("evasive")
            && rng.gen_bool(0.3);
        json!({
            "text": pick(&mut rng, &QUESTIONS),
            "bucket": "ok",
            "contradiction": contradiction,
            "sentiment": if contradiction { "pouncing" } else { "curious" },
            "reason": format!("history depth {}", history.len()),
            "options": {
                "good": pick(&mut rng, &GOOD_LINES),
                "ok": pick(&mut rng, &OK_LINES),
                "evasive": pick(&mut rng, &EVASIVE_LINES),
                "bad": "Honestly, we have no idea."
            },
            "over": false
        })
    }

    fn legacy(&self) -> Value {
        let mut rng = self.rng.borrow_mut();
        let impact: f64 = rng.gen_range(-4.0..2.0);
        json!({
            "host_line": pick(&mut rng, &QUESTIONS),
            "impact": impact,
            "tone": if impact < 0.0 { "skeptical" } else { "warm" },
            "answers": [
                pick(&mut rng, &GOOD_LINES),
                pick(&mut rng, &OK_LINES),
                pick(&mut rng, &EVASIVE_LINES)
            ],
            "done": false
        })
    }

    fn garbage(&self, call: u64) -> String {
        match call % 6 {
            0 => "Wow. Just wow. Let's move on, shall we?".to_string(),
            1 => String::new(),
            2 => format!(
                "Here you go:\n```json\n{}\n```",
                json!({ "text": "Fenced question?", "bucket": "good" })
            ),
            3 => "[\"not\", \"an\", \"object\"]".to_string(),
            4 => json!({
                "text": 42,
                "bucket": 7,
                "contradiction": "maybe",
                "options": "none",
                "over": "soon"
            })
            .to_string(),
            _ => json!({
                "text": "Give me the long version.",
                "bucket": "STRONG",
                "options": {
                    "good": "word ".repeat(60),
                    "ok": "   ",
                    "evasive": "First sentence. Second sentence that should be dropped."
                }
            })
            .to_string(),
        }
    }
}

impl GenerativeBackend for ScriptedBackend {
    type Error = ScriptedOutage;

    fn generate(&self, history: &[ChatMessage], _schema: &Value) -> Result<String, ScriptedOutage> {
        let call = self.calls.get().saturating_add(1);
        self.calls.set(call);
        match self.kind {
            BackendKind::Flaky { every } if every > 0 && call % u64::from(every) == 0 => {
                Err(ScriptedOutage { call })
            }
            BackendKind::Legacy => Ok(self.legacy().to_string()),
            BackendKind::Garbage => Ok(self.garbage(call)),
            BackendKind::WellFormed | BackendKind::Flaky { .. } | BackendKind::Amnesiac { .. } => {
                Ok(self.well_formed(history).to_string())
            }
        }
    }
}

fn pick<'a>(rng: &mut ChaCha20Rng, pool: &[&'a str]) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

fn last_selected_bucket(history: &[ChatMessage]) -> Option<String> {
    let last = history.iter().rev().find(|message| message.role == Role::User)?;
    let value: Value = serde_json::from_str(&last.content).ok()?;
    value
        .get("selected_bucket")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotseat_game::{AnswerBucket, ResponseNormalizer, parse_backend_text};

    fn history_with_answer(bucket: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, "persona"),
            ChatMessage::new(Role::User, "{\"event\":\"start\"}"),
            ChatMessage::new(Role::Assistant, "{}"),
            ChatMessage::new(
                Role::User,
                json!({ "answer": "hm", "selected_bucket": bucket }).to_string(),
            ),
        ]
    }

    #[test]
    fn flaky_fails_on_schedule() {
        let backend = ScriptedBackend::new(BackendKind::Flaky { every: 3 }, 1);
        let history = history_with_answer("good");
        let outcomes: Vec<bool> = (0..6)
            .map(|_| backend.generate(&history, &Value::Null).is_ok())
            .collect();
        assert_eq!(outcomes, vec![true, true, false, true, true, false]);
        assert_eq!(backend.calls(), 6);
    }

    #[test]
    fn well_formed_never_flags_good_answers() {
        let backend = ScriptedBackend::new(BackendKind::WellFormed, 5);
        let history = history_with_answer("good");
        for _ in 0..20 {
            let raw = backend.generate(&history, &Value::Null).unwrap();
            let value: Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(value["contradiction"], false);
        }
    }

    #[test]
    fn garbage_always_normalizes_to_usable_options() {
        let backend = ScriptedBackend::new(BackendKind::Garbage, 9);
        let normalizer = ResponseNormalizer::default();
        let history = history_with_answer("ok");
        for _ in 0..12 {
            let raw = backend.generate(&history, &Value::Null).unwrap();
            let payload = normalizer.normalize(&parse_backend_text(&raw));
            assert!(!payload.text.trim().is_empty());
            assert_eq!(payload.options.len(), 3);
            assert!(payload.options.contains(AnswerBucket::Evasive));
        }
    }

    #[test]
    fn legacy_replies_carry_impact() {
        let backend = ScriptedBackend::new(BackendKind::Legacy, 2);
        let raw = backend.generate(&[], &Value::Null).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert!(value["impact"].is_f64());
        assert!(value.get("bucket").is_none());
    }
}
