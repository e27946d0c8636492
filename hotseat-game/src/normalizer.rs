//! Response-contract enforcement for untrusted backend output.
//!
//! Whatever the generative backend returns is classified into one envelope
//! shape, then normalized along that shape's path into a single canonical
//! [`HostTurnPayload`]. Normalization never fails and never touches its input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::sync::OnceLock;

use crate::answers::{AnswerBucket, AnswerOption, AnswerSet};
use crate::constants::{
    FALLBACK_HOST_LINE, LEGACY_EVASIVE_IMPACT, LEGACY_GOOD_IMPACT, MAX_OPTION_WORDS,
};
use crate::numbers::finite_json_number;

/// Fully populated, safe-to-use host turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTurnPayload {
    pub text: String,
    /// The backend's own classification of the answer. Advisory only.
    pub bucket: AnswerBucket,
    pub contradiction: bool,
    /// Debug-only; never shown to the player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Debug-only; never shown to the player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub options: AnswerSet,
    pub over: bool,
}

/// Shape of a raw backend response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseEnvelope<'a> {
    /// Object carrying an explicit bucket classification.
    Current(&'a Map<String, Value>),
    /// Object carrying a numeric `impact` and free-text `tone` instead of a bucket.
    Legacy { fields: &'a Map<String, Value>, impact: f64 },
    /// Plain prose with no structure.
    Bare(&'a str),
    /// Anything else (null, numbers, booleans, arrays).
    Unusable,
}

/// Pure shape predicate mapping a raw value onto its envelope variant.
#[must_use]
pub fn classify_envelope(value: &Value) -> ResponseEnvelope<'_> {
    match value {
        Value::Object(fields) => {
            let impact = fields.get("impact").and_then(finite_json_number);
            match impact {
                Some(impact) if !fields.contains_key("bucket") => {
                    ResponseEnvelope::Legacy { fields, impact }
                }
                _ => ResponseEnvelope::Current(fields),
            }
        }
        Value::String(text) => ResponseEnvelope::Bare(text),
        _ => ResponseEnvelope::Unusable,
    }
}

/// Map a legacy numeric impact onto the bucket enum.
#[must_use]
pub fn bucket_from_impact(impact: f64) -> AnswerBucket {
    if impact >= LEGACY_GOOD_IMPACT {
        AnswerBucket::Good
    } else if impact <= LEGACY_EVASIVE_IMPACT {
        AnswerBucket::Evasive
    } else {
        AnswerBucket::Ok
    }
}

/// A repair applied while normalizing, reported for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "repair")]
pub enum Repair {
    UnusableEnvelope,
    BareText,
    LegacyEnvelope,
    FallbackText,
    UnknownBucket { raw: String },
    ContradictionCoerced,
    OverCoerced,
    OptionsPositional,
    OptionFallback { bucket: AnswerBucket },
    OptionShaped { bucket: AnswerBucket },
}

/// Normalizer bound to the option layout and word cap in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseNormalizer {
    option_keys: SmallVec<[AnswerBucket; 3]>,
    max_words: usize,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(
            &[AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Evasive],
            MAX_OPTION_WORDS,
        )
    }
}

impl ResponseNormalizer {
    #[must_use]
    pub fn new(option_keys: &[AnswerBucket], max_words: usize) -> Self {
        Self {
            option_keys: option_keys.iter().copied().collect(),
            max_words: max_words.max(1),
        }
    }

    #[must_use]
    pub fn option_keys(&self) -> &[AnswerBucket] {
        &self.option_keys
    }

    #[must_use]
    pub fn normalize(&self, value: &Value) -> HostTurnPayload {
        self.normalize_with_report(value).0
    }

    /// Normalize and report every repair that was needed.
    #[must_use]
    pub fn normalize_with_report(&self, value: &Value) -> (HostTurnPayload, Vec<Repair>) {
        let mut repairs = Vec::new();
        let payload = match classify_envelope(value) {
            ResponseEnvelope::Current(fields) => self.from_current(fields, &mut repairs),
            ResponseEnvelope::Legacy { fields, impact } => {
                repairs.push(Repair::LegacyEnvelope);
                self.from_legacy(fields, impact, &mut repairs)
            }
            ResponseEnvelope::Bare(text) => {
                repairs.push(Repair::BareText);
                self.defaults(host_text(Some(&Value::String(text.to_string())), &mut repairs))
            }
            ResponseEnvelope::Unusable => {
                repairs.push(Repair::UnusableEnvelope);
                self.defaults(host_text(None, &mut repairs))
            }
        };
        (payload, repairs)
    }

    fn defaults(&self, text: String) -> HostTurnPayload {
        HostTurnPayload {
            text,
            bucket: AnswerBucket::most_conservative(),
            contradiction: false,
            sentiment: None,
            reason: None,
            options: AnswerSet::fallback(&self.option_keys),
            over: false,
        }
    }

    fn from_current(
        &self,
        fields: &Map<String, Value>,
        repairs: &mut Vec<Repair>,
    ) -> HostTurnPayload {
        let text = host_text(fields.get("text"), repairs);
        let bucket = match fields.get("bucket") {
            Some(Value::String(raw)) => raw.parse().unwrap_or_else(|()| {
                repairs.push(Repair::UnknownBucket { raw: raw.clone() });
                AnswerBucket::most_conservative()
            }),
            other => {
                repairs.push(Repair::UnknownBucket {
                    raw: other.map(Value::to_string).unwrap_or_default(),
                });
                AnswerBucket::most_conservative()
            }
        };
        HostTurnPayload {
            text,
            bucket,
            contradiction: coerce_flag(
                fields.get("contradiction"),
                Repair::ContradictionCoerced,
                repairs,
            ),
            sentiment: optional_text(fields.get("sentiment")),
            reason: optional_text(fields.get("reason")),
            options: self.options(fields.get("options"), repairs),
            over: coerce_flag(fields.get("over"), Repair::OverCoerced, repairs),
        }
    }

    fn from_legacy(
        &self,
        fields: &Map<String, Value>,
        impact: f64,
        repairs: &mut Vec<Repair>,
    ) -> HostTurnPayload {
        let text = host_text(fields.get("host_line").or_else(|| fields.get("text")), repairs);
        let tone = optional_text(fields.get("tone"));
        let bucket = bucket_from_impact(impact);
        let reason = format!(
            "normalized from legacy envelope: impact {impact:+.2}, tone {}",
            tone.as_deref().unwrap_or("unspecified")
        );
        let done = fields.get("done").or_else(|| fields.get("over"));
        HostTurnPayload {
            text,
            bucket,
            contradiction: coerce_flag(
                fields.get("contradiction"),
                Repair::ContradictionCoerced,
                repairs,
            ),
            sentiment: tone,
            reason: Some(reason),
            options: self.options(
                fields.get("answers").or_else(|| fields.get("options")),
                repairs,
            ),
            over: coerce_flag(done, Repair::OverCoerced, repairs),
        }
    }

    fn options(&self, raw: Option<&Value>, repairs: &mut Vec<Repair>) -> AnswerSet {
        let positional = match raw {
            Some(Value::Array(items)) => {
                repairs.push(Repair::OptionsPositional);
                Some(items)
            }
            _ => None,
        };
        let keyed = raw.and_then(Value::as_object);
        let options = self.option_keys.iter().enumerate().map(|(idx, bucket)| {
            let candidate = match (keyed, positional) {
                (Some(map), _) => map.get(bucket.as_str()),
                (None, Some(items)) => items.get(idx),
                (None, None) => None,
            };
            let original = candidate.and_then(Value::as_str);
            let text = original.and_then(|text| shape_option_text(text, self.max_words));
            match (original, text) {
                (Some(original), Some(text)) => {
                    if text != original {
                        repairs.push(Repair::OptionShaped { bucket: *bucket });
                    }
                    AnswerOption { bucket: *bucket, text }
                }
                _ => {
                    repairs.push(Repair::OptionFallback { bucket: *bucket });
                    AnswerOption {
                        bucket: *bucket,
                        text: bucket.fallback_text().to_string(),
                    }
                }
            }
        });
        AnswerSet::new(options).unwrap_or_else(|| AnswerSet::fallback(&self.option_keys))
    }
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[.!?]+["')\]]*(?:\s|$)"#).expect("valid sentence regex"))
}

fn collapse_whitespace(text: &str) -> String {
    whitespace_re().replace_all(text.trim(), " ").into_owned()
}

/// Constrain an option to one sentence of at most `max_words` words.
///
/// Returns `None` when nothing visible remains.
#[must_use]
pub fn shape_option_text(text: &str, max_words: usize) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    let first_sentence = sentence_end_re()
        .find_iter(&collapsed)
        .find(|m| {
            let before = &collapsed[..m.start()];
            let abbreviated = m.as_str().starts_with('.') && ends_with_abbreviation(before);
            before.chars().any(char::is_alphanumeric) && !abbreviated
        })
        .map_or(collapsed.as_str(), |m| collapsed[..m.end()].trim_end());

    let words: Vec<&str> = first_sentence.split_whitespace().collect();
    if !words.iter().any(|w| w.chars().any(char::is_alphanumeric)) {
        return None;
    }
    let truncated = words.len() > max_words.max(1);
    let mut shaped = words[..words.len().min(max_words.max(1))].join(" ");
    if truncated || !ends_sentence(&shaped) {
        let trimmed_len = shaped
            .trim_end_matches(|c: char| !c.is_alphanumeric() && !matches!(c, '.' | '!' | '?'))
            .len();
        shaped.truncate(trimmed_len);
        if !ends_sentence(&shaped) {
            shaped.push('.');
        }
    }
    Some(shaped)
}

/// Whether the word right before a period is an initialism or title,
/// like "U.S", "e.g", "J" or "Dr", rather than the end of a sentence.
fn ends_with_abbreviation(before: &str) -> bool {
    const TITLES: [&str; 5] = ["mr", "mrs", "ms", "dr", "vs"];
    let token = before
        .rsplit(' ')
        .next()
        .unwrap_or_default()
        .trim_start_matches(['"', '\'', '(', '[']);
    if token == "I" {
        return false;
    }
    if TITLES.iter().any(|title| token.eq_ignore_ascii_case(title)) {
        return true;
    }
    !token.is_empty()
        && token
            .split('.')
            .all(|part| part.chars().count() == 1 && part.chars().all(char::is_alphabetic))
}

fn ends_sentence(text: &str) -> bool {
    text.trim_end_matches(['"', '\'', ')', ']'])
        .ends_with(['.', '!', '?'])
}

fn host_text(raw: Option<&Value>, repairs: &mut Vec<Repair>) -> String {
    match raw.and_then(Value::as_str).map(collapse_whitespace) {
        Some(text) if !text.is_empty() => text,
        _ => {
            repairs.push(Repair::FallbackText);
            FALLBACK_HOST_LINE.to_string()
        }
    }
}

fn optional_text(raw: Option<&Value>) -> Option<String> {
    raw.and_then(Value::as_str)
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
}

fn coerce_flag(raw: Option<&Value>, repair: Repair, repairs: &mut Vec<Repair>) -> bool {
    match raw {
        Some(Value::Bool(flag)) => *flag,
        None | Some(Value::Null) => false,
        Some(other) => {
            repairs.push(repair);
            match other {
                Value::Number(n) => n.as_f64().is_some_and(|v| v.is_finite() && v != 0.0),
                Value::String(s) => matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "yes" | "y" | "1"
                ),
                _ => false,
            }
        }
    }
}

/// Extract a JSON value from raw backend text.
///
/// Accepts bare JSON, JSON wrapped in markdown fences, or JSON embedded in
/// prose. Text with no recoverable JSON comes back as `Value::String`.
#[must_use]
pub fn parse_backend_text(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value;
    }
    if let Some(fenced) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(fenced)
    {
        return value;
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && start < end
        && let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end])
    {
        return value;
    }
    Value::String(trimmed.to_string())
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    let body_start = after.find('\n').map_or(0, |idx| idx + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
