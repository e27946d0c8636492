//! Host persona, response schema, and outgoing message tagging.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::answers::AnswerBucket;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the conversation history handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Errors raised when a player profile is incomplete.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile field `{0}` must not be empty")]
    MissingField(&'static str),
}

/// Player-supplied profile that frames the interview.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub mission: String,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>, mission: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            industry: None,
            mission: mission.into(),
        }
    }

    #[must_use]
    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Check that every required field carries visible text.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::MissingField` naming the first empty field.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::MissingField("name"));
        }
        if self.mission.trim().is_empty() {
            return Err(ProfileError::MissingField("mission"));
        }
        Ok(())
    }

    fn industry_label(&self) -> &str {
        self.industry
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("an undisclosed industry")
    }
}

/// System-level persona and ruleset for the host.
#[must_use]
pub fn system_prompt(profile: &Profile, option_keys: &[AnswerBucket], max_turns: u32) -> String {
    let keys = option_keys
        .iter()
        .map(|bucket| bucket.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    [
        format!(
            "You are the host of a live financial news show interviewing {} about their company in {}.",
            profile.name.trim(),
            profile.industry_label()
        ),
        format!("Their stated mission: \"{}\".", profile.mission.trim()),
        format!("Ask one pointed question per turn. The interview lasts {max_turns} questions."),
        "Each player message is JSON with `answer` and `selected_bucket`; react in character to the answer."
            .to_string(),
        "Set `contradiction` to true only if the answer conflicts with something the guest said earlier."
            .to_string(),
        format!(
            "Offer the next answer options keyed exactly as: {keys}. Each option is one sentence of at most 18 words."
        ),
        "Reply with a single JSON object matching the provided schema and nothing else.".to_string(),
    ]
    .join("\n")
}

/// Opening request sent right after the system prompt.
#[must_use]
pub fn opening_message() -> String {
    json!({ "event": "start", "instruction": "Introduce the guest and ask the first question." })
        .to_string()
}

/// Outgoing player message tagged with the bucket the player actually chose.
#[must_use]
pub fn answer_message(text: &str, bucket: AnswerBucket) -> String {
    json!({ "answer": text, "selected_bucket": bucket.as_str() }).to_string()
}

/// JSON schema describing the expected host reply.
#[must_use]
pub fn response_schema(option_keys: &[AnswerBucket]) -> Value {
    let option_props: serde_json::Map<String, Value> = option_keys
        .iter()
        .map(|bucket| (bucket.as_str().to_string(), json!({ "type": "string" })))
        .collect();
    let required: Vec<&str> = option_keys.iter().map(|bucket| bucket.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string" },
            "bucket": { "type": "string", "enum": AnswerBucket::ALL.map(AnswerBucket::as_str) },
            "contradiction": { "type": "boolean" },
            "sentiment": { "type": "string" },
            "reason": { "type": "string" },
            "options": {
                "type": "object",
                "properties": option_props,
                "required": required,
            },
            "over": { "type": "boolean" }
        },
        "required": ["text", "bucket", "contradiction", "options", "over"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_requires_name_and_mission() {
        assert_eq!(
            Profile::new("  ", "ship it").validate(),
            Err(ProfileError::MissingField("name"))
        );
        assert_eq!(
            Profile::new("Ada", "").validate(),
            Err(ProfileError::MissingField("mission"))
        );
        assert!(Profile::new("Ada", "ship it").validate().is_ok());
    }

    #[test]
    fn system_prompt_mentions_profile_and_keys() {
        let profile = Profile::new("Ada", "Make compilers friendly").with_industry("devtools");
        let prompt = system_prompt(&profile, &[AnswerBucket::Good, AnswerBucket::Evasive], 5);
        assert!(prompt.contains("Ada"));
        assert!(prompt.contains("devtools"));
        assert!(prompt.contains("good, evasive"));
        assert!(prompt.contains("5 questions"));
    }

    #[test]
    fn system_prompt_is_one_rule_per_line() {
        let profile = Profile::new("Ada", "Make compilers friendly");
        let prompt = system_prompt(&profile, &AnswerBucket::ALL, 8);
        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].contains("an undisclosed industry"));
        assert_eq!(lines[1], "Their stated mission: \"Make compilers friendly\".");
        assert!(lines[6].starts_with("Reply with a single JSON object"));
        assert!(!prompt.ends_with('\n'));
    }

    #[test]
    fn answer_message_carries_selected_bucket() {
        let message = answer_message("We grew 3x.", AnswerBucket::Good);
        let value: Value = serde_json::from_str(&message).unwrap();
        assert_eq!(value["selected_bucket"], "good");
        assert_eq!(value["answer"], "We grew 3x.");
    }

    #[test]
    fn schema_requires_layout_keys() {
        let schema = response_schema(&[AnswerBucket::Good, AnswerBucket::Ok]);
        assert_eq!(
            schema["properties"]["options"]["required"],
            json!(["good", "ok"])
        );
    }
}
