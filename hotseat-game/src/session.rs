//! Explicit in-memory session store binding ids to conversation contexts.

use log::{debug, warn};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::GenerativeBackend;
use crate::answers::AnswerBucket;
use crate::normalizer::parse_backend_text;
use crate::prompt::{
    ChatMessage, Profile, Role, answer_message, opening_message, response_schema, system_prompt,
};
use crate::rng::{CountingRng, SESSION_DOMAIN};

/// Opaque identifier for one ongoing conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Failures surfaced by the session store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The id is not (or no longer) known; retrying with it can never succeed.
    #[error("unknown session `{0}`")]
    UnknownSession(SessionId),
    /// The backend call failed; the conversation is untouched and may be retried.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Conversation context held for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub profile: Profile,
    pub history: Vec<ChatMessage>,
    pub turns_sent: u32,
}

/// Process-wide mapping from session id to conversation, with no eviction.
#[derive(Debug)]
pub struct SessionStore<B> {
    backend: B,
    option_keys: Vec<AnswerBucket>,
    max_turns: u32,
    schema: Value,
    sessions: HashMap<SessionId, Conversation>,
    ids: CountingRng<rand_chacha::ChaCha20Rng>,
}

impl<B: GenerativeBackend> SessionStore<B> {
    /// Build a store; `seed` pins the generated session ids.
    #[must_use]
    pub fn new(backend: B, option_keys: &[AnswerBucket], max_turns: u32, seed: u64) -> Self {
        Self {
            backend,
            option_keys: option_keys.to_vec(),
            max_turns,
            schema: response_schema(option_keys),
            sessions: HashMap::new(),
            ids: CountingRng::for_domain(seed, SESSION_DOMAIN),
        }
    }

    /// Open a conversation and request the first host turn.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Backend` if the opening request fails; no session
    /// is registered in that case.
    pub fn create(&mut self, profile: &Profile) -> Result<(SessionId, Value), SessionError> {
        let history = vec![
            ChatMessage::new(
                Role::System,
                system_prompt(profile, &self.option_keys, self.max_turns),
            ),
            ChatMessage::new(Role::User, opening_message()),
        ];
        let raw = self.call_backend(&history)?;
        let id = self.next_id();
        let mut conversation = Conversation {
            profile: profile.clone(),
            history,
            turns_sent: 0,
        };
        conversation
            .history
            .push(ChatMessage::new(Role::Assistant, raw.clone()));
        self.sessions.insert(id.clone(), conversation);
        debug!("session {id} created for {}", profile.name.trim());
        Ok((id, parse_backend_text(&raw)))
    }

    /// Send the player's chosen answer, tagged with its bucket.
    ///
    /// History is only committed once the backend replies, so a failed call
    /// can be retried without duplicating the turn.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownSession` for an unknown id and
    /// `SessionError::Backend` when the backend call fails.
    pub fn send(
        &mut self,
        id: &SessionId,
        text: &str,
        bucket: AnswerBucket,
    ) -> Result<Value, SessionError> {
        let message = ChatMessage::new(Role::User, answer_message(text, bucket));
        let mut history = self
            .sessions
            .get(id)
            .ok_or_else(|| SessionError::UnknownSession(id.clone()))?
            .history
            .clone();
        history.push(message);
        let raw = self.call_backend(&history)?;
        history.push(ChatMessage::new(Role::Assistant, raw.clone()));
        if let Some(conversation) = self.sessions.get_mut(id) {
            conversation.history = history;
            conversation.turns_sent = conversation.turns_sent.saturating_add(1);
        }
        Ok(parse_backend_text(&raw))
    }

    /// Drop a session. Returns whether it existed.
    pub fn end(&mut self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    #[must_use]
    pub fn conversation(&self, id: &SessionId) -> Option<&Conversation> {
        self.sessions.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn call_backend(&self, history: &[ChatMessage]) -> Result<String, SessionError> {
        self.backend.generate(history, &self.schema).map_err(|err| {
            warn!("generative backend failed: {err}");
            SessionError::Backend(err.to_string())
        })
    }

    fn next_id(&mut self) -> SessionId {
        loop {
            let id = SessionId(format!("hs-{:016x}", self.ids.next_u64()));
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}
