//! Answer buckets and the per-turn option set offered to the player.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    FALLBACK_BAD_OPTION, FALLBACK_EVASIVE_OPTION, FALLBACK_GOOD_OPTION, FALLBACK_OK_OPTION,
};

/// Discrete answer-quality classification used to select a scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerBucket {
    Good,
    Ok,
    Evasive,
    Bad,
}

impl AnswerBucket {
    pub const ALL: [Self; 4] = [Self::Good, Self::Ok, Self::Evasive, Self::Bad];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Ok => "ok",
            Self::Evasive => "evasive",
            Self::Bad => "bad",
        }
    }

    /// Bucket used whenever the backend's classification cannot be trusted.
    #[must_use]
    pub const fn most_conservative() -> Self {
        Self::Ok
    }

    /// In-character text substituted when the backend omits this option.
    #[must_use]
    pub const fn fallback_text(self) -> &'static str {
        match self {
            Self::Good => FALLBACK_GOOD_OPTION,
            Self::Ok => FALLBACK_OK_OPTION,
            Self::Evasive => FALLBACK_EVASIVE_OPTION,
            Self::Bad => FALLBACK_BAD_OPTION,
        }
    }

    /// Whether this bucket must always cost the player.
    #[must_use]
    pub const fn is_penalizing(self) -> bool {
        matches!(self, Self::Evasive | Self::Bad)
    }
}

impl fmt::Display for AnswerBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerBucket {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" | "strong" => Ok(Self::Good),
            "ok" | "okay" | "neutral" => Ok(Self::Ok),
            "evasive" | "dodge" => Ok(Self::Evasive),
            "bad" | "weak" => Ok(Self::Bad),
            _ => Err(()),
        }
    }
}

/// A single labeled choice shown to the player for the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub bucket: AnswerBucket,
    pub text: String,
}

/// The two or three options offered on a turn, one per bucket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSet(SmallVec<[AnswerOption; 3]>);

impl AnswerSet {
    pub const MIN_OPTIONS: usize = 2;
    pub const MAX_OPTIONS: usize = 3;

    /// Build a set, rejecting duplicate buckets or a size outside 2..=3.
    #[must_use]
    pub fn new(options: impl IntoIterator<Item = AnswerOption>) -> Option<Self> {
        let mut set: SmallVec<[AnswerOption; 3]> = SmallVec::new();
        for option in options {
            if set.iter().any(|existing| existing.bucket == option.bucket) {
                return None;
            }
            set.push(option);
        }
        (Self::MIN_OPTIONS..=Self::MAX_OPTIONS)
            .contains(&set.len())
            .then_some(Self(set))
    }

    /// Fallback options for the given layout.
    #[must_use]
    pub fn fallback(keys: &[AnswerBucket]) -> Self {
        Self(
            keys.iter()
                .map(|bucket| AnswerOption {
                    bucket: *bucket,
                    text: bucket.fallback_text().to_string(),
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, bucket: AnswerBucket) -> Option<&AnswerOption> {
        self.0.iter().find(|option| option.bucket == bucket)
    }

    #[must_use]
    pub fn contains(&self, bucket: AnswerBucket) -> bool {
        self.get(bucket).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnswerOption> {
        self.0.iter()
    }

    #[must_use]
    pub fn buckets(&self) -> Vec<AnswerBucket> {
        self.0.iter().map(|option| option.bucket).collect()
    }
}
