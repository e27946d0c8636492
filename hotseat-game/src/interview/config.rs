//! Interview configuration with per-field defaults and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{AnswerBucket, AnswerSet};
use crate::constants::{
    CONTRADICTION_FLOOR, FAIL_THRESHOLD, GUARD_GOOD_MAX, GUARD_GOOD_MIN, GUARD_NEGATIVE_MAX,
    GUARD_NEGATIVE_MIN, GUARD_OK_MAX, GUARD_OK_MIN, INTRO_DELAY_MS, MAX_DELTA_MAGNITUDE,
    MAX_OPTION_WORDS, MAX_TURNS, SILENCE_TIMEOUT_MS, START_PRICE,
};
use crate::numbers::{clamp_finite, round_cents};
use crate::scoring::{Band, ScoringCfg, ScoringConfigError};

/// Errors raised when interview configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_turns must be at least 1")]
    ZeroTurns,
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("option layout must list 2 or 3 buckets (got {count})")]
    OptionLayout { count: usize },
    #[error("option layout lists {0} more than once")]
    DuplicateOptionKey(AnswerBucket),
    #[error("delta guard for {bucket} is invalid (min {min:.2}, max {max:.2})")]
    GuardBand {
        bucket: AnswerBucket,
        min: f64,
        max: f64,
    },
    #[error(transparent)]
    Scoring(#[from] ScoringConfigError),
    #[error("config is not valid JSON: {0}")]
    Parse(String),
}

/// Per-bucket consistency clamp applied after scoring.
///
/// A "good" pick can never cost the player and an evasive or bad pick can
/// never pay, whatever the generator did to the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaGuards {
    #[serde(default = "DeltaGuards::default_good")]
    pub good: Band,
    #[serde(default = "DeltaGuards::default_ok")]
    pub ok: Band,
    #[serde(default = "DeltaGuards::default_negative")]
    pub evasive: Band,
    #[serde(default = "DeltaGuards::default_negative")]
    pub bad: Band,
}

impl DeltaGuards {
    const fn default_good() -> Band {
        Band::new(GUARD_GOOD_MIN, GUARD_GOOD_MAX)
    }

    const fn default_ok() -> Band {
        Band::new(GUARD_OK_MIN, GUARD_OK_MAX)
    }

    const fn default_negative() -> Band {
        Band::new(GUARD_NEGATIVE_MIN, GUARD_NEGATIVE_MAX)
    }

    #[must_use]
    pub const fn band(&self, bucket: AnswerBucket) -> Band {
        match bucket {
            AnswerBucket::Good => self.good,
            AnswerBucket::Ok => self.ok,
            AnswerBucket::Evasive => self.evasive,
            AnswerBucket::Bad => self.bad,
        }
    }

    /// Apply the guard for `bucket`; a contradiction instead forces the delta
    /// to at most `-floor`.
    #[must_use]
    pub fn apply(&self, bucket: AnswerBucket, contradiction: bool, delta: f64, floor: f64) -> f64 {
        if contradiction {
            return round_cents(clamp_finite(delta, f64::MIN, -floor, -floor));
        }
        let band = self.band(bucket);
        let fallback = if bucket.is_penalizing() { band.max } else { band.min };
        round_cents(clamp_finite(delta, band.min, band.max, fallback))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for bucket in AnswerBucket::ALL {
            let band = self.band(bucket);
            let well_formed = band.min.is_finite()
                && band.max.is_finite()
                && band.min <= band.max
                && band.min.abs().max(band.max.abs()) <= MAX_DELTA_MAGNITUDE;
            let signed = match bucket {
                AnswerBucket::Good => band.min > 0.0,
                AnswerBucket::Ok => true,
                AnswerBucket::Evasive | AnswerBucket::Bad => band.max < 0.0,
            };
            if !well_formed || !signed {
                return Err(ConfigError::GuardBand {
                    bucket,
                    min: band.min,
                    max: band.max,
                });
            }
        }
        Ok(())
    }
}

impl Default for DeltaGuards {
    fn default() -> Self {
        Self {
            good: Self::default_good(),
            ok: Self::default_ok(),
            evasive: Self::default_negative(),
            bad: Self::default_negative(),
        }
    }
}

/// Tunables for one interview run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewConfig {
    #[serde(default = "InterviewConfig::default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "InterviewConfig::default_start_price")]
    pub start_price: f64,
    #[serde(default = "InterviewConfig::default_fail_threshold")]
    pub fail_threshold: f64,
    #[serde(default = "InterviewConfig::default_option_keys")]
    pub option_keys: Vec<AnswerBucket>,
    #[serde(default = "InterviewConfig::default_intro_delay_ms")]
    pub intro_delay_ms: u64,
    #[serde(default = "InterviewConfig::default_silence_timeout_ms")]
    pub silence_timeout_ms: Option<u64>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default = "InterviewConfig::default_max_option_words")]
    pub max_option_words: usize,
    #[serde(default = "InterviewConfig::default_contradiction_floor")]
    pub contradiction_floor: f64,
    #[serde(default)]
    pub delta_guards: DeltaGuards,
    #[serde(default)]
    pub scoring: ScoringCfg,
}

impl InterviewConfig {
    const fn default_max_turns() -> u32 {
        MAX_TURNS
    }

    const fn default_start_price() -> f64 {
        START_PRICE
    }

    const fn default_fail_threshold() -> f64 {
        FAIL_THRESHOLD
    }

    fn default_option_keys() -> Vec<AnswerBucket> {
        vec![AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Evasive]
    }

    const fn default_intro_delay_ms() -> u64 {
        INTRO_DELAY_MS
    }

    #[allow(clippy::unnecessary_wraps)]
    const fn default_silence_timeout_ms() -> Option<u64> {
        Some(SILENCE_TIMEOUT_MS)
    }

    const fn default_max_option_words() -> usize {
        MAX_OPTION_WORDS
    }

    const fn default_contradiction_floor() -> f64 {
        CONTRADICTION_FLOOR
    }

    /// Parse and validate a JSON configuration; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and any validation error
    /// for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::ZeroTurns);
        }
        self.validate_prices()?;
        self.validate_option_keys()?;
        if self.max_option_words == 0 {
            return Err(ConfigError::RangeViolation {
                field: "max_option_words",
                min: 1.0,
                max: 100.0,
                value: 0.0,
            });
        }
        if !(self.contradiction_floor > 0.0 && self.contradiction_floor <= MAX_DELTA_MAGNITUDE) {
            return Err(ConfigError::RangeViolation {
                field: "contradiction_floor",
                min: 0.01,
                max: MAX_DELTA_MAGNITUDE,
                value: self.contradiction_floor,
            });
        }
        self.delta_guards.validate()?;
        self.scoring.validate()?;
        Ok(())
    }

    fn validate_prices(&self) -> Result<(), ConfigError> {
        const MAX_PRICE: f64 = 1_000_000.0;
        if !(self.start_price > 0.0 && self.start_price <= MAX_PRICE) {
            return Err(ConfigError::RangeViolation {
                field: "start_price",
                min: 0.01,
                max: MAX_PRICE,
                value: self.start_price,
            });
        }
        if !(self.fail_threshold >= 0.0 && self.fail_threshold < self.start_price) {
            return Err(ConfigError::RangeViolation {
                field: "fail_threshold",
                min: 0.0,
                max: self.start_price,
                value: self.fail_threshold,
            });
        }
        Ok(())
    }

    fn validate_option_keys(&self) -> Result<(), ConfigError> {
        let count = self.option_keys.len();
        if !(AnswerSet::MIN_OPTIONS..=AnswerSet::MAX_OPTIONS).contains(&count) {
            return Err(ConfigError::OptionLayout { count });
        }
        for (idx, bucket) in self.option_keys.iter().enumerate() {
            if self.option_keys[..idx].contains(bucket) {
                return Err(ConfigError::DuplicateOptionKey(*bucket));
            }
        }
        Ok(())
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_turns: Self::default_max_turns(),
            start_price: Self::default_start_price(),
            fail_threshold: Self::default_fail_threshold(),
            option_keys: Self::default_option_keys(),
            intro_delay_ms: Self::default_intro_delay_ms(),
            silence_timeout_ms: Self::default_silence_timeout_ms(),
            time_budget_ms: None,
            max_option_words: Self::default_max_option_words(),
            contradiction_floor: Self::default_contradiction_floor(),
            delta_guards: DeltaGuards::default(),
            scoring: ScoringCfg::default(),
        }
    }
}
