//! Authoritative local scoring.
//!
//! The scoring function only ever consumes the player's own selection plus
//! the contradiction flag; the backend's view of how well an answer landed
//! never feeds into the delta. Randomness is injected so a seed pins every
//! delta exactly.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::AnswerBucket;
use crate::constants::{
    BAD_DELTA_MAX, BAD_DELTA_MIN, CLOSING_MULTIPLIER, CLOSING_TIME_MS, CLOSING_TURNS,
    CONTRADICTION_DELTA_MAX, CONTRADICTION_DELTA_MIN, EVASIVE_DELTA_MAX, EVASIVE_DELTA_MIN,
    GOOD_DELTA_MAX, GOOD_DELTA_MIN, MAX_DELTA_MAGNITUDE, OK_DELTA_MAX, OK_DELTA_MIN,
    STREAK_CAP_LEVELS, STREAK_STEP_PENALTY, STREAK_THRESHOLD,
};
use crate::numbers::{round_cents, u32_to_f64, u64_to_f64};
use crate::rng::{CountingRng, SCORING_DOMAIN};

/// Inclusive delta band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    fn lerp(&self, unit: f64) -> f64 {
        self.min + (self.max - self.min) * unit
    }
}

/// Presentation tone attached to a scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Rally,
    Steady,
    Slide,
    Plunge,
    Scandal,
}

impl Tone {
    #[must_use]
    pub const fn for_bucket(bucket: AnswerBucket) -> Self {
        match bucket {
            AnswerBucket::Good => Self::Rally,
            AnswerBucket::Ok => Self::Steady,
            AnswerBucket::Evasive => Self::Slide,
            AnswerBucket::Bad => Self::Plunge,
        }
    }
}

/// Time/turn pressure known at the moment an answer is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pressure {
    /// Turns left after the one being answered.
    pub turns_remaining: u32,
    pub time_remaining_ms: Option<u64>,
}

/// Ephemeral input to the scoring function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreContext {
    pub bucket: AnswerBucket,
    pub contradiction: bool,
    /// Evasive streak before this answer.
    pub evasive_streak: u32,
    pub pressure: Option<Pressure>,
}

impl ScoreContext {
    #[must_use]
    pub const fn new(bucket: AnswerBucket) -> Self {
        Self {
            bucket,
            contradiction: false,
            evasive_streak: 0,
            pressure: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub delta: f64,
    pub tone: Tone,
    pub next_evasive_streak: u32,
}

/// Errors raised when scoring configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ScoringConfigError {
    #[error("{field} band is malformed (min {min:.2}, max {max:.2})")]
    MalformedBand {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} band must stay {sign} (min {min:.2}, max {max:.2})")]
    WrongSign {
        field: &'static str,
        sign: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be at most {max:.2} (got {value:.2})")]
    MaxViolation {
        field: &'static str,
        max: f64,
        value: f64,
    },
}

/// Bands and pressure knobs for the scoring function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCfg {
    #[serde(default = "ScoringCfg::default_good")]
    pub good: Band,
    #[serde(default = "ScoringCfg::default_ok")]
    pub ok: Band,
    #[serde(default = "ScoringCfg::default_evasive")]
    pub evasive: Band,
    #[serde(default = "ScoringCfg::default_bad")]
    pub bad: Band,
    #[serde(default = "ScoringCfg::default_contradiction")]
    pub contradiction: Band,
    #[serde(default = "ScoringCfg::default_streak_threshold")]
    pub streak_threshold: u32,
    #[serde(default = "ScoringCfg::default_streak_step")]
    pub streak_step: f64,
    #[serde(default = "ScoringCfg::default_streak_cap_levels")]
    pub streak_cap_levels: u32,
    #[serde(default = "ScoringCfg::default_closing_turns")]
    pub closing_turns: u32,
    #[serde(default = "ScoringCfg::default_closing_time_ms")]
    pub closing_time_ms: u64,
    #[serde(default = "ScoringCfg::default_closing_multiplier")]
    pub closing_multiplier: f64,
}

impl ScoringCfg {
    const fn default_good() -> Band {
        Band::new(GOOD_DELTA_MIN, GOOD_DELTA_MAX)
    }

    const fn default_ok() -> Band {
        Band::new(OK_DELTA_MIN, OK_DELTA_MAX)
    }

    const fn default_evasive() -> Band {
        Band::new(EVASIVE_DELTA_MIN, EVASIVE_DELTA_MAX)
    }

    const fn default_bad() -> Band {
        Band::new(BAD_DELTA_MIN, BAD_DELTA_MAX)
    }

    const fn default_contradiction() -> Band {
        Band::new(CONTRADICTION_DELTA_MIN, CONTRADICTION_DELTA_MAX)
    }

    const fn default_streak_threshold() -> u32 {
        STREAK_THRESHOLD
    }

    const fn default_streak_step() -> f64 {
        STREAK_STEP_PENALTY
    }

    const fn default_streak_cap_levels() -> u32 {
        STREAK_CAP_LEVELS
    }

    const fn default_closing_turns() -> u32 {
        CLOSING_TURNS
    }

    const fn default_closing_time_ms() -> u64 {
        CLOSING_TIME_MS
    }

    const fn default_closing_multiplier() -> f64 {
        CLOSING_MULTIPLIER
    }

    /// Draw band for a bucket, before streak pressure.
    #[must_use]
    pub const fn band(&self, bucket: AnswerBucket) -> Band {
        match bucket {
            AnswerBucket::Good => self.good,
            AnswerBucket::Ok => self.ok,
            AnswerBucket::Evasive => self.evasive,
            AnswerBucket::Bad => self.bad,
        }
    }

    /// Largest streak penalty the evasive bucket can accrue.
    #[must_use]
    pub fn max_streak_penalty(&self) -> f64 {
        self.streak_step * u32_to_f64(self.streak_cap_levels) * self.closing_multiplier.max(1.0)
    }

    /// Documented min/max for every delta this bucket can produce.
    #[must_use]
    pub fn bounds(&self, bucket: AnswerBucket) -> Band {
        let band = self.band(bucket);
        if bucket == AnswerBucket::Evasive {
            Band::new(round_cents(band.min - self.max_streak_penalty()), band.max)
        } else {
            band
        }
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ScoringConfigError` when a band is malformed, crosses zero
    /// in a direction its bucket forbids, or when any band edge or the full
    /// evasive streak penalty exceeds the delta magnitude ceiling.
    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        let named = [
            ("good", self.good),
            ("ok", self.ok),
            ("evasive", self.evasive),
            ("bad", self.bad),
            ("contradiction", self.contradiction),
        ];
        for (field, band) in named {
            if !band.is_well_formed() {
                return Err(ScoringConfigError::MalformedBand {
                    field,
                    min: band.min,
                    max: band.max,
                });
            }
            let magnitude = band.min.abs().max(band.max.abs());
            if magnitude > MAX_DELTA_MAGNITUDE {
                return Err(ScoringConfigError::MaxViolation {
                    field,
                    max: MAX_DELTA_MAGNITUDE,
                    value: magnitude,
                });
            }
        }
        if self.good.min <= 0.0 {
            return Err(ScoringConfigError::WrongSign {
                field: "good",
                sign: "positive",
                min: self.good.min,
                max: self.good.max,
            });
        }
        for (field, band) in [
            ("evasive", self.evasive),
            ("bad", self.bad),
            ("contradiction", self.contradiction),
        ] {
            if band.max >= 0.0 {
                return Err(ScoringConfigError::WrongSign {
                    field,
                    sign: "negative",
                    min: band.min,
                    max: band.max,
                });
            }
        }
        if !self.streak_step.is_finite() || self.streak_step < 0.0 {
            return Err(ScoringConfigError::MinViolation {
                field: "streak_step",
                min: 0.0,
                value: self.streak_step,
            });
        }
        if !self.closing_multiplier.is_finite() || self.closing_multiplier < 1.0 {
            return Err(ScoringConfigError::MinViolation {
                field: "closing_multiplier",
                min: 1.0,
                value: self.closing_multiplier,
            });
        }
        if self.streak_threshold == 0 {
            return Err(ScoringConfigError::MinViolation {
                field: "streak_threshold",
                min: 1.0,
                value: 0.0,
            });
        }
        // Pressure stacks on the evasive floor, so the sum must stay bounded too.
        let deepest = self.evasive.min.abs() + self.max_streak_penalty();
        if !deepest.is_finite() || deepest > MAX_DELTA_MAGNITUDE {
            return Err(ScoringConfigError::MaxViolation {
                field: "streak_step",
                max: MAX_DELTA_MAGNITUDE,
                value: deepest,
            });
        }
        Ok(())
    }

    fn is_closing(&self, pressure: Option<Pressure>) -> bool {
        pressure.is_some_and(|p| {
            p.turns_remaining <= self.closing_turns
                || p.time_remaining_ms
                    .is_some_and(|remaining| remaining <= self.closing_time_ms)
        })
    }

    fn streak_penalty(&self, streak_after: u32, closing: bool) -> f64 {
        if streak_after < self.streak_threshold {
            return 0.0;
        }
        let levels = (streak_after - self.streak_threshold + 1).min(self.streak_cap_levels);
        let penalty = self.streak_step * u32_to_f64(levels);
        if closing {
            penalty * self.closing_multiplier
        } else {
            penalty
        }
    }
}

impl Default for ScoringCfg {
    fn default() -> Self {
        Self {
            good: Self::default_good(),
            ok: Self::default_ok(),
            evasive: Self::default_evasive(),
            bad: Self::default_bad(),
            contradiction: Self::default_contradiction(),
            streak_threshold: Self::default_streak_threshold(),
            streak_step: Self::default_streak_step(),
            streak_cap_levels: Self::default_streak_cap_levels(),
            closing_turns: Self::default_closing_turns(),
            closing_time_ms: Self::default_closing_time_ms(),
            closing_multiplier: Self::default_closing_multiplier(),
        }
    }
}

/// Uniform draw in `[0, 1)` consuming exactly one `next_u64`.
fn unit_draw<R: RngCore>(rng: &mut R) -> f64 {
    const SCALE: f64 = 1.0 / 9_007_199_254_740_992.0; // 2^53
    u64_to_f64(rng.next_u64() >> 11) * SCALE
}

/// Score one answer. Consumes exactly one draw from `rng`.
#[must_use]
pub fn score<R: RngCore>(ctx: &ScoreContext, cfg: &ScoringCfg, rng: &mut R) -> ScoreOutcome {
    let unit = unit_draw(rng);

    if ctx.contradiction {
        let band = cfg.contradiction;
        return ScoreOutcome {
            delta: round_cents(band.lerp(unit)).clamp(band.min, band.max),
            tone: Tone::Scandal,
            next_evasive_streak: 0,
        };
    }

    let band = cfg.band(ctx.bucket);
    let mut delta = band.lerp(unit);
    let next_evasive_streak = if ctx.bucket == AnswerBucket::Evasive {
        let streak_after = ctx.evasive_streak.saturating_add(1);
        delta -= cfg.streak_penalty(streak_after, cfg.is_closing(ctx.pressure));
        streak_after
    } else {
        0
    };

    let bounds = cfg.bounds(ctx.bucket);
    ScoreOutcome {
        delta: round_cents(delta).clamp(bounds.min, bounds.max),
        tone: Tone::for_bucket(ctx.bucket),
        next_evasive_streak,
    }
}

/// Scoring function bound to its configuration and an injected stream.
#[derive(Debug, Clone)]
pub struct ScoringEngine<R = rand_chacha::ChaCha20Rng> {
    cfg: ScoringCfg,
    rng: CountingRng<R>,
}

impl ScoringEngine {
    /// Engine drawing from the scoring stream derived from `seed`.
    #[must_use]
    pub fn from_seed(cfg: ScoringCfg, seed: u64) -> Self {
        Self {
            cfg,
            rng: CountingRng::for_domain(seed, SCORING_DOMAIN),
        }
    }
}

impl<R: RngCore> ScoringEngine<R> {
    /// Engine drawing from an arbitrary injected source.
    pub const fn with_rng(cfg: ScoringCfg, rng: R) -> Self {
        Self {
            cfg,
            rng: CountingRng::wrap(rng),
        }
    }

    pub fn score(&mut self, ctx: &ScoreContext) -> ScoreOutcome {
        score(ctx, &self.cfg, &mut self.rng)
    }

    #[must_use]
    pub const fn config(&self) -> &ScoringCfg {
        &self.cfg
    }

    /// Draws consumed so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.rng.draws()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn engine(seed: u64) -> ScoringEngine {
        ScoringEngine::from_seed(ScoringCfg::default(), seed)
    }

    fn is_cents(value: f64) -> bool {
        ((value * 100.0).round() - value * 100.0).abs() < 1e-6
    }

    #[test]
    fn every_bucket_stays_within_documented_bounds() {
        let cfg = ScoringCfg::default();
        let mut engine = engine(0xC0FFEE);
        for bucket in AnswerBucket::ALL {
            let bounds = cfg.bounds(bucket);
            for streak in 0..6 {
                for turns_remaining in [0, 1, 5] {
                    let ctx = ScoreContext {
                        bucket,
                        contradiction: false,
                        evasive_streak: streak,
                        pressure: Some(Pressure {
                            turns_remaining,
                            time_remaining_ms: None,
                        }),
                    };
                    let outcome = engine.score(&ctx);
                    assert!(outcome.delta.is_finite());
                    assert!(
                        bounds.contains(outcome.delta),
                        "{bucket} delta {} outside {bounds:?}",
                        outcome.delta
                    );
                    assert!(is_cents(outcome.delta));
                }
            }
        }
    }

    #[test]
    fn contradiction_overrides_bucket() {
        let cfg = ScoringCfg::default();
        let mut engine = engine(11);
        for bucket in AnswerBucket::ALL {
            for _ in 0..25 {
                let ctx = ScoreContext {
                    bucket,
                    contradiction: true,
                    evasive_streak: 3,
                    pressure: None,
                };
                let outcome = engine.score(&ctx);
                assert!(cfg.contradiction.contains(outcome.delta));
                assert_eq!(outcome.tone, Tone::Scandal);
                assert_eq!(outcome.next_evasive_streak, 0);
            }
        }
    }

    #[test]
    fn evasive_streak_escalates_until_cap() {
        let cfg = ScoringCfg::default();
        let mut magnitudes = Vec::new();
        for streak_before in 0..6 {
            // Identical draw per call isolates the streak effect.
            let mut rng = StepRng::new(u64::MAX / 2, 0);
            let ctx = ScoreContext {
                bucket: AnswerBucket::Evasive,
                contradiction: false,
                evasive_streak: streak_before,
                pressure: None,
            };
            let outcome = score(&ctx, &cfg, &mut rng);
            assert_eq!(outcome.next_evasive_streak, streak_before + 1);
            magnitudes.push(outcome.delta.abs());
        }
        // streak_after 1..=4 escalate, 5 and 6 are capped.
        assert!(magnitudes[1] > magnitudes[0]);
        assert!(magnitudes[2] > magnitudes[1]);
        assert!(magnitudes[3] > magnitudes[2]);
        assert!((magnitudes[4] - magnitudes[3]).abs() < 1e-9);
        assert!((magnitudes[5] - magnitudes[3]).abs() < 1e-9);
    }

    #[test]
    fn closing_stretch_scales_streak_penalty() {
        let cfg = ScoringCfg::default();
        let base = ScoreContext {
            bucket: AnswerBucket::Evasive,
            contradiction: false,
            evasive_streak: 2,
            pressure: Some(Pressure {
                turns_remaining: 5,
                time_remaining_ms: None,
            }),
        };
        let closing = ScoreContext {
            pressure: Some(Pressure {
                turns_remaining: 5,
                time_remaining_ms: Some(1_000),
            }),
            ..base
        };
        let calm = score(&base, &cfg, &mut StepRng::new(0, 0));
        let pressed = score(&closing, &cfg, &mut StepRng::new(0, 0));
        assert!(pressed.delta < calm.delta);
    }

    #[test]
    fn non_evasive_buckets_reset_streak() {
        let mut engine = engine(5);
        for bucket in [AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Bad] {
            let ctx = ScoreContext {
                evasive_streak: 4,
                ..ScoreContext::new(bucket)
            };
            assert_eq!(engine.score(&ctx).next_evasive_streak, 0);
        }
    }

    #[test]
    fn same_seed_pins_exact_deltas() {
        let mut a = engine(1234);
        let mut b = engine(1234);
        for bucket in AnswerBucket::ALL {
            let ctx = ScoreContext::new(bucket);
            assert_eq!(a.score(&ctx), b.score(&ctx));
        }
        assert_eq!(a.draws(), 4);
    }

    #[test]
    fn validate_rejects_wrong_sign_bands() {
        let cfg = ScoringCfg {
            evasive: Band::new(-1.0, 0.5),
            ..ScoringCfg::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ScoringConfigError::WrongSign {
                field: "evasive",
                ..
            })
        ));
        let cfg = ScoringCfg {
            good: Band::new(2.0, 1.0),
            ..ScoringCfg::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ScoringConfigError::MalformedBand { field: "good", .. })
        ));
        assert!(ScoringCfg::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_runaway_streak_pressure() {
        for step in [1e308, 1e306, 400.0] {
            let cfg = ScoringCfg {
                streak_step: step,
                ..ScoringCfg::default()
            };
            assert!(
                matches!(
                    cfg.validate(),
                    Err(ScoringConfigError::MaxViolation {
                        field: "streak_step",
                        ..
                    })
                ),
                "streak_step {step} accepted"
            );
        }
        let cfg = ScoringCfg {
            streak_cap_levels: u32::MAX,
            ..ScoringCfg::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ScoringConfigError::MaxViolation { .. })
        ));
    }

    #[test]
    fn validate_rejects_oversized_bands() {
        let cfg = ScoringCfg {
            bad: Band::new(-1e12, -3.0),
            ..ScoringCfg::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ScoringConfigError::MaxViolation { field: "bad", .. })
        ));
    }

    #[test]
    fn largest_accepted_pressure_still_scores_inside_bounds() {
        let cfg = ScoringCfg {
            streak_step: 100.0,
            ..ScoringCfg::default()
        };
        cfg.validate().unwrap();
        let bounds = cfg.bounds(AnswerBucket::Evasive);
        let mut engine = ScoringEngine::from_seed(cfg, 5);
        let ctx = ScoreContext {
            bucket: AnswerBucket::Evasive,
            contradiction: false,
            evasive_streak: 10,
            pressure: Some(Pressure {
                turns_remaining: 0,
                time_remaining_ms: None,
            }),
        };
        let outcome = engine.score(&ctx);
        assert!(outcome.delta.is_finite());
        assert!(bounds.contains(outcome.delta), "{} outside {bounds:?}", outcome.delta);
    }

    #[test]
    fn documented_evasive_bounds_include_pressure() {
        let cfg = ScoringCfg::default();
        let bounds = cfg.bounds(AnswerBucket::Evasive);
        assert!((bounds.min - -6.38).abs() < 1e-9);
        assert!((bounds.max - -1.0).abs() < 1e-9);
    }
}
