//! Centralized balance and tuning constants for Hotseat interview logic.
//!
//! These values define the deterministic math for the core engine. Keeping
//! them together ensures that scoring can only be adjusted via code changes
//! reviewed in version control, rather than inferred from whatever the
//! generative backend happens to report.

// Price ---------------------------------------------------------------------
pub(crate) const START_PRICE: f64 = 100.0;
pub(crate) const FAIL_THRESHOLD: f64 = 85.0;
pub(crate) const MAX_TURNS: u32 = 8;

// Bucket draw bands (inclusive) ---------------------------------------------
pub(crate) const GOOD_DELTA_MIN: f64 = 1.0;
pub(crate) const GOOD_DELTA_MAX: f64 = 3.0;
pub(crate) const OK_DELTA_MIN: f64 = -0.5;
pub(crate) const OK_DELTA_MAX: f64 = 0.75;
pub(crate) const EVASIVE_DELTA_MIN: f64 = -3.0;
pub(crate) const EVASIVE_DELTA_MAX: f64 = -1.0;
pub(crate) const BAD_DELTA_MIN: f64 = -6.0;
pub(crate) const BAD_DELTA_MAX: f64 = -3.0;
pub(crate) const CONTRADICTION_DELTA_MIN: f64 = -4.0;
pub(crate) const CONTRADICTION_DELTA_MAX: f64 = -2.5;

// Evasive streak pressure ---------------------------------------------------
pub(crate) const STREAK_THRESHOLD: u32 = 2;
pub(crate) const STREAK_STEP_PENALTY: f64 = 0.75;
pub(crate) const STREAK_CAP_LEVELS: u32 = 3;
pub(crate) const CLOSING_TURNS: u32 = 1;
pub(crate) const CLOSING_TIME_MS: u64 = 30_000;
pub(crate) const CLOSING_MULTIPLIER: f64 = 1.5;
// Ceiling on any configured delta magnitude, streak pressure included.
pub(crate) const MAX_DELTA_MAGNITUDE: f64 = 1_000.0;

// Orchestrator delta guards -------------------------------------------------
pub(crate) const GUARD_GOOD_MIN: f64 = 0.01;
pub(crate) const GUARD_GOOD_MAX: f64 = 10.0;
pub(crate) const GUARD_OK_MIN: f64 = -2.0;
pub(crate) const GUARD_OK_MAX: f64 = 2.0;
pub(crate) const GUARD_NEGATIVE_MIN: f64 = -10.0;
pub(crate) const GUARD_NEGATIVE_MAX: f64 = -0.01;
pub(crate) const CONTRADICTION_FLOOR: f64 = 2.5;

// Legacy envelope thresholds ------------------------------------------------
pub(crate) const LEGACY_GOOD_IMPACT: f64 = 0.5;
pub(crate) const LEGACY_EVASIVE_IMPACT: f64 = -2.5;

// Text shaping --------------------------------------------------------------
pub(crate) const MAX_OPTION_WORDS: usize = 18;

// Timers --------------------------------------------------------------------
pub(crate) const INTRO_DELAY_MS: u64 = 2_500;
pub(crate) const SILENCE_TIMEOUT_MS: u64 = 20_000;

// In-character lines --------------------------------------------------------
pub(crate) const FALLBACK_HOST_LINE: &str =
    "Let's keep moving. Tell me more about what you're building.";
pub(crate) const TECHNICAL_DIFFICULTY_LINE: &str =
    "We seem to be having some technical difficulties. Bear with us and try that again.";
pub(crate) const SESSION_LOST_LINE: &str =
    "And we've lost the feed. We'll have to start this segment over from the top.";
pub(crate) const SILENCE_NUDGE_LINE: &str = "Dead air is expensive. Do you have an answer for me?";
pub(crate) const FALLBACK_GOOD_OPTION: &str = "We have paying customers and the numbers to prove it.";
pub(crate) const FALLBACK_OK_OPTION: &str = "We're still early, but the signals look promising.";
pub(crate) const FALLBACK_EVASIVE_OPTION: &str = "I'd rather not get into specifics right now.";
pub(crate) const FALLBACK_BAD_OPTION: &str = "Honestly, I haven't really thought about that.";
