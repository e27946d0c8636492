//! End-of-interview summary.
use serde::{Deserialize, Serialize};

use crate::interview::{InterviewConfig, InterviewState, Outcome, WorstAnswer};
use crate::numbers::{percent_change, round_cents};

/// Change at or above which a successful run counts as a rally.
const RALLY_CHANGE_PCT: f64 = 5.0;

/// How the market closed on the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Price fell through the fail threshold.
    Collapse,
    /// Survived, but below the opening price.
    Slide,
    /// Survived at or slightly above the opening price.
    Steady,
    /// Survived with a strong gain.
    Rally,
}

impl Verdict {
    /// Presentation key for the headline.
    #[must_use]
    pub const fn headline_key(self) -> &'static str {
        match self {
            Self::Collapse => "result.headline.collapse",
            Self::Slide => "result.headline.slide",
            Self::Steady => "result.headline.steady",
            Self::Rally => "result.headline.rally",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collapse => write!(f, "collapse"),
            Self::Slide => write!(f, "slide"),
            Self::Steady => write!(f, "steady"),
            Self::Rally => write!(f, "rally"),
        }
    }
}

/// Everything the summary screen shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub outcome: Outcome,
    pub verdict: Verdict,
    pub headline: String,
    pub start_price: f64,
    pub final_price: f64,
    pub lowest_price: f64,
    /// Percentage change from the opening price, rounded to cents.
    pub change_pct: f64,
    pub turns_played: u32,
    pub max_turns: u32,
    pub worst_answer: Option<WorstAnswer>,
}

impl InterviewSummary {
    /// One-line recap suitable for sharing.
    #[must_use]
    pub fn share_line(&self) -> String {
        format!(
            "Hotseat {}: closed at {:.2} ({:+.2}%) after {}/{} questions",
            self.verdict, self.final_price, self.change_pct, self.turns_played, self.max_turns
        )
    }
}

/// Select the verdict by strict priority: collapse first, then by change.
#[must_use]
pub fn select_verdict(outcome: Outcome, change_pct: f64) -> Verdict {
    if outcome == Outcome::Failure {
        return Verdict::Collapse;
    }
    if change_pct >= RALLY_CHANGE_PCT {
        return Verdict::Rally;
    }
    if change_pct >= 0.0 {
        return Verdict::Steady;
    }
    Verdict::Slide
}

/// Build the summary for a finished (or abandoned) run.
#[must_use]
pub fn summarize(state: &InterviewState, cfg: &InterviewConfig) -> InterviewSummary {
    let start_price = round_cents(cfg.start_price);
    let change_pct = round_cents(percent_change(start_price, state.price));
    let verdict = select_verdict(state.outcome, change_pct);
    InterviewSummary {
        outcome: state.outcome,
        verdict,
        headline: verdict.headline_key().to_string(),
        start_price,
        final_price: state.price,
        lowest_price: state.lowest_price,
        change_pct,
        turns_played: state.turn_index,
        max_turns: state.max_turns,
        worst_answer: state.worst_answer.clone(),
    }
}
