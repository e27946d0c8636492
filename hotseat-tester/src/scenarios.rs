use anyhow::{Result, ensure};
use hotseat_game::{AnswerBucket, Outcome, Verdict};

use crate::backends::BackendKind;
use crate::policy::PolicyKind;
use crate::runner::{InterviewPlan, RunSummary, run_interview};

/// A named interview plan plus the checks its runs must pass.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: InterviewPlan,
}

impl Scenario {
    const fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        plan: InterviewPlan,
    ) -> Self {
        Self {
            key,
            name,
            description,
            plan,
        }
    }
}

#[must_use]
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "smoke",
            "Smoke",
            "Short mixed-policy interview against a well-formed host",
            InterviewPlan::new(BackendKind::WellFormed, PolicyKind::Mixed)
                .with_max_turns(4)
                .with_expectation(reaches_verdict)
                .with_expectation(one_draw_per_scored_turn),
        ),
        Scenario::new(
            "always-good",
            "Always Good",
            "Strong answers every turn close in a rally",
            InterviewPlan::new(BackendKind::WellFormed, PolicyKind::AlwaysGood)
                .with_expectation(reaches_verdict)
                .with_expectation(always_good_rallies),
        ),
        Scenario::new(
            "always-evasive",
            "Always Evasive",
            "Dodging every question collapses the price early",
            InterviewPlan::new(BackendKind::WellFormed, PolicyKind::AlwaysEvasive)
                .with_expectation(reaches_verdict)
                .with_expectation(always_evasive_collapses),
        ),
        Scenario::new(
            "legacy-envelope",
            "Legacy Envelope",
            "Host replies in the old host_line/impact/answers shape",
            InterviewPlan::new(BackendKind::Legacy, PolicyKind::AlwaysGood)
                .with_expectation(reaches_verdict)
                .with_expectation(local_scoring_wins),
        ),
        Scenario::new(
            "flaky-backend",
            "Flaky Backend",
            "Every third backend call fails and is retried",
            InterviewPlan::new(BackendKind::Flaky { every: 3 }, PolicyKind::AlwaysGood)
                .with_expectation(reaches_verdict)
                .with_expectation(one_draw_per_scored_turn)
                .with_expectation(flaky_backend_retries),
        ),
        Scenario::new(
            "garbage-backend",
            "Garbage Backend",
            "Prose, empty, fenced, and mistyped replies still yield playable turns",
            InterviewPlan::new(BackendKind::Garbage, PolicyKind::SeededRandom)
                .with_expectation(reaches_verdict)
                .with_expectation(one_draw_per_scored_turn)
                .with_expectation(prices_stay_sane),
        ),
        Scenario::new(
            "lost-session",
            "Lost Session",
            "Backend forgets the session mid-interview; the player restarts",
            InterviewPlan::new(
                BackendKind::Amnesiac { forget_after: 2 },
                PolicyKind::AlwaysGood,
            )
            .with_expectation(reaches_verdict)
            .with_expectation(lost_session_restarts),
        ),
        Scenario::new(
            "silence-nudge",
            "Silence Nudge",
            "A slow player is nudged exactly once per question",
            InterviewPlan::new(BackendKind::WellFormed, PolicyKind::AlwaysGood)
                .with_think_ms(25_000)
                .with_expectation(reaches_verdict)
                .with_expectation(nudged_once_per_turn),
        ),
        Scenario::new(
            "determinism",
            "Determinism",
            "Replaying a seed reproduces the transcript and price path",
            InterviewPlan::new(BackendKind::WellFormed, PolicyKind::SeededRandom)
                .with_expectation(reaches_verdict)
                .with_expectation(replays_identically),
        ),
    ]
}

#[must_use]
pub fn find_scenario(key: &str) -> Option<Scenario> {
    catalog()
        .into_iter()
        .find(|scenario| scenario.key.eq_ignore_ascii_case(key))
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    catalog()
        .iter()
        .map(|scenario| (scenario.key, scenario.description))
        .collect()
}

fn reaches_verdict(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.outcome.is_terminal(),
        "interview ended without an outcome"
    );
    let report = summary
        .summary
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("no summary after a terminal outcome"))?;
    ensure!(
        report.outcome == summary.outcome,
        "summary outcome {:?} disagrees with state {:?}",
        report.outcome,
        summary.outcome
    );
    ensure!(
        report.turns_played <= report.max_turns,
        "played {} of {} turns",
        report.turns_played,
        report.max_turns
    );
    Ok(())
}

fn one_draw_per_scored_turn(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.scoring_draws == u64::from(summary.turns_scored),
        "{} scoring draws for {} scored turns",
        summary.scoring_draws,
        summary.turns_scored
    );
    Ok(())
}

fn always_good_rallies(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.outcome == Outcome::Success,
        "expected success, got {:?}",
        summary.outcome
    );
    ensure!(
        summary.turns_scored == summary.config.max_turns,
        "scored {} of {} turns",
        summary.turns_scored,
        summary.config.max_turns
    );
    if let Some(report) = &summary.summary {
        ensure!(
            report.verdict == Verdict::Rally,
            "expected a rally, got {}",
            report.verdict
        );
        ensure!(
            report.worst_answer.is_none(),
            "no answer should have cost anything"
        );
    }
    Ok(())
}

fn always_evasive_collapses(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.outcome == Outcome::Failure,
        "expected failure, got {:?}",
        summary.outcome
    );
    ensure!(
        summary.turns_scored < summary.config.max_turns,
        "collapse should come before the last question"
    );
    if let Some(report) = &summary.summary {
        ensure!(report.verdict == Verdict::Collapse, "expected a collapse");
        ensure!(
            report.final_price < summary.config.fail_threshold,
            "final price {:.2} above the threshold",
            report.final_price
        );
        let worst = report
            .worst_answer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no worst answer recorded"))?;
        ensure!(worst.bucket == AnswerBucket::Evasive, "worst answer not evasive");
    }
    Ok(())
}

fn local_scoring_wins(summary: &RunSummary) -> Result<()> {
    // Legacy hosts report negative impacts, but good answers must still gain.
    ensure!(
        summary.price_path.windows(2).all(|pair| pair[1] > pair[0]),
        "price fell on a good answer: {:?}",
        summary.price_path
    );
    ensure!(summary.outcome == Outcome::Success, "expected success");
    Ok(())
}

fn flaky_backend_retries(summary: &RunSummary) -> Result<()> {
    ensure!(summary.retries > 0, "no retries against a flaky backend");
    ensure!(
        summary.backend_calls > u64::from(summary.turns_scored) + 1,
        "failed calls were not repeated"
    );
    Ok(())
}

fn prices_stay_sane(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary
            .price_path
            .iter()
            .all(|price| price.is_finite() && *price >= 0.0),
        "invalid price in {:?}",
        summary.price_path
    );
    Ok(())
}

fn lost_session_restarts(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.sessions_lost == 1,
        "expected one lost session, saw {}",
        summary.sessions_lost
    );
    ensure!(
        summary.restarts == 1,
        "expected one restart, saw {}",
        summary.restarts
    );
    ensure!(
        summary.outcome == Outcome::Success,
        "restarted run should finish cleanly"
    );
    Ok(())
}

fn nudged_once_per_turn(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.nudges == summary.turns_scored,
        "{} nudges over {} turns",
        summary.nudges,
        summary.turns_scored
    );
    Ok(())
}

fn replays_identically(summary: &RunSummary) -> Result<()> {
    let plan =
        InterviewPlan::new(summary.backend, summary.policy).with_think_ms(summary.think_ms);
    let replay = run_interview(&plan, &summary.config, summary.seed)?;
    ensure!(
        replay.digest == summary.digest,
        "digest {:#x} != {:#x}",
        replay.digest,
        summary.digest
    );
    ensure!(
        replay.price_path == summary.price_path,
        "price path diverged on replay"
    );
    Ok(())
}
