use std::hash::Hasher;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use hotseat_game::{
    EventKind, HotseatEngine, InterviewConfig, InterviewError, InterviewEvent, InterviewPhase,
    InterviewSummary, Outcome, Profile, Recovery, TurnResolution,
};
use serde::{Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::backends::{BackendKind, ScriptedBackend};
use crate::policy::PolicyKind;
use crate::scenarios::Scenario;

/// Extra loop iterations allowed per turn for retries, restarts, and intros.
const STEPS_PER_TURN: u32 = 6;
const STEP_SLACK: u32 = 20;

/// Assertion hook run after an interview completes.
type ExpectationFn = Arc<dyn Fn(&RunSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct Expectation(ExpectationFn);

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation").finish()
    }
}

impl Expectation {
    pub fn evaluate(&self, summary: &RunSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for Expectation
where
    F: Fn(&RunSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// How one automated interview is played.
#[derive(Debug, Clone)]
pub struct InterviewPlan {
    pub backend: BackendKind,
    pub policy: PolicyKind,
    pub max_turns: Option<u32>,
    /// Logical time the player waits before each answer.
    pub think_ms: u64,
    pub expectations: Vec<Expectation>,
}

impl InterviewPlan {
    #[must_use]
    pub const fn new(backend: BackendKind, policy: PolicyKind) -> Self {
        Self {
            backend,
            policy,
            max_turns: None,
            think_ms: 0,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub const fn with_think_ms(mut self, think_ms: u64) -> Self {
        self.think_ms = think_ms;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<Expectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }

    fn effective_config(&self, base: &InterviewConfig) -> InterviewConfig {
        let mut cfg = base.clone();
        if let Some(max_turns) = self.max_turns {
            cfg.max_turns = max_turns;
        }
        cfg
    }
}

/// Complete record of an automated interview.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub backend: BackendKind,
    pub policy: PolicyKind,
    pub think_ms: u64,
    /// Configuration the run actually used.
    pub config: InterviewConfig,
    pub outcome: Outcome,
    pub summary: Option<InterviewSummary>,
    pub turns_scored: u32,
    pub retries: u32,
    pub restarts: u32,
    pub sessions_lost: u32,
    pub nudges: u32,
    pub scoring_draws: u64,
    pub backend_calls: u64,
    pub price_path: Vec<f64>,
    /// Hash over the final transcript, state, and price path.
    pub digest: u64,
    /// True when the step limit ran out before a terminal outcome.
    pub halted: bool,
}

#[derive(Default)]
struct Tally {
    turns_scored: u32,
    retries: u32,
    restarts: u32,
    sessions_lost: u32,
    nudges: u32,
    price_path: Vec<f64>,
}

impl Tally {
    fn absorb(&mut self, events: &[InterviewEvent]) {
        for event in events {
            match event.kind {
                EventKind::SilenceNudge => self.nudges += 1,
                EventKind::SessionLost { .. } => self.sessions_lost += 1,
                _ => {}
            }
        }
    }

    fn record(&mut self, resolution: Result<TurnResolution, InterviewError>) -> Result<bool> {
        match resolution {
            Ok(TurnResolution::Scored(turn)) => {
                self.turns_scored += 1;
                self.price_path.push(turn.price);
                Ok(true)
            }
            Ok(TurnResolution::Opened | TurnResolution::RetryArmed(_))
            | Err(InterviewError::SessionLost(_)) => Ok(false),
            Err(err) => Err(err).context("interview rejected a scripted move"),
        }
    }
}

fn run_profile(seed: u64) -> Profile {
    let founders = ["Morgan Reyes", "Sasha Okafor", "Jun Takeda", "Priya Natarajan"];
    let founder = founders[usize::try_from(seed % 4).unwrap_or(0)];
    Profile::new(founder, "Make grid-scale batteries cheaper than gas peakers")
        .with_industry("energy storage")
}

/// Play one interview to completion against a scripted backend.
///
/// # Errors
///
/// Fails when the configuration is invalid or the engine rejects a move the
/// runner considers legal.
pub fn run_interview(plan: &InterviewPlan, base: &InterviewConfig, seed: u64) -> Result<RunSummary> {
    let cfg = plan.effective_config(base);
    let backend = ScriptedBackend::new(plan.backend, seed);
    let mut engine =
        HotseatEngine::new(cfg.clone(), backend, seed).context("invalid interview config")?;
    let mut policy = plan.policy.create_policy(seed);
    let mut tally = Tally::default();
    let mut forgotten = false;

    engine
        .submit_profile(run_profile(seed))
        .context("profile rejected")?;

    let max_steps = cfg
        .max_turns
        .saturating_mul(STEPS_PER_TURN)
        .saturating_add(STEP_SLACK);
    let mut halted = true;
    for _ in 0..max_steps {
        tally.absorb(&engine.drain_events());
        let orchestrator = engine.orchestrator();
        if orchestrator.state().outcome.is_terminal() {
            halted = false;
            break;
        }
        let phase = orchestrator.phase();
        let recovery = orchestrator.recovery();
        let deadline = orchestrator.next_deadline();

        match (phase, recovery) {
            (InterviewPhase::Intro, _) => {
                let due = deadline.context("intro without a pending timer")?;
                engine.tick(due);
            }
            (_, Some(Recovery::Retry(kind))) => {
                log::debug!("seed {seed}: retrying {kind:?}");
                tally.retries += 1;
                let resolution = engine.retry();
                tally.record(resolution)?;
            }
            (_, Some(Recovery::Restart)) => {
                tally.restarts += 1;
                engine.restart().context("restart refused")?;
            }
            (InterviewPhase::Interview, None) => {
                if plan.think_ms > 0 {
                    let now = engine.orchestrator().clock_ms().saturating_add(plan.think_ms);
                    engine.tick(now);
                }
                let choice = {
                    let orchestrator = engine.orchestrator();
                    let options = orchestrator
                        .options()
                        .context("interview awaiting an answer with nothing on offer")?;
                    policy.pick(orchestrator.state(), options)
                };
                log::debug!("seed {seed}: {} answers {choice}", policy.name());
                let scored = tally.record(engine.answer(choice))?;
                if scored
                    && !forgotten
                    && let Some(limit) = plan.backend.forget_after()
                    && tally.turns_scored >= limit
                    && !engine.orchestrator().state().outcome.is_terminal()
                    && let Some(id) = engine.orchestrator().session_id().cloned()
                {
                    log::debug!("seed {seed}: backend forgets session {id}");
                    engine.store_mut().end(&id);
                    forgotten = true;
                }
            }
            (phase, None) => bail!("interview stuck in {phase}"),
        }
    }
    tally.absorb(&engine.drain_events());

    let backend_calls = engine.store().backend().calls();
    let summary = engine.summary();
    let (orchestrator, _store) = engine.into_parts();
    let mut hasher = XxHash64::with_seed(seed);
    hasher.write(&serde_json::to_vec(orchestrator.transcript())?);
    hasher.write(&serde_json::to_vec(orchestrator.state())?);
    for price in &tally.price_path {
        hasher.write_u64(price.to_bits());
    }

    Ok(RunSummary {
        seed,
        backend: plan.backend,
        policy: plan.policy,
        think_ms: plan.think_ms,
        outcome: orchestrator.state().outcome,
        summary,
        turns_scored: tally.turns_scored,
        retries: tally.retries,
        restarts: tally.restarts,
        sessions_lost: tally.sessions_lost,
        nudges: tally.nudges,
        scoring_draws: orchestrator.scoring_draws(),
        backend_calls,
        price_path: tally.price_path,
        digest: hasher.finish(),
        halted,
        config: cfg,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct ScenarioRunner {
    verbose: bool,
    config: InterviewConfig,
}

impl ScenarioRunner {
    #[must_use]
    pub const fn new(config: InterviewConfig, verbose: bool) -> Self {
        Self { verbose, config }
    }

    pub fn run_scenario(
        &self,
        scenario: &Scenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (backend: {} policy: {} seed: {})",
                        scenario.name.bright_white(),
                        scenario.plan.backend,
                        scenario.plan.policy,
                        seed
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &Scenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            match self.run_iteration(&scenario.plan, iteration_seed) {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) turns:{} outcome:{:?} price:{}",
                            i + 1,
                            iterations,
                            summary.turns_scored,
                            summary.outcome,
                            summary
                                .summary
                                .as_ref()
                                .map_or_else(|| "-".to_string(), |s| format!("{:.2}", s.final_price))
                        );
                    }
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose {
                        println!("  ❌ {}", message.clone().red());
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.to_string(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
        }
    }

    fn run_iteration(&self, plan: &InterviewPlan, seed: u64) -> Result<RunSummary> {
        let summary = run_interview(plan, &self.config, seed)?;
        if summary.halted {
            bail!(
                "halted after {} scored turns without a verdict",
                summary.turns_scored
            );
        }
        for expectation in &plan.expectations {
            expectation.evaluate(&summary)?;
        }
        Ok(summary)
    }
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(backend: BackendKind, policy: PolicyKind) -> InterviewPlan {
        InterviewPlan::new(backend, policy)
    }

    fn cfg() -> InterviewConfig {
        InterviewConfig::default()
    }

    #[test]
    fn always_good_reaches_success_with_one_draw_per_turn() {
        let summary =
            run_interview(&plan(BackendKind::WellFormed, PolicyKind::AlwaysGood), &cfg(), 11)
                .unwrap();
        assert!(!summary.halted);
        assert_eq!(summary.outcome, Outcome::Success);
        assert_eq!(summary.turns_scored, 8);
        assert_eq!(summary.scoring_draws, 8);
        assert_eq!(summary.price_path.len(), 8);
        assert!(summary.price_path.windows(2).all(|pair| pair[1] > pair[0]));
    }

    #[test]
    fn max_turns_override_applies() {
        let plan = plan(BackendKind::WellFormed, PolicyKind::AlwaysGood).with_max_turns(3);
        let summary = run_interview(&plan, &cfg(), 4).unwrap();
        assert_eq!(summary.config.max_turns, 3);
        assert_eq!(summary.turns_scored, 3);
    }

    #[test]
    fn flaky_backend_needs_retries_but_draws_match_scores() {
        let plan = plan(BackendKind::Flaky { every: 3 }, PolicyKind::AlwaysGood);
        let summary = run_interview(&plan, &cfg(), 5).unwrap();
        assert_eq!(summary.outcome, Outcome::Success);
        assert!(summary.retries >= 2);
        assert_eq!(summary.scoring_draws, u64::from(summary.turns_scored));
        assert!(summary.backend_calls > u64::from(summary.turns_scored) + 1);
    }

    #[test]
    fn amnesiac_backend_forces_one_restart() {
        let plan = plan(
            BackendKind::Amnesiac { forget_after: 2 },
            PolicyKind::AlwaysGood,
        );
        let summary = run_interview(&plan, &cfg(), 6).unwrap();
        assert_eq!(summary.sessions_lost, 1);
        assert_eq!(summary.restarts, 1);
        assert_eq!(summary.outcome, Outcome::Success);
        assert_eq!(summary.turns_scored, 2 + 8);
    }

    #[test]
    fn slow_player_is_nudged_once_per_question() {
        let plan = plan(BackendKind::WellFormed, PolicyKind::AlwaysGood).with_think_ms(25_000);
        let summary = run_interview(&plan, &cfg(), 8).unwrap();
        assert_eq!(summary.nudges, summary.turns_scored);
    }

    #[test]
    fn digest_is_stable_per_seed() {
        let plan = plan(BackendKind::WellFormed, PolicyKind::SeededRandom);
        let a = run_interview(&plan, &cfg(), 77).unwrap();
        let b = run_interview(&plan, &cfg(), 77).unwrap();
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.price_path, b.price_path);
    }

    #[test]
    fn failing_expectation_is_reported_per_iteration() {
        let scenario = Scenario {
            key: "doomed",
            name: "Doomed",
            description: "always fails",
            plan: plan(BackendKind::WellFormed, PolicyKind::AlwaysGood)
                .with_max_turns(2)
                .with_expectation(|_: &RunSummary| -> Result<()> { bail!("nope") }),
        };
        let runner = ScenarioRunner::new(cfg(), false);
        let results = runner.run_scenario(&scenario, &[1, 2], 2);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|result| !result.passed));
        assert_eq!(results[0].failures.len(), 2);
        assert!(results[0].failures[0].contains("nope"));
    }

    #[test]
    fn scenario_result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data, vec![Duration::from_millis(12)]);
    }
}
