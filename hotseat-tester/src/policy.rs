use std::fmt;

use hotseat_game::{AnswerBucket, AnswerSet, InterviewState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Price below which the mixed policy stops taking risks.
const MIXED_RECOVERY_PRICE: f64 = 92.0;

/// Policy interface for automated players.
pub trait AnswerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick one of the offered buckets.
    fn pick(&mut self, state: &InterviewState, options: &AnswerSet) -> AnswerBucket;
}

/// Built-in player strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    AlwaysGood,
    AlwaysEvasive,
    Mixed,
    SeededRandom,
}

impl PolicyKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AlwaysGood => "Always Good",
            Self::AlwaysEvasive => "Always Evasive",
            Self::Mixed => "Mixed",
            Self::SeededRandom => "Seeded Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn AnswerPolicy> {
        match self {
            Self::AlwaysGood => Box::new(PreferencePolicy::new(
                "Always Good",
                &[AnswerBucket::Good, AnswerBucket::Ok],
            )),
            Self::AlwaysEvasive => Box::new(PreferencePolicy::new(
                "Always Evasive",
                &[AnswerBucket::Evasive, AnswerBucket::Bad],
            )),
            Self::Mixed => Box::new(MixedPolicy),
            Self::SeededRandom => Box::new(RandomPolicy {
                rng: ChaCha20Rng::seed_from_u64(seed),
            }),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Takes the first offered bucket from a fixed preference list.
struct PreferencePolicy {
    name: &'static str,
    preference: Vec<AnswerBucket>,
}

impl PreferencePolicy {
    fn new(name: &'static str, preference: &[AnswerBucket]) -> Self {
        Self {
            name,
            preference: preference.to_vec(),
        }
    }
}

struct MixedPolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl AnswerPolicy for PreferencePolicy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pick(&mut self, _state: &InterviewState, options: &AnswerSet) -> AnswerBucket {
        first_offered(options, &self.preference)
    }
}

impl AnswerPolicy for MixedPolicy {
    fn name(&self) -> &'static str {
        "Mixed"
    }

    fn pick(&mut self, state: &InterviewState, options: &AnswerSet) -> AnswerBucket {
        if state.price < MIXED_RECOVERY_PRICE {
            return first_offered(options, &[AnswerBucket::Good]);
        }
        let rotation = [AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Evasive];
        let preferred = rotation[state.turn_index as usize % rotation.len()];
        first_offered(options, &[preferred])
    }
}

impl AnswerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Seeded Random"
    }

    fn pick(&mut self, _state: &InterviewState, options: &AnswerSet) -> AnswerBucket {
        let buckets = options.buckets();
        if buckets.is_empty() {
            return AnswerBucket::most_conservative();
        }
        buckets[self.rng.gen_range(0..buckets.len())]
    }
}

/// First bucket of `preference` that is on offer, else the first offered bucket.
fn first_offered(options: &AnswerSet, preference: &[AnswerBucket]) -> AnswerBucket {
    preference
        .iter()
        .copied()
        .find(|bucket| options.contains(*bucket))
        .or_else(|| options.iter().next().map(|option| option.bucket))
        .unwrap_or_else(AnswerBucket::most_conservative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotseat_game::InterviewConfig;

    fn options(keys: &[AnswerBucket]) -> AnswerSet {
        AnswerSet::fallback(keys)
    }

    fn state() -> InterviewState {
        InterviewState::seeded(&InterviewConfig::default())
    }

    #[test]
    fn preference_falls_back_to_first_offered() {
        let mut policy = PolicyKind::AlwaysEvasive.create_policy(1);
        let set = options(&[AnswerBucket::Good, AnswerBucket::Ok]);
        assert_eq!(policy.pick(&state(), &set), AnswerBucket::Good);
        let set = options(&[AnswerBucket::Good, AnswerBucket::Bad]);
        assert_eq!(policy.pick(&state(), &set), AnswerBucket::Bad);
    }

    #[test]
    fn mixed_recovers_when_price_sags() {
        let mut policy = PolicyKind::Mixed.create_policy(1);
        let set = options(&[AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Evasive]);
        let mut sagging = state();
        sagging.turn_index = 2;
        assert_eq!(policy.pick(&sagging, &set), AnswerBucket::Evasive);
        sagging.price = 90.0;
        assert_eq!(policy.pick(&sagging, &set), AnswerBucket::Good);
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let set = options(&[AnswerBucket::Good, AnswerBucket::Ok, AnswerBucket::Evasive]);
        let mut a = PolicyKind::SeededRandom.create_policy(33);
        let mut b = PolicyKind::SeededRandom.create_policy(33);
        let picks_a: Vec<_> = (0..10).map(|_| a.pick(&state(), &set)).collect();
        let picks_b: Vec<_> = (0..10).map(|_| b.pick(&state(), &set)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|bucket| set.contains(*bucket)));
    }
}
