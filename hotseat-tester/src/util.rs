use anyhow::{Context, Result};
use hotseat_game::InterviewConfig;
use std::path::Path;

/// Fallback seed when the command line names none.
pub const DEFAULT_SEED: u64 = 1337;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse seed tokens as decimal or `0x`-prefixed hex, dropping duplicates.
pub fn resolve_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in tokens {
        let seed = match token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => token.parse::<u64>(),
        }
        .with_context(|| format!("Unrecognized seed token: {token}"))?;
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }
    Ok(seeds)
}

/// Default config, or the validated JSON config at `path`.
pub fn load_config(path: Option<&Path>) -> Result<InterviewConfig> {
    let Some(path) = path else {
        return Ok(InterviewConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    InterviewConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}
