//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 to two decimal places, returning 0.0 for non-finite values.
///
/// Finite values too large to scale are already whole and come back as is.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / 100.0;
    // -0.0 renders as "-0.00" on the ticker.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Clamp a f64 into `[min, max]`, mapping non-finite input to `fallback`.
#[must_use]
pub fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

/// Convert u32 to f64 exactly.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Convert u64 milliseconds to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Convert a JSON number to f64 if it is finite.
#[must_use]
pub fn finite_json_number(value: &serde_json::Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// Percentage change from `start` to `end`, rounded to cents. Zero when `start` is zero.
#[must_use]
pub fn percent_change(start: f64, end: f64) -> f64 {
    if start.abs() < f64::EPSILON {
        return 0.0;
    }
    round_cents((end - start) / start * 100.0)
}
