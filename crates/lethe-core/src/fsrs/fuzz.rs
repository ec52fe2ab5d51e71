//! Interval fuzzing
//!
//! Spreads review-state intervals over a small window so cards learned
//! together do not keep coming due on the same day. The window grows with the
//! interval in three bands and never drops below two days.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Intervals shorter than this are never fuzzed (days)
pub const FUZZ_MIN_INTERVAL: f64 = 2.5;

/// `(start, end, factor)` bands contributing to the fuzz window
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.10),
    (20.0, f64::INFINITY, 0.05),
];

/// Half-width of the fuzz window for an interval:
/// `1 + Σ factor * max(min(ivl, end) - start, 0)`
pub fn fuzz_delta(interval_days: f64) -> f64 {
    FUZZ_RANGES
        .iter()
        .fold(1.0, |delta, &(start, end, factor)| {
            delta + factor * (interval_days.min(end) - start).max(0.0)
        })
}

/// Inclusive `[min, max]` window a fuzzed interval is drawn from.
///
/// Both ends are non-decreasing in `interval_days`.
pub fn fuzz_range(interval_days: u32, maximum_interval: u32) -> (u32, u32) {
    let ivl = f64::from(interval_days);
    let delta = fuzz_delta(ivl);
    let max_ivl = ((ivl + delta).round_ties_even() as u32).min(maximum_interval);
    let min_ivl = ((ivl - delta).round_ties_even().max(2.0) as u32).min(max_ivl);
    (min_ivl, max_ivl)
}

/// Fuzz `interval_days` using a uniform draw `u ∈ [0, 1)`.
///
/// The result lies in [`fuzz_range`], and for a fixed draw is non-decreasing
/// in the interval.
pub fn fuzz_interval(interval_days: u32, maximum_interval: u32, u: f64) -> u32 {
    if f64::from(interval_days) < FUZZ_MIN_INTERVAL {
        return interval_days;
    }
    let (min_ivl, max_ivl) = fuzz_range(interval_days, maximum_interval);
    let span = f64::from(max_ivl - min_ivl + 1);
    let fuzzed = (u * span + f64::from(min_ivl)).floor() as u32;
    fuzzed.min(max_ivl)
}

/// Deterministic jitter source for one review.
///
/// Seeded from the scheduler's fuzz seed, the card and the review time, so a
/// replay with the same inputs draws the same jitter.
pub fn jitter_rng(seed: u64, card_id: i64, review_time: DateTime<Utc>) -> ChaCha8Rng {
    let mut mixed = seed ^ 0x9E37_79B9_7F4A_7C15;
    for part in [card_id as u64, review_time.timestamp_millis() as u64] {
        mixed = (mixed ^ part).wrapping_mul(0xBF58_476D_1CE4_E5B9).rotate_left(31);
    }
    ChaCha8Rng::seed_from_u64(mixed)
}

/// Draw a fuzzed interval from `rng`
pub fn fuzz_with_rng<R: Rng + ?Sized>(interval_days: u32, maximum_interval: u32, rng: &mut R) -> u32 {
    let u: f64 = rng.gen_range(0.0..1.0);
    fuzz_interval(interval_days, maximum_interval, u)
}
