//! FSRS-6 weight vector, defaults and safe ranges

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Number of trainable FSRS-6 weights
pub const PARAMETER_COUNT: usize = 21;

/// Default FSRS-6 weights
///
/// - w[0..4]: initial stability per rating
/// - w[4..8]: difficulty
/// - w[8..11]: recall stability
/// - w[11..15]: forget stability
/// - w[15..17]: hard penalty / easy bonus
/// - w[17..20]: same-day stability
/// - w[20]: forgetting curve decay
pub const DEFAULT_WEIGHTS: [f64; PARAMETER_COUNT] = [
    0.212, 1.2931, 2.3065, 8.2956, // initial stability
    6.4133, 0.8334, 3.0194, 0.001, // difficulty
    1.8722, 0.1666, 0.796, 1.4835, // recall stability
    0.0614, 0.2629, 1.6483, 0.6014, // forget stability
    1.8729, 0.5425, 0.0912, 0.0658, // easy bonus, short-term
    0.1542, // decay
];

/// Lower bound of each weight
pub const LOWER_BOUNDS: [f64; PARAMETER_COUNT] = [
    0.001, 0.001, 0.001, 0.001, //
    1.0, 0.001, 0.001, 0.001, //
    0.0, 0.0, 0.001, 0.001, //
    0.001, 0.001, 0.0, 0.0, //
    1.0, 0.0, 0.0, 0.0, //
    0.1,
];

/// Upper bound of each weight
pub const UPPER_BOUNDS: [f64; PARAMETER_COUNT] = [
    100.0, 100.0, 100.0, 100.0, //
    10.0, 4.0, 4.0, 0.75, //
    4.5, 0.8, 3.5, 5.0, //
    0.25, 0.9, 4.0, 1.0, //
    6.0, 2.0, 2.0, 0.8, //
    0.8,
];

/// Smallest stability a card can hold (days)
pub const MIN_STABILITY: f64 = 0.001;

/// Difficulty range
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Default target retrievability used to size intervals
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Default cap on review intervals (days)
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36_500;

// ============================================================================
// WEIGHTS
// ============================================================================

/// The 21 FSRS-6 weights.
///
/// The optimizer produces new `Weights` values; it never touches one that a
/// scheduler already holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(pub [f64; PARAMETER_COUNT]);

impl Default for Weights {
    fn default() -> Self {
        Weights(DEFAULT_WEIGHTS)
    }
}

impl Weights {
    pub fn new(values: [f64; PARAMETER_COUNT]) -> Self {
        Weights(values)
    }

    /// Build from a slice, which must hold exactly 21 values
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; PARAMETER_COUNT] = values.try_into().map_err(|_| {
            Error::invalid(format!(
                "expected {PARAMETER_COUNT} weights, got {}",
                values.len()
            ))
        })?;
        Ok(Weights(array))
    }

    #[inline]
    pub fn as_array(&self) -> &[f64; PARAMETER_COUNT] {
        &self.0
    }

    /// Check every weight against its safe range
    pub fn validate(&self) -> Result<()> {
        for (i, &w) in self.0.iter().enumerate() {
            if !(LOWER_BOUNDS[i]..=UPPER_BOUNDS[i]).contains(&w) {
                return Err(Error::invalid(format!(
                    "w[{i}] = {w} outside [{}, {}]",
                    LOWER_BOUNDS[i], UPPER_BOUNDS[i]
                )));
            }
        }
        Ok(())
    }

    /// Clamp each weight into its safe range.
    ///
    /// Element-wise and order preserving, so clamping twice is the same as
    /// clamping once.
    pub fn clamp(self) -> Self {
        let mut out = self.0;
        for (i, w) in out.iter_mut().enumerate() {
            *w = w.clamp(LOWER_BOUNDS[i], UPPER_BOUNDS[i]);
        }
        Weights(out)
    }

    /// Forgetting curve exponent (`-w20`)
    #[inline]
    pub fn decay(&self) -> f64 {
        -self.0[20]
    }

    /// Curve scale chosen so that `R(S, S) = 0.9`
    #[inline]
    pub fn factor(&self) -> f64 {
        0.9f64.powf(1.0 / self.decay()) - 1.0
    }
}

impl std::ops::Index<usize> for Weights {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

impl From<[f64; PARAMETER_COUNT]> for Weights {
    fn from(values: [f64; PARAMETER_COUNT]) -> Self {
        Weights(values)
    }
}

// ============================================================================
// TESTS
// ============================================================================
