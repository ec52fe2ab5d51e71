//! FSRS-6 forgetting curve and memory update formulas
//!
//! The formulas are written once, generic over [`Real`], so the scheduler
//! evaluates them on plain `f64` while the optimizer evaluates the very same
//! code on dual numbers to obtain exact weight gradients.
//!
//! ## Core Formulas
//! - Retrievability: `R = (1 + FACTOR * t / S)^DECAY`, `DECAY = -w20`,
//!   `FACTOR = 0.9^(1/DECAY) - 1`
//! - Interval: `t = S / FACTOR * (r^(1/DECAY) - 1)`

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::{Error, Result, ensure_finite};
use crate::fsrs::Rating;
use crate::fsrs::parameters::{
    MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY, PARAMETER_COUNT, Weights,
};

// ============================================================================
// SCALAR ABSTRACTION
// ============================================================================

/// Scalar type the formulas are evaluated on.
///
/// `max`/`min` select by value and carry the selected operand unchanged, so
/// clamping passes derivatives through on the unclamped side only.
pub trait Real:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Lift a constant
    fn constant(value: f64) -> Self;

    /// Plain value
    fn value(self) -> f64;

    fn exp(self) -> Self;

    fn ln(self) -> Self;

    /// `self^exponent` for a positive base
    fn powf(self, exponent: Self) -> Self;

    fn max(self, other: Self) -> Self {
        if self.value() >= other.value() { self } else { other }
    }

    fn min(self, other: Self) -> Self {
        if self.value() <= other.value() { self } else { other }
    }
}

impl Real for f64 {
    #[inline]
    fn constant(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(self) -> f64 {
        self
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn powf(self, exponent: Self) -> Self {
        f64::powf(self, exponent)
    }
}

// ============================================================================
// MEMORY STATE
// ============================================================================

/// Stability and difficulty of a reviewed card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryState<T> {
    pub stability: T,
    pub difficulty: T,
}

/// Clamp stability to its floor
#[inline]
pub fn clamp_stability<T: Real>(s: T) -> T {
    s.max(T::constant(MIN_STABILITY))
}

/// Clamp difficulty to [1, 10]
#[inline]
pub fn clamp_difficulty<T: Real>(d: T) -> T {
    d.max(T::constant(MIN_DIFFICULTY))
        .min(T::constant(MAX_DIFFICULTY))
}

// ============================================================================
// MODEL
// ============================================================================

/// The weights plus the curve constants derived from them once.
#[derive(Debug, Clone, Copy)]
pub struct Model<T> {
    w: [T; PARAMETER_COUNT],
    decay: T,
    factor: T,
}

impl<T: Real> Model<T> {
    pub fn new(w: [T; PARAMETER_COUNT]) -> Self {
        let decay = -w[20];
        let factor = T::constant(0.9).powf(T::constant(1.0) / decay) - T::constant(1.0);
        Self { w, decay, factor }
    }

    #[inline]
    pub fn weight(&self, i: usize) -> T {
        self.w[i]
    }

    #[inline]
    pub fn decay(&self) -> T {
        self.decay
    }

    #[inline]
    pub fn factor(&self) -> T {
        self.factor
    }

    /// `R(t, S) = (1 + FACTOR * t / S)^DECAY`, unchecked
    #[inline]
    pub fn retrievability(&self, elapsed_days: T, stability: T) -> T {
        (T::constant(1.0) + self.factor * elapsed_days / stability).powf(self.decay)
    }

    /// `S0(G) = w[G-1]`, floored
    pub fn initial_stability(&self, rating: Rating) -> T {
        clamp_stability(self.w[rating.grade() as usize - 1])
    }

    /// `D0(G) = w4 - e^(w5 (G - 1)) + 1`
    ///
    /// Unclamped only when used as the mean-reversion target.
    pub fn initial_difficulty(&self, rating: Rating, clamp: bool) -> T {
        let g = T::constant(rating.as_f64());
        let d = self.w[4] - (self.w[5] * (g - T::constant(1.0))).exp() + T::constant(1.0);
        if clamp { clamp_difficulty(d) } else { d }
    }

    /// Linear damping toward 10, then mean reversion toward `D0(Easy)`
    pub fn next_difficulty(&self, difficulty: T, rating: Rating) -> T {
        let g = T::constant(rating.as_f64());
        let delta = -(self.w[6] * (g - T::constant(3.0)));
        let damped = difficulty + (T::constant(10.0) - difficulty) * delta / T::constant(9.0);
        let target = self.initial_difficulty(Rating::Easy, false);
        let reverted = self.w[7] * target + (T::constant(1.0) - self.w[7]) * damped;
        clamp_difficulty(reverted)
    }

    /// Same-day review: `S * e^(w17 (G - 3 + w18)) * S^-w19`
    pub fn short_term_stability(&self, stability: T, rating: Rating) -> T {
        let g = T::constant(rating.as_f64());
        let mut increase = (self.w[17] * (g - T::constant(3.0) + self.w[18])).exp()
            * stability.powf(-self.w[19]);
        if matches!(rating, Rating::Good | Rating::Easy) {
            increase = increase.max(T::constant(1.0));
        }
        clamp_stability(stability * increase)
    }

    /// Stability growth after a successful cross-day recall
    pub fn next_recall_stability(&self, difficulty: T, stability: T, r: T, rating: Rating) -> T {
        let one = T::constant(1.0);
        let hard_penalty = if rating == Rating::Hard { self.w[15] } else { one };
        let easy_bonus = if rating == Rating::Easy { self.w[16] } else { one };
        stability
            * (one
                + self.w[8].exp()
                    * (T::constant(11.0) - difficulty)
                    * stability.powf(-self.w[9])
                    * (((one - r) * self.w[10]).exp() - one)
                    * hard_penalty
                    * easy_bonus)
    }

    /// Post-lapse stability: the smaller of the long-term and short-term forms
    pub fn next_forget_stability(&self, difficulty: T, stability: T, r: T) -> T {
        let one = T::constant(1.0);
        let long_term = self.w[11]
            * difficulty.powf(-self.w[12])
            * ((stability + one).powf(self.w[13]) - one)
            * ((one - r) * self.w[14]).exp();
        let short_term = stability / (self.w[17] * self.w[18]).exp();
        long_term.min(short_term)
    }

    /// Dispatch on the rating and floor the result
    pub fn next_stability(&self, difficulty: T, stability: T, r: T, rating: Rating) -> T {
        let next = if rating == Rating::Again {
            self.next_forget_stability(difficulty, stability, r)
        } else {
            self.next_recall_stability(difficulty, stability, r, rating)
        };
        clamp_stability(next)
    }

    /// One step of the per-card memory fold.
    ///
    /// `elapsed_days` counts whole days since the previous review and is
    /// ignored for the first review.
    pub fn next_memory(
        &self,
        previous: Option<MemoryState<T>>,
        rating: Rating,
        elapsed_days: f64,
    ) -> MemoryState<T> {
        match previous {
            None => MemoryState {
                stability: self.initial_stability(rating),
                difficulty: self.initial_difficulty(rating, true),
            },
            Some(m) if elapsed_days < 1.0 => MemoryState {
                stability: self.short_term_stability(m.stability, rating),
                difficulty: self.next_difficulty(m.difficulty, rating),
            },
            Some(m) => {
                let r = self.retrievability(T::constant(elapsed_days), m.stability);
                MemoryState {
                    stability: self.next_stability(m.difficulty, m.stability, r, rating),
                    difficulty: self.next_difficulty(m.difficulty, rating),
                }
            }
        }
    }
}

impl Model<f64> {
    pub fn from_weights(weights: &Weights) -> Self {
        Self::new(*weights.as_array())
    }

    /// Whole-day interval at which retrievability falls to `desired_retention`.
    ///
    /// Rounded half-to-even and clamped to `[1, maximum_interval]`.
    pub fn next_interval(
        &self,
        stability: f64,
        desired_retention: f64,
        maximum_interval: u32,
    ) -> Result<u32> {
        let raw = stability / self.factor * (desired_retention.powf(1.0 / self.decay) - 1.0);
        let raw = ensure_finite(raw, "interval")?;
        let days = raw.round_ties_even().clamp(1.0, f64::from(maximum_interval.max(1)));
        Ok(days as u32)
    }
}

// ============================================================================
// CHECKED ENTRY POINTS
// ============================================================================

/// Probability of recall after `elapsed_days` at the given stability.
///
/// Exactly 1 at zero elapsed time; decreasing in elapsed time and increasing
/// in stability.
pub fn retrievability(elapsed_days: f64, stability: f64, weights: &Weights) -> Result<f64> {
    if !(stability.is_finite() && stability > 0.0) {
        return Err(Error::invalid(format!("stability must be positive, got {stability}")));
    }
    if !(elapsed_days.is_finite() && elapsed_days >= 0.0) {
        return Err(Error::invalid(format!(
            "elapsed days must be non-negative, got {elapsed_days}"
        )));
    }
    if elapsed_days == 0.0 {
        return Ok(1.0);
    }
    let r = Model::from_weights(weights).retrievability(elapsed_days, stability);
    ensure_finite(r, "retrievability")
}

/// Whole-day interval for a stability and retention target
pub fn next_interval(
    stability: f64,
    desired_retention: f64,
    maximum_interval: u32,
    weights: &Weights,
) -> Result<u32> {
    Model::from_weights(weights).next_interval(stability, desired_retention, maximum_interval)
}

// ============================================================================
// TESTS
// ============================================================================
