//! FSRS-6 (Free Spaced Repetition Scheduler) Module
//!
//! Reference: https://github.com/open-spaced-repetition/fsrs4anki
//!
//! ## FSRS-6 model
//! - 21 weights, including a trainable forgetting curve decay (w20)
//! - Same-day reviews handled with the S^(-w19) term
//! - Learning and relearning steps before cards enter the review cycle
//!
//! ## Core Formulas:
//! - Retrievability: R = (1 + FACTOR * t / S)^(-w20) where FACTOR = 0.9^(-1/w20) - 1
//! - Interval: t = S/FACTOR * (R^(1/-w20) - 1)

pub mod algorithm;
mod fuzz;
mod parameters;
mod rating;
mod scheduler;

pub use algorithm::{MemoryState, Model, Real, next_interval, retrievability};

pub use fuzz::{FUZZ_MIN_INTERVAL, fuzz_delta, fuzz_interval, fuzz_range, fuzz_with_rng, jitter_rng};

pub use parameters::{
    DEFAULT_MAXIMUM_INTERVAL,
    DEFAULT_RETENTION,
    // Constants
    DEFAULT_WEIGHTS,
    LOWER_BOUNDS,
    MAX_DIFFICULTY,
    MIN_DIFFICULTY,
    MIN_STABILITY,
    PARAMETER_COUNT,
    UPPER_BOUNDS,
    Weights,
};

pub use rating::Rating;

pub use scheduler::{PreviewResults, Scheduler, SchedulerConfig, retrievability_now, review};
