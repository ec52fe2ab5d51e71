//! FSRS-6 scheduler
//!
//! Applies one review to a card: updates stability and difficulty, walks the
//! card through the `New → Learning → Review ⇄ Relearning` state machine and
//! derives the next due date from the target retention.
//!
//! `review` is a pure function of `(card, rating, review_time, config)`.
//! Fuzzing draws its jitter from a generator seeded by those same inputs, so
//! a replay always reproduces the same card.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ensure_finite};
use crate::fsrs::algorithm::{self, MemoryState, Model};
use crate::fsrs::fuzz::{fuzz_with_rng, jitter_rng};
use crate::fsrs::parameters::{DEFAULT_MAXIMUM_INTERVAL, DEFAULT_RETENTION, Weights};
use crate::fsrs::Rating;
use crate::memory::{Card, ReviewLog, State};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Scheduler configuration: the weight vector plus scheduling policy.
///
/// Missing fields fall back to their defaults when deserialized. Steps are
/// written as seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// FSRS-6 weights
    pub weights: Weights,
    /// Target retrievability used to size intervals, in (0, 1)
    pub desired_retention: f64,
    /// Short-term steps walked by new cards
    #[serde(with = "step_secs")]
    pub learning_steps: Vec<Duration>,
    /// Short-term steps walked after a lapse
    #[serde(with = "step_secs")]
    pub relearning_steps: Vec<Duration>,
    /// Longest interval ever scheduled (days)
    pub maximum_interval: u32,
    /// Randomize review-state intervals
    pub enable_fuzzing: bool,
    /// Seed mixed into every fuzz draw
    pub fuzz_seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            desired_retention: DEFAULT_RETENTION,
            learning_steps: vec![Duration::minutes(1), Duration::minutes(10)],
            relearning_steps: vec![Duration::minutes(10)],
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
            enable_fuzzing: true,
            fuzz_seed: 0,
        }
    }
}

impl SchedulerConfig {
    /// Same config with fuzzing turned off
    pub fn without_fuzzing(mut self) -> Self {
        self.enable_fuzzing = false;
        self
    }

    /// Same config with other weights
    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    /// Same config with another retention target
    pub fn with_retention(mut self, desired_retention: f64) -> Self {
        self.desired_retention = desired_retention;
        self
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(self.desired_retention > 0.0 && self.desired_retention < 1.0) {
            return Err(Error::invalid(format!(
                "desired retention {} outside (0, 1)",
                self.desired_retention
            )));
        }
        if self.maximum_interval == 0 {
            return Err(Error::invalid("maximum interval must be at least one day"));
        }
        for (name, steps) in [
            ("learning", &self.learning_steps),
            ("relearning", &self.relearning_steps),
        ] {
            if let Some(bad) = steps.iter().find(|d| **d <= Duration::zero()) {
                return Err(Error::invalid(format!(
                    "{name} step must be positive, got {bad}"
                )));
            }
        }
        Ok(())
    }
}

mod step_secs {
    use chrono::Duration;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(steps: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        steps
            .iter()
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    /// Steps must be positive, finite and representable in milliseconds
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Duration>, D::Error> {
        let secs = Vec::<f64>::deserialize(deserializer)?;
        secs.into_iter()
            .map(|s| {
                let ms = (s * 1000.0).round();
                if !(s.is_finite() && s > 0.0 && ms < i64::MAX as f64) {
                    return Err(D::Error::custom(format!("step of {s} seconds is out of range")));
                }
                Duration::try_milliseconds(ms as i64)
                    .ok_or_else(|| D::Error::custom(format!("step of {s} seconds is out of range")))
            })
            .collect()
    }
}

// ============================================================================
// TRANSITIONS
// ============================================================================

/// Time until the next review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interval {
    /// A learning or relearning step
    Step(Duration),
    /// A whole-day review interval
    Days(u32),
}

/// Outcome of the state machine for one review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    state: State,
    step: Option<usize>,
    interval: Interval,
}

/// Results of reviewing one card with each rating
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResults {
    pub again: Card,
    pub hard: Card,
    pub good: Card,
    pub easy: Card,
}

impl PreviewResults {
    pub fn get(&self, rating: Rating) -> &Card {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// FSRS-6 scheduler.
///
/// Holds no mutable state; one instance can serve any number of threads
/// reviewing disjoint cards.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    model: Model<f64>,
}

impl Default for Scheduler {
    fn default() -> Self {
        let config = SchedulerConfig::default();
        let model = Model::from_weights(&config.weights);
        Self { config, model }
    }
}

impl Scheduler {
    /// Create a scheduler, validating the configuration
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let model = Model::from_weights(&config.weights);
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn weights(&self) -> &Weights {
        &self.config.weights
    }

    /// Review `card` at `review_time`.
    ///
    /// Returns the updated card and the review log; the input card is left
    /// untouched. Fails with `InvalidState` for inconsistent cards or a
    /// review time earlier than the card's last review.
    pub fn review(
        &self,
        card: &Card,
        rating: Rating,
        review_time: DateTime<Utc>,
    ) -> Result<(Card, ReviewLog)> {
        card.validate()?;

        let elapsed_days = match card.last_review {
            Some(last) if review_time < last => {
                return Err(Error::invalid(format!(
                    "card {} reviewed at {review_time}, before its last review at {last}",
                    card.card_id
                )));
            }
            Some(last) => (review_time - last).num_days() as f64,
            None => 0.0,
        };

        let previous = card.memory().map(|(stability, difficulty)| MemoryState {
            stability,
            difficulty,
        });
        let memory = self.model.next_memory(previous, rating, elapsed_days);
        let stability = ensure_finite(memory.stability, "stability")?;
        let difficulty = ensure_finite(memory.difficulty, "difficulty")?;

        let transition = self.transition(card, rating, stability)?;
        let interval = match transition.interval {
            Interval::Days(days) if self.config.enable_fuzzing && transition.state == State::Review => {
                let mut rng = jitter_rng(self.config.fuzz_seed, card.card_id, review_time);
                let fuzzed = fuzz_with_rng(days, self.config.maximum_interval, &mut rng);
                Duration::days(i64::from(fuzzed))
            }
            Interval::Days(days) => Duration::days(i64::from(days)),
            Interval::Step(step) => step,
        };
        let due = review_time.checked_add_signed(interval).ok_or_else(|| {
            Error::invalid(format!("due date overflows for card {}", card.card_id))
        })?;

        let updated = Card {
            card_id: card.card_id,
            state: transition.state,
            step: transition.step,
            stability: Some(stability),
            difficulty: Some(difficulty),
            due,
            last_review: Some(review_time),
        };
        Ok((updated, ReviewLog::new(card.card_id, rating, review_time)))
    }

    /// Outcome of each rating for `card` at `now`
    pub fn preview(&self, card: &Card, now: DateTime<Utc>) -> Result<PreviewResults> {
        Ok(PreviewResults {
            again: self.review(card, Rating::Again, now)?.0,
            hard: self.review(card, Rating::Hard, now)?.0,
            good: self.review(card, Rating::Good, now)?.0,
            easy: self.review(card, Rating::Easy, now)?.0,
        })
    }

    /// Rebuild a card's state by replaying its review logs in order.
    ///
    /// Fails with `InvalidState` if any log belongs to another card.
    pub fn reschedule(&self, card: &Card, logs: &[ReviewLog]) -> Result<Card> {
        logs.iter().try_fold(card.clone(), |current, log| {
            if log.card_id != current.card_id {
                return Err(Error::invalid(format!(
                    "log for card {} replayed onto card {}",
                    log.card_id, current.card_id
                )));
            }
            self.review(&current, log.rating, log.review_time)
                .map(|(next, _)| next)
        })
    }

    /// Probability of recalling `card` at `now`.
    ///
    /// Never-reviewed cards report 0.
    pub fn retrievability(&self, card: &Card, now: DateTime<Utc>) -> Result<f64> {
        let (Some(last), Some(stability)) = (card.last_review, card.stability) else {
            return Ok(0.0);
        };
        let elapsed_days = (now - last).num_days().max(0) as f64;
        algorithm::retrievability(elapsed_days, stability, &self.config.weights)
    }

    fn transition(&self, card: &Card, rating: Rating, stability: f64) -> Result<Transition> {
        match card.state {
            State::New => self.step_transition(State::Learning, &self.config.learning_steps, 0, rating, stability),
            State::Learning => self.step_transition(
                State::Learning,
                &self.config.learning_steps,
                card.step.unwrap_or(0),
                rating,
                stability,
            ),
            State::Relearning => self.step_transition(
                State::Relearning,
                &self.config.relearning_steps,
                card.step.unwrap_or(0),
                rating,
                stability,
            ),
            State::Review => self.review_transition(rating, stability),
        }
    }

    fn step_transition(
        &self,
        state: State,
        steps: &[Duration],
        step: usize,
        rating: Rating,
        stability: f64,
    ) -> Result<Transition> {
        if steps.is_empty() || (step >= steps.len() && rating != Rating::Again) {
            return self.graduate(stability);
        }

        match rating {
            Rating::Again => Ok(Transition {
                state,
                step: Some(0),
                interval: Interval::Step(steps[0]),
            }),
            Rating::Hard => {
                let interval = match (step, steps.len()) {
                    (0, 1) => steps[0] * 3 / 2,
                    (0, _) => (steps[0] + steps[1]) / 2,
                    _ => steps[step],
                };
                Ok(Transition {
                    state,
                    step: Some(step),
                    interval: Interval::Step(interval),
                })
            }
            Rating::Good if step + 1 >= steps.len() => self.graduate(stability),
            Rating::Good => Ok(Transition {
                state,
                step: Some(step + 1),
                interval: Interval::Step(steps[step + 1]),
            }),
            Rating::Easy => self.graduate(stability),
        }
    }

    fn review_transition(&self, rating: Rating, stability: f64) -> Result<Transition> {
        match self.config.relearning_steps.first() {
            Some(&first) if rating == Rating::Again => Ok(Transition {
                state: State::Relearning,
                step: Some(0),
                interval: Interval::Step(first),
            }),
            _ => self.graduate(stability),
        }
    }

    fn graduate(&self, stability: f64) -> Result<Transition> {
        let days = self.model.next_interval(
            stability,
            self.config.desired_retention,
            self.config.maximum_interval,
        )?;
        Ok(Transition {
            state: State::Review,
            step: None,
            interval: Interval::Days(days),
        })
    }
}

// ============================================================================
// FREE FUNCTIONS
// ============================================================================

/// Review a card under `config` without keeping a scheduler around
pub fn review(
    card: &Card,
    rating: Rating,
    review_time: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<(Card, ReviewLog)> {
    Scheduler::new(config.clone())?.review(card, rating, review_time)
}

/// Current retrievability of a card under `config`
pub fn retrievability_now(card: &Card, now: DateTime<Utc>, config: &SchedulerConfig) -> Result<f64> {
    Scheduler::new(config.clone())?.retrievability(card, now)
}

// ============================================================================
// TESTS
// ============================================================================
