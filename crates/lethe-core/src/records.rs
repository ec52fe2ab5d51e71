//! Interchange records
//!
//! JSON shapes exchanged with other scheduler implementations:
//! - Alignment scenarios: a rating sequence replayed on a new card, with the
//!   card snapshot after every review
//! - Optimizer baselines: true, fitted and default-loss figures for a corpus
//! - Review-log corpora: flat review entries with integer ratings

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fsrs::{Rating, Scheduler, Weights};
use crate::memory::{Card, ReviewLog, State};

/// Round to 6 decimal places, ties to even
pub fn round6(x: f64) -> f64 {
    (x * 1e6).round_ties_even() / 1e6
}

// ============================================================================
// ALIGNMENT SCENARIOS
// ============================================================================

/// Card fields compared across implementations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub state: State,
    pub step: Option<usize>,
    pub stability: Option<f64>,
    pub difficulty: Option<f64>,
    pub due: Option<DateTime<Utc>>,
}

impl From<&Card> for CardSnapshot {
    fn from(card: &Card) -> Self {
        Self {
            state: card.state,
            step: card.step,
            stability: card.stability.map(round6),
            difficulty: card.difficulty.map(round6),
            due: Some(card.due),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub rating: Rating,
    pub review_time: DateTime<Utc>,
    pub card: CardSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentScenario {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

/// A scenario before replay: ratings with offsets from the start time
pub type ScenarioPlan = (&'static str, Vec<(Rating, Duration)>);

impl AlignmentScenario {
    /// Replay `plan` on a new card starting at `t0`
    pub fn replay(
        name: &str,
        plan: &[(Rating, Duration)],
        scheduler: &Scheduler,
        t0: DateTime<Utc>,
    ) -> Result<Self> {
        let mut card = Card::new(0, t0);
        let mut steps = Vec::with_capacity(plan.len());
        for &(rating, offset) in plan {
            let review_time = t0 + offset;
            card = scheduler.review(&card, rating, review_time)?.0;
            steps.push(ScenarioStep {
                rating,
                review_time,
                card: CardSnapshot::from(&card),
            });
        }
        Ok(Self {
            name: name.to_string(),
            steps,
        })
    }

    /// The five reference scenarios
    pub fn standard_plans() -> Vec<ScenarioPlan> {
        let m = Duration::minutes;
        let d = Duration::days;
        vec![
            (
                "good_good_good",
                vec![
                    (Rating::Good, Duration::zero()),
                    (Rating::Good, m(10)),
                    (Rating::Good, d(3) + m(10)),
                ],
            ),
            (
                "again_good_good_sameday",
                vec![
                    (Rating::Again, Duration::zero()),
                    (Rating::Good, m(5)),
                    (Rating::Good, m(15)),
                ],
            ),
            (
                "good_good_again_relearning_good",
                vec![
                    (Rating::Good, Duration::zero()),
                    (Rating::Good, m(10)),
                    (Rating::Again, d(5) + m(10)),
                    (Rating::Good, d(5) + m(20)),
                ],
            ),
            ("easy_direct_review", vec![(Rating::Easy, Duration::zero())]),
            ("hard_from_new", vec![(Rating::Hard, Duration::zero())]),
        ]
    }
}

/// A full alignment fixture file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentFile {
    pub generator: String,
    pub parameters: String,
    pub desired_retention: f64,
    pub enable_fuzz: bool,
    pub scenarios: Vec<AlignmentScenario>,
}

impl AlignmentFile {
    /// Replay every standard plan with `scheduler`
    pub fn generate(scheduler: &Scheduler, t0: DateTime<Utc>) -> Result<Self> {
        let scenarios = AlignmentScenario::standard_plans()
            .iter()
            .map(|(name, plan)| AlignmentScenario::replay(name, plan, scheduler, t0))
            .collect::<Result<_>>()?;
        Ok(Self {
            generator: "lethe".to_string(),
            parameters: if *scheduler.weights() == Weights::default() {
                "default".to_string()
            } else {
                "custom".to_string()
            },
            desired_retention: scheduler.config().desired_retention,
            enable_fuzz: scheduler.config().enable_fuzzing,
            scenarios,
        })
    }
}

// ============================================================================
// OPTIMIZER BASELINE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerBaseline {
    pub true_parameters: Weights,
    pub optimized_parameters: Weights,
    pub batch_loss: f64,
    pub default_loss: f64,
    pub optimal_retention: Option<f64>,
}

// ============================================================================
// REVIEW-LOG CORPUS
// ============================================================================

/// One review in a corpus file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevlogEntry {
    pub card_id: i64,
    /// 1 = Again .. 4 = Easy
    pub rating: u8,
    pub review_datetime: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_duration_ms: Option<u64>,
}

impl From<&ReviewLog> for RevlogEntry {
    fn from(log: &ReviewLog) -> Self {
        Self {
            card_id: log.card_id,
            rating: log.rating.grade(),
            review_datetime: log.review_time,
            review_duration_ms: log.review_duration_ms,
        }
    }
}

impl TryFrom<RevlogEntry> for ReviewLog {
    type Error = crate::error::Error;

    fn try_from(entry: RevlogEntry) -> Result<Self> {
        Ok(ReviewLog {
            card_id: entry.card_id,
            rating: Rating::try_from(entry.rating)?,
            review_time: entry.review_datetime,
            review_duration_ms: entry.review_duration_ms,
        })
    }
}

/// Convert corpus entries to review logs, failing on the first bad rating
pub fn logs_from_entries(entries: Vec<RevlogEntry>) -> Result<Vec<ReviewLog>> {
    entries.into_iter().map(ReviewLog::try_from).collect()
}

pub fn entries_from_logs(logs: &[ReviewLog]) -> Vec<RevlogEntry> {
    logs.iter().map(RevlogEntry::from).collect()
}
