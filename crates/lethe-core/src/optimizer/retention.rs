//! Optimal retention search
//!
//! Estimates the review time spent per remembered card at a given retention
//! target by simulating a deck for a year, then searches the retention that
//! minimizes it: a coarse grid first, then golden-section refinement around
//! the best grid point.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result, ensure_finite};
use crate::fsrs::{Rating, Scheduler, SchedulerConfig, Weights};
use crate::memory::{Card, ReviewLog};

/// Logs required before a cost model is trusted
pub const MIN_COST_LOGS: usize = 512;

const INV_PHI: f64 = 0.618_033_988_749_894_9;

// ============================================================================
// COST MODEL
// ============================================================================

/// Rating probabilities and review durations observed in real logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Rating distribution of a card's first review (Again..Easy)
    pub first_rating_prob: [f64; 4],
    /// Mean first-review duration per rating (ms)
    pub first_duration_ms: [f64; 4],
    /// Split of later recalls among Hard, Good, Easy
    pub recall_rating_prob: [f64; 3],
    /// Mean later-review duration per rating (ms)
    pub review_duration_ms: [f64; 4],
}

impl CostModel {
    /// Derive a cost model from review logs.
    ///
    /// Needs at least 512 logs, each with a duration. Ratings never observed
    /// get a zero mean duration; with no later recalls at all the recall split
    /// is uniform.
    pub fn from_logs(logs: &[ReviewLog]) -> Result<Self> {
        if logs.len() < MIN_COST_LOGS {
            return Err(Error::insufficient(format!(
                "{} review logs, need at least {MIN_COST_LOGS}",
                logs.len()
            )));
        }

        let mut groups: BTreeMap<i64, Vec<(DateTime<Utc>, Rating, f64)>> = BTreeMap::new();
        for log in logs {
            let ms = log.review_duration_ms.ok_or_else(|| {
                Error::invalid(format!(
                    "review of card {} at {} has no duration",
                    log.card_id, log.review_time
                ))
            })?;
            groups
                .entry(log.card_id)
                .or_default()
                .push((log.review_time, log.rating, ms as f64));
        }

        let mut first = Tally::default();
        let mut later = Tally::default();
        for reviews in groups.values_mut() {
            reviews.sort_by_key(|(time, _, _)| *time);
            for (i, &(_, rating, ms)) in reviews.iter().enumerate() {
                if i == 0 {
                    first.add(rating, ms);
                } else {
                    later.add(rating, ms);
                }
            }
        }

        let first_total: f64 = first.count.iter().sum();
        let recall_total: f64 = later.count[1..].iter().sum();
        let recall_rating_prob = if recall_total > 0.0 {
            [
                later.count[1] / recall_total,
                later.count[2] / recall_total,
                later.count[3] / recall_total,
            ]
        } else {
            [1.0 / 3.0; 3]
        };

        Ok(Self {
            first_rating_prob: first.count.map(|c| c / first_total),
            first_duration_ms: first.means(),
            recall_rating_prob,
            review_duration_ms: later.means(),
        })
    }

    fn draw_first<R: Rng>(&self, rng: &mut R) -> (Rating, f64) {
        let idx = pick(rng.gen_range(0.0..1.0), &self.first_rating_prob);
        (Rating::ALL[idx], self.first_duration_ms[idx])
    }

    fn draw_later<R: Rng>(&self, rng: &mut R, retention: f64) -> (Rating, f64) {
        if rng.gen_range(0.0..1.0) < retention {
            let idx = 1 + pick(rng.gen_range(0.0..1.0), &self.recall_rating_prob);
            (Rating::ALL[idx], self.review_duration_ms[idx])
        } else {
            (Rating::Again, self.review_duration_ms[0])
        }
    }
}

#[derive(Default)]
struct Tally {
    count: [f64; 4],
    total_ms: [f64; 4],
}

impl Tally {
    fn add(&mut self, rating: Rating, ms: f64) {
        let i = rating.grade() as usize - 1;
        self.count[i] += 1.0;
        self.total_ms[i] += ms;
    }

    fn means(&self) -> [f64; 4] {
        std::array::from_fn(|i| {
            if self.count[i] > 0.0 {
                self.total_ms[i] / self.count[i]
            } else {
                0.0
            }
        })
    }
}

/// Index of the bucket `u` falls into; the last bucket absorbs rounding
fn pick(u: f64, probs: &[f64]) -> usize {
    let mut acc = 0.0;
    for (i, p) in probs.iter().enumerate() {
        acc += p;
        if u < acc {
            return i;
        }
    }
    probs.len() - 1
}

// ============================================================================
// SEARCH
// ============================================================================

/// Retention search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Grid evaluated before refinement, ascending, each in (0, 1)
    pub candidates: Vec<f64>,
    /// Golden-section steps around the best grid point
    pub refine_iterations: usize,
    /// Simulated deck size
    pub num_cards: usize,
    /// Simulated days
    pub horizon_days: u32,
    pub seed: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            candidates: vec![0.70, 0.75, 0.80, 0.85, 0.90, 0.95],
            refine_iterations: 6,
            num_cards: 1000,
            horizon_days: 365,
            seed: 42,
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.candidates.is_empty() {
            return Err(Error::invalid("no retention candidates"));
        }
        if let Some(bad) = self.candidates.iter().find(|r| !(**r > 0.0 && **r < 1.0)) {
            return Err(Error::invalid(format!("retention candidate {bad} outside (0, 1)")));
        }
        if !self.candidates.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::invalid("retention candidates must be strictly ascending"));
        }
        if self.num_cards == 0 {
            return Err(Error::invalid("simulation needs at least one card"));
        }
        Ok(())
    }
}

/// Simulated review milliseconds per remembered card at `retention`.
///
/// Every card starts on 2025-01-01 and is reviewed whenever it comes due
/// until the horizon ends. Cards draw from independent generators seeded by
/// `seed + index`, so each candidate sees the same random stream.
pub fn simulate_cost(
    weights: &Weights,
    retention: f64,
    cost_model: &CostModel,
    config: &RetentionConfig,
) -> Result<f64> {
    let scheduler = Scheduler::new(
        SchedulerConfig::default()
            .with_weights(*weights)
            .with_retention(retention)
            .without_fuzzing(),
    )?;
    let start = Utc
        .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| Error::invalid("simulation start date"))?;
    let end = start + Duration::days(i64::from(config.horizon_days));

    let per_card: Vec<f64> = (0..config.num_cards)
        .into_par_iter()
        .map(|i| -> Result<f64> {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
            let mut card = Card::new(i as i64 + 1, start);
            let mut spent = 0.0;
            while card.due <= end {
                let (rating, ms) = if card.last_review.is_none() {
                    cost_model.draw_first(&mut rng)
                } else {
                    cost_model.draw_later(&mut rng, retention)
                };
                spent += ms;
                card = scheduler.review(&card, rating, card.due)?.0;
            }
            Ok(spent)
        })
        .collect::<Result<_>>()?;

    let total: f64 = per_card.iter().sum();
    ensure_finite(total / (retention * config.num_cards as f64), "simulated cost")
}

/// Retention in (0, 1) with the lowest simulated cost under `weights`
pub fn optimal_retention(weights: &Weights, cost_model: &CostModel, config: &RetentionConfig) -> Result<f64> {
    config.validate()?;
    weights.validate()?;

    let cost = |retention: f64| -> Result<f64> {
        let c = simulate_cost(weights, retention, cost_model, config)?;
        debug!(retention, cost = c, "Simulated retention");
        Ok(c)
    };

    let mut best = (f64::NAN, f64::INFINITY);
    let mut best_idx = 0;
    for (i, &retention) in config.candidates.iter().enumerate() {
        let c = cost(retention)?;
        if c < best.1 {
            best = (retention, c);
            best_idx = i;
        }
    }

    let mut lo = config.candidates[best_idx.saturating_sub(1)];
    let mut hi = config.candidates[(best_idx + 1).min(config.candidates.len() - 1)];
    if hi > lo && config.refine_iterations > 0 {
        let mut x1 = hi - INV_PHI * (hi - lo);
        let mut x2 = lo + INV_PHI * (hi - lo);
        let mut c1 = cost(x1)?;
        let mut c2 = cost(x2)?;
        for _ in 0..config.refine_iterations {
            for (x, c) in [(x1, c1), (x2, c2)] {
                if c < best.1 {
                    best = (x, c);
                }
            }
            if c1 < c2 {
                hi = x2;
                x2 = x1;
                c2 = c1;
                x1 = hi - INV_PHI * (hi - lo);
                c1 = cost(x1)?;
            } else {
                lo = x1;
                x1 = x2;
                c1 = c2;
                x2 = lo + INV_PHI * (hi - lo);
                c2 = cost(x2)?;
            }
        }
        for (x, c) in [(x1, c1), (x2, c2)] {
            if c < best.1 {
                best = (x, c);
            }
        }
    }

    info!(retention = best.0, cost = best.1, "Optimal retention found");
    Ok(best.0)
}
