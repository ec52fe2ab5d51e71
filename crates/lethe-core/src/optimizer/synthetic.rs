//! Synthetic review corpora
//!
//! Simulates learners whose memory follows a known weight vector, producing
//! review logs an optimizer can be checked against.

use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fsrs::{Rating, Scheduler, SchedulerConfig, Weights};
use crate::memory::{Card, ReviewLog};

/// Corpus generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticCorpus {
    pub num_cards: usize,
    pub reviews_per_card: usize,
    pub seed: u64,
    /// First review time of every card
    pub start: DateTime<Utc>,
}

impl Default for SyntheticCorpus {
    fn default() -> Self {
        Self {
            num_cards: 500,
            reviews_per_card: 10,
            seed: 42,
            start: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).single().unwrap_or_default(),
        }
    }
}

impl SyntheticCorpus {
    /// Simulate every card under `weights` with fuzzing off.
    ///
    /// Each review recalls with probability equal to the card's current
    /// retrievability (so a card's first review is always Again). Recalled
    /// ratings split 5% Hard, 80% Good, 15% Easy. The next review happens
    /// exactly when the card comes due. Logs are grouped by card in id order.
    pub fn generate(&self, weights: &Weights) -> Result<Vec<ReviewLog>> {
        let scheduler = Scheduler::new(SchedulerConfig::default().with_weights(*weights).without_fuzzing())?;

        let per_card: Vec<Vec<ReviewLog>> = (0..self.num_cards)
            .into_par_iter()
            .map(|i| self.simulate_card(&scheduler, i))
            .collect::<Result<_>>()?;
        Ok(per_card.into_iter().flatten().collect())
    }

    fn simulate_card(&self, scheduler: &Scheduler, index: usize) -> Result<Vec<ReviewLog>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(index as u64));
        let mut card = Card::new(index as i64 + 1, self.start);
        let mut now = self.start;
        let mut logs = Vec::with_capacity(self.reviews_per_card);

        for _ in 0..self.reviews_per_card {
            let r = scheduler.retrievability(&card, now)?;
            let rating = if rng.gen_range(0.0..1.0) < r {
                match rng.gen_range(0.0..1.0) {
                    p if p < 0.05 => Rating::Hard,
                    p if p < 0.85 => Rating::Good,
                    _ => Rating::Easy,
                }
            } else {
                Rating::Again
            };
            let duration_ms = rng.gen_range(2_000..=15_000);

            let (next, log) = scheduler.review(&card, rating, now)?;
            logs.push(log.with_duration_ms(duration_ms));
            card = next;
            now = card.due;
        }
        Ok(logs)
    }
}
