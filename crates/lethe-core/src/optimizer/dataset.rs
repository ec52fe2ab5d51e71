//! Training corpus preparation
//!
//! Groups review logs into per-card histories, chronologically ordered, with
//! whole-day elapsed times and recall labels.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::fsrs::Rating;
use crate::memory::ReviewLog;

/// One review inside a card history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReview {
    pub rating: Rating,
    /// Whole days since the card's previous review; `None` for the first review
    pub elapsed_days: Option<f64>,
    /// 0 for Again, 1 otherwise
    pub label: f64,
}

impl TrainingReview {
    /// Reviews at least one whole day after a previous review feed the loss
    #[inline]
    pub fn is_cross_day(&self) -> bool {
        self.elapsed_days.is_some_and(|days| days >= 1.0)
    }
}

/// All reviews of one card, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct CardHistory {
    pub card_id: i64,
    pub reviews: Vec<TrainingReview>,
}

impl CardHistory {
    pub fn cross_day_count(&self) -> usize {
        self.reviews.iter().filter(|r| r.is_cross_day()).count()
    }
}

/// Group `logs` by card (ascending card id) and build training histories.
///
/// Within a card the input order is kept; a timestamp earlier than its
/// predecessor is rejected. Each card is truncated to `max_seq_len` reviews.
pub fn prepare(logs: &[ReviewLog], max_seq_len: usize) -> Result<Vec<CardHistory>> {
    if logs.is_empty() {
        return Err(Error::insufficient("no review logs provided"));
    }

    let mut groups: BTreeMap<i64, Vec<&ReviewLog>> = BTreeMap::new();
    for log in logs {
        groups.entry(log.card_id).or_default().push(log);
    }

    let mut truncated = 0usize;
    let mut histories = Vec::with_capacity(groups.len());
    for (card_id, card_logs) in groups {
        for pair in card_logs.windows(2) {
            if pair[1].review_time < pair[0].review_time {
                return Err(Error::invalid(format!(
                    "logs for card {card_id} are not chronological: {} after {}",
                    pair[1].review_time, pair[0].review_time
                )));
            }
        }

        if card_logs.len() > max_seq_len {
            truncated += 1;
        }
        let reviews = card_logs
            .iter()
            .take(max_seq_len)
            .enumerate()
            .map(|(i, log)| TrainingReview {
                rating: log.rating,
                elapsed_days: (i > 0)
                    .then(|| (log.review_time - card_logs[i - 1].review_time).num_days() as f64),
                label: if log.rating.is_recall() { 1.0 } else { 0.0 },
            })
            .collect();
        histories.push(CardHistory { card_id, reviews });
    }

    if truncated > 0 {
        warn!(cards = truncated, max_seq_len, "Truncated long card histories");
    }
    Ok(histories)
}

/// Number of reviews that contribute to the loss
pub fn count_cross_day(histories: &[CardHistory]) -> usize {
    histories.iter().map(CardHistory::cross_day_count).sum()
}
