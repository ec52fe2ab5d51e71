//! Review logs - immutable records of review events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fsrs::Rating;

/// A single review event.
///
/// Emitted by the scheduler as an audit trail and consumed by the optimizer
/// as training data. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewLog {
    /// Card the review belongs to
    pub card_id: i64,
    /// Recall outcome
    pub rating: Rating,
    /// When the review happened
    pub review_time: DateTime<Utc>,
    /// Time spent on the review in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_duration_ms: Option<u64>,
}

impl ReviewLog {
    pub fn new(card_id: i64, rating: Rating, review_time: DateTime<Utc>) -> Self {
        Self {
            card_id,
            rating,
            review_time,
            review_duration_ms: None,
        }
    }

    /// Attach a review duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.review_duration_ms = Some(duration_ms);
        self
    }
}
