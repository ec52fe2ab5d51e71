//! Test Data Factory
//!
//! Builds cards and review corpora for journey tests:
//! - Cards in each scheduling state
//! - Synthetic corpora drawn from known weights
//! - The perturbed weight vector used by fitting journeys

use chrono::{DateTime, Duration, TimeZone, Utc};
use lethe_core::{Card, ReviewLog, State, SyntheticCorpus, Weights};

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let logs = TestDataFactory::corpus(&TestDataFactory::true_weights(), 300, 10, 7);
/// let card = TestDataFactory::review_card(1, 12.0, 5.5, TestDataFactory::epoch());
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// Start time shared by generated corpora
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    /// Defaults with the initial stabilities moved off their defaults
    pub fn true_weights() -> Weights {
        let mut w = Weights::default();
        w.0[0] = 0.25;
        w.0[1] = 1.5;
        w.0[2] = 2.5;
        w.0[3] = 9.0;
        w
    }

    /// Synthetic review logs following `weights`
    pub fn corpus(weights: &Weights, num_cards: usize, reviews_per_card: usize, seed: u64) -> Vec<ReviewLog> {
        SyntheticCorpus {
            num_cards,
            reviews_per_card,
            seed,
            start: Self::epoch(),
        }
        .generate(weights)
        .expect("Failed to generate corpus")
    }

    /// Review-state card last seen at `last_review`, due `stability` days later
    pub fn review_card(card_id: i64, stability: f64, difficulty: f64, last_review: DateTime<Utc>) -> Card {
        Card {
            card_id,
            state: State::Review,
            step: None,
            stability: Some(stability),
            difficulty: Some(difficulty),
            due: last_review + Duration::days(stability.round() as i64),
            last_review: Some(last_review),
        }
    }

    /// Learning card sitting on `step`
    pub fn learning_card(card_id: i64, step: usize, last_review: DateTime<Utc>) -> Card {
        Card {
            card_id,
            state: State::Learning,
            step: Some(step),
            stability: Some(2.3065),
            difficulty: Some(2.118_104),
            due: last_review + Duration::minutes(10),
            last_review: Some(last_review),
        }
    }

    /// Relearning card on its first step after a lapse
    pub fn relearning_card(card_id: i64, last_review: DateTime<Utc>) -> Card {
        Card {
            card_id,
            state: State::Relearning,
            step: Some(0),
            stability: Some(0.68),
            difficulty: Some(7.4),
            due: last_review + Duration::minutes(10),
            last_review: Some(last_review),
        }
    }

    /// Review logs grouped per card, in time order
    pub fn logs_by_card(logs: &[ReviewLog]) -> Vec<Vec<ReviewLog>> {
        let mut groups: std::collections::BTreeMap<i64, Vec<ReviewLog>> = Default::default();
        for log in logs {
            groups.entry(log.card_id).or_default().push(log.clone());
        }
        groups
            .into_values()
            .map(|mut g| {
                g.sort_by_key(|l| l.review_time);
                g
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_true_weights_are_valid() {
        let w = TestDataFactory::true_weights();
        assert!(w.validate().is_ok());
        assert_ne!(w, Weights::default());
    }

    #[test]
    fn test_builders_produce_valid_cards() {
        let t = TestDataFactory::epoch();
        assert!(TestDataFactory::review_card(1, 12.0, 5.5, t).validate().is_ok());
        assert!(TestDataFactory::learning_card(2, 1, t).validate().is_ok());
        assert!(TestDataFactory::relearning_card(3, t).validate().is_ok());
    }

    #[test]
    fn test_logs_by_card() {
        let logs = TestDataFactory::corpus(&Weights::default(), 4, 3, 1);
        let groups = TestDataFactory::logs_by_card(&logs);
        assert_eq!(groups.len(), 4);
        assert!(groups.iter().all(|g| g.len() == 3));
    }
}
