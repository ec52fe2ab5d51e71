//! Card - the unit of scheduled memory
//!
//! Each card carries:
//! - Its learning stage (`State`)
//! - The position in the short-term step sequence (Learning/Relearning only)
//! - FSRS memory state: stability and difficulty, unset until the first review
//! - The next due date and the time of the last review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fsrs::{MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY};

// ============================================================================
// STATE
// ============================================================================

/// Learning stage of a card.
///
/// `New → Learning → Review ⇄ Relearning`, with `Review` reachable directly
/// from `New` on an Easy rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum State {
    /// Never reviewed; no memory state yet
    #[default]
    New,
    /// Walking the configured learning steps
    Learning,
    /// In the long-term review cycle
    Review,
    /// Forgotten during review, walking the relearning steps
    Relearning,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::New => "New",
            State::Learning => "Learning",
            State::Review => "Review",
            State::Relearning => "Relearning",
        }
    }

    /// Whether the `step` field is meaningful in this state
    #[inline]
    pub fn uses_steps(&self) -> bool {
        matches!(self, State::Learning | State::Relearning)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD
// ============================================================================

/// One learnable item and its scheduling state.
///
/// Cards are plain values: the scheduler never mutates its input and returns
/// an updated copy instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Caller-assigned identifier, matched against review logs
    pub card_id: i64,
    /// Learning stage
    pub state: State,
    /// Index into the learning or relearning steps
    pub step: Option<usize>,
    /// Memory stability in days (unset before the first review)
    pub stability: Option<f64>,
    /// Intrinsic difficulty in [1, 10] (unset before the first review)
    pub difficulty: Option<f64>,
    /// Next scheduled review
    pub due: DateTime<Utc>,
    /// Most recent review, if any
    pub last_review: Option<DateTime<Utc>>,
}

impl Card {
    /// Create a new, never-reviewed card that is due at `due`
    pub fn new(card_id: i64, due: DateTime<Utc>) -> Self {
        Self {
            card_id,
            state: State::New,
            step: None,
            stability: None,
            difficulty: None,
            due,
            last_review: None,
        }
    }

    /// Check if this card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }

    /// Stability and difficulty, if the card has been reviewed
    pub fn memory(&self) -> Option<(f64, f64)> {
        self.stability.zip(self.difficulty)
    }

    /// Check the structural invariants of the card.
    ///
    /// - `New` cards carry no step, stability, difficulty or last review
    /// - Other states carry stability and difficulty inside their bounds
    /// - `step` is set exactly when the state is Learning or Relearning
    pub fn validate(&self) -> Result<()> {
        if self.state == State::New {
            if self.step.is_some() {
                return Err(Error::invalid(format!(
                    "card {} is New but has step set",
                    self.card_id
                )));
            }
            if self.stability.is_some() || self.difficulty.is_some() || self.last_review.is_some() {
                return Err(Error::invalid(format!(
                    "card {} is New but already carries review state",
                    self.card_id
                )));
            }
            return Ok(());
        }

        if self.state.uses_steps() != self.step.is_some() {
            return Err(Error::invalid(format!(
                "card {} in state {} has step {:?}",
                self.card_id, self.state, self.step
            )));
        }

        let (stability, difficulty) = self.memory().ok_or_else(|| {
            Error::invalid(format!(
                "card {} in state {} has no stability/difficulty",
                self.card_id, self.state
            ))
        })?;
        if !(stability.is_finite() && stability >= MIN_STABILITY) {
            return Err(Error::invalid(format!(
                "card {} has stability {stability} out of bounds",
                self.card_id
            )));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(Error::invalid(format!(
                "card {} has difficulty {difficulty} out of bounds",
                self.card_id
            )));
        }
        if self.last_review.is_none() {
            return Err(Error::invalid(format!(
                "card {} in state {} was never reviewed",
                self.card_id, self.state
            )));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
