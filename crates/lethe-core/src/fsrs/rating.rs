//! Review ratings

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The user's assessment of how well a card was recalled.
///
/// Serializes as its name (`"Good"`); converts to and from the integer
/// grades 1..=4 used by review-log corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    /// Complete failure to recall
    Again = 1,
    /// Recalled with significant difficulty
    Hard = 2,
    /// Recalled with some effort
    Good = 3,
    /// Recalled effortlessly
    Easy = 4,
}

impl Rating {
    /// All ratings in grade order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Integer grade (1 = Again .. 4 = Easy)
    #[inline]
    pub fn grade(self) -> u8 {
        self as u8
    }

    /// Grade as a float, for use inside the update formulas
    #[inline]
    pub(crate) fn as_f64(self) -> f64 {
        f64::from(self.grade())
    }

    /// Whether the card was recalled (anything but Again)
    #[inline]
    pub fn is_recall(self) -> bool {
        self != Rating::Again
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }

    /// Parse from the rating name (case-insensitive)
    pub fn parse_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "again" => Ok(Rating::Again),
            "hard" => Ok(Rating::Hard),
            "good" => Ok(Rating::Good),
            "easy" => Ok(Rating::Easy),
            _ => Err(Error::invalid(format!("unknown rating: {s:?}"))),
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(grade: u8) -> Result<Self> {
        match grade {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            _ => Err(Error::invalid(format!("rating out of range: {grade}"))),
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
