//! Memory module - Card and review-log types
//!
//! Plain data carried through the scheduler and the optimizer:
//! - Cards with their learning stage and FSRS memory state
//! - Immutable review logs

mod card;
mod review_log;

pub use card::{Card, State};
pub use review_log::ReviewLog;
