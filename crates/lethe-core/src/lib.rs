//! # Lethe Core
//!
//! Memory-decay scheduling engine built on FSRS-6:
//!
//! - **Forgetting Curve**: power-law retrievability `R = (1 + F·t/S)^C` with a trainable decay
//! - **Card State Machine**: `New → Learning → Review ⇄ Relearning` with learning steps
//! - **Scheduler**: stability/difficulty updates, retention-targeted intervals, seeded fuzzing
//! - **Optimizer**: exact-gradient Adam fitting of the 21 weights to review history
//! - **Optimal Retention**: simulated review cost minimized over retention targets
//!
//! Every operation is a pure function of its inputs. Fuzzing draws from a
//! generator seeded by the card, the review time and a configured seed, so
//! replays are reproducible even with fuzzing on.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use lethe_core::{Card, Rating, Scheduler, SchedulerConfig, State};
//!
//! let t0 = Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap();
//! let scheduler = Scheduler::new(SchedulerConfig::default().without_fuzzing())?;
//!
//! let card = Card::new(1, t0);
//! let (card, _) = scheduler.review(&card, Rating::Good, t0)?;
//! let (card, _) = scheduler.review(&card, Rating::Good, t0 + Duration::minutes(10))?;
//! assert_eq!(card.state, State::Review);
//!
//! let r = scheduler.retrievability(&card, card.due)?;
//! assert!(r > 0.85 && r <= 1.0);
//! # Ok::<(), lethe_core::Error>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod error;
pub mod fsrs;
pub mod memory;
pub mod optimizer;

/// JSON records exchanged with other implementations
pub mod records;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use error::{Error, Result};

// Memory types
pub use memory::{Card, ReviewLog, State};

// FSRS-6 algorithm
pub use fsrs::{
    // Core functions for advanced usage
    next_interval,
    retrievability,
    retrievability_now,
    review,
    PreviewResults,
    Rating,
    Scheduler,
    SchedulerConfig,
    Weights,
    // Constants
    DEFAULT_RETENTION,
    DEFAULT_WEIGHTS,
    PARAMETER_COUNT,
};

// Optimizer
pub use optimizer::{
    optimal_retention,
    CostModel,
    FitResult,
    Optimizer,
    OptimizerConfig,
    RetentionConfig,
    SyntheticCorpus,
};

// Records
pub use records::{AlignmentFile, AlignmentScenario, CardSnapshot, OptimizerBaseline, RevlogEntry};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// FSRS algorithm version (6 = 21 parameters)
pub const FSRS_VERSION: u8 = 6;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        Card, Error, FitResult, Optimizer, OptimizerConfig, Rating, Result, ReviewLog, Scheduler,
        SchedulerConfig, State, Weights,
    };
}
