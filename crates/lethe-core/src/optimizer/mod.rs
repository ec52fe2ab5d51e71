//! FSRS weight optimizer
//!
//! - Fitting: mini-batch Adam over per-card review histories, with exact
//!   gradients from forward-mode dual numbers
//! - Optimal retention: simulated review cost per remembered card, minimized
//!   over retention targets
//! - Synthetic corpora generated from a known weight vector

mod adam;
mod dataset;
mod dual;
mod loss;
mod retention;
mod synthetic;
mod training;

pub use adam::{Adam, CosineAnnealing};
pub use dataset::{CardHistory, TrainingReview, count_cross_day, prepare};
pub use dual::Dual;
pub use loss::{BCE_EPS, BatchGradient, batch_gradient, bce, card_loss, mean_loss};
pub use retention::{CostModel, MIN_COST_LOGS, RetentionConfig, optimal_retention, simulate_cost};
pub use synthetic::SyntheticCorpus;
pub use training::{FitResult, Optimizer, OptimizerConfig};
