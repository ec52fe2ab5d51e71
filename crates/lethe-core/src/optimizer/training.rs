//! Weight fitting
//!
//! Mini-batch gradient descent over card histories:
//! 1. Cards are shuffled once per epoch with a seeded generator
//! 2. A batch closes once it holds `mini_batch_size` cross-day reviews
//! 3. The batch gradient is computed across cards in parallel
//! 4. One serialized Adam step updates the weights, which are then clamped
//!
//! The full-corpus loss is measured after every epoch. The best vector seen
//! (including the starting one) is returned.

use std::time::Instant;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fsrs::{PARAMETER_COUNT, Weights};
use crate::memory::ReviewLog;
use crate::optimizer::adam::{Adam, CosineAnnealing};
use crate::optimizer::dataset::{self, CardHistory};
use crate::optimizer::loss;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Passes over the corpus
    pub epochs: usize,
    /// Cross-day reviews per gradient step
    pub mini_batch_size: usize,
    /// Peak learning rate of the cosine schedule
    pub learning_rate: f64,
    /// Reviews kept per card
    pub max_seq_len: usize,
    /// Seed for the per-epoch shuffle
    pub seed: u64,
    /// Epochs without improvement before stopping early (at least 1)
    pub patience: usize,
    /// Smallest loss decrease counted as an improvement
    pub min_improvement: f64,
    /// Stop after this many gradient steps
    pub max_steps: Option<usize>,
    /// Stop once this much wall time has passed (checked between batches)
    pub time_budget_secs: Option<f64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            mini_batch_size: 512,
            learning_rate: 4e-2,
            max_seq_len: 64,
            seed: 42,
            patience: 2,
            min_improvement: 1e-5,
            max_steps: None,
            time_budget_secs: None,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::invalid("epochs must be at least 1"));
        }
        if self.mini_batch_size == 0 {
            return Err(Error::invalid("mini batch size must be at least 1"));
        }
        if self.max_seq_len == 0 {
            return Err(Error::invalid("max sequence length must be at least 1"));
        }
        if self.patience == 0 {
            return Err(Error::invalid("patience must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::invalid(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.time_budget_secs.is_some_and(|s| !(s >= 0.0)) {
            return Err(Error::invalid("time budget must be non-negative"));
        }
        Ok(())
    }
}

/// Outcome of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Best weights found
    pub weights: Weights,
    /// Full-corpus loss of `weights`
    pub loss: f64,
    /// Full-corpus loss of the starting weights
    pub initial_loss: f64,
    /// Epochs completed (a budget stop counts the interrupted epoch)
    pub epochs_run: usize,
    /// The loss plateaued before the epoch or step budget ran out
    pub converged: bool,
}

// ============================================================================
// OPTIMIZER
// ============================================================================

/// Fits FSRS weights to review history
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

/// Why training left the epoch loop early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Plateau,
    Budget,
}

struct Budget {
    started: Instant,
    max_steps: Option<usize>,
    time_budget_secs: Option<f64>,
}

impl Budget {
    fn exhausted(&self, steps: usize) -> bool {
        self.max_steps.is_some_and(|max| steps >= max)
            || self
                .time_budget_secs
                .is_some_and(|secs| self.started.elapsed().as_secs_f64() >= secs)
    }
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Mean loss of `weights` over the cross-day reviews in `logs`
    pub fn batch_loss(&self, weights: &Weights, logs: &[ReviewLog]) -> Result<f64> {
        let cards = dataset::prepare(logs, self.config.max_seq_len)?;
        loss::mean_loss(weights, &cards)
    }

    /// Fit weights to `logs`, starting from `initial`.
    ///
    /// Errors:
    /// - `InsufficientData` for empty logs or fewer cross-day reviews than one
    ///   mini batch
    /// - `InvalidState` for out-of-order card logs or out-of-range `initial`
    /// - `NumericDivergence` if a loss or gradient stops being finite
    ///
    /// Running out of epochs or budget is not an error; `converged` stays
    /// false in that case.
    pub fn fit(&self, logs: &[ReviewLog], initial: Weights) -> Result<FitResult> {
        initial.validate()?;
        let cfg = &self.config;

        let cards: Vec<CardHistory> = dataset::prepare(logs, cfg.max_seq_len)?
            .into_iter()
            .filter(|card| card.cross_day_count() > 0)
            .collect();
        let total = dataset::count_cross_day(&cards);
        if total < cfg.mini_batch_size {
            return Err(Error::insufficient(format!(
                "{total} cross-day reviews, need at least {}",
                cfg.mini_batch_size
            )));
        }

        let steps_per_epoch = total.div_ceil(cfg.mini_batch_size);
        let schedule = CosineAnnealing::new(cfg.learning_rate, steps_per_epoch * cfg.epochs);
        let budget = Budget {
            started: Instant::now(),
            max_steps: cfg.max_steps,
            time_budget_secs: cfg.time_budget_secs,
        };

        let initial_loss = loss::mean_loss(&initial, &cards)?;
        info!(
            cards = cards.len(),
            reviews = total,
            loss = initial_loss,
            "Starting weight fit"
        );

        let mut adam = Adam::new();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let mut order: Vec<usize> = (0..cards.len()).collect();
        let mut params = *initial.as_array();
        let mut step = 0usize;

        let mut best = (initial, initial_loss);
        let mut last_loss = initial_loss;
        let mut stale_epochs = 0;
        let mut epochs_run = 0;
        let mut stop = None;

        for epoch in 0..cfg.epochs {
            order.shuffle(&mut rng);
            epochs_run = epoch + 1;

            let mut batch: Vec<&CardHistory> = Vec::new();
            let mut batch_reviews = 0;
            for &idx in &order {
                let card = &cards[idx];
                batch.push(card);
                batch_reviews += card.cross_day_count();
                if batch_reviews < cfg.mini_batch_size {
                    continue;
                }

                self.apply_batch(&mut adam, &mut params, &batch, schedule.lr_at(step))?;
                step += 1;
                batch.clear();
                batch_reviews = 0;

                if budget.exhausted(step) {
                    stop = Some(Stop::Budget);
                    break;
                }
            }

            if stop.is_none() && !batch.is_empty() {
                self.apply_batch(&mut adam, &mut params, &batch, schedule.lr_at(step))?;
                step += 1;
                if budget.exhausted(step) {
                    stop = Some(Stop::Budget);
                }
            }

            let weights = Weights(params);
            let epoch_loss = loss::mean_loss(&weights, &cards)?;
            info!(epoch = epochs_run, loss = epoch_loss, lr = schedule.lr_at(step), "Epoch complete");

            if epoch_loss < best.1 {
                best = (weights, epoch_loss);
            }
            if last_loss - epoch_loss > cfg.min_improvement {
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
            }
            last_loss = epoch_loss;

            if stop == Some(Stop::Budget) {
                info!(steps = step, "Training budget exhausted");
                break;
            }
            if stale_epochs >= cfg.patience {
                info!(epoch = epochs_run, "Loss plateaued, stopping early");
                stop = Some(Stop::Plateau);
                break;
            }
        }

        Ok(FitResult {
            weights: best.0,
            loss: best.1,
            initial_loss,
            epochs_run,
            converged: stop == Some(Stop::Plateau),
        })
    }

    fn apply_batch(
        &self,
        adam: &mut Adam,
        params: &mut [f64; PARAMETER_COUNT],
        batch: &[&CardHistory],
        lr: f64,
    ) -> Result<()> {
        let (batch_loss, grad) = loss::batch_gradient(&Weights(*params), batch).mean()?;
        adam.step(params, &grad, lr);
        *params = *Weights(*params).clamp().as_array();
        debug!(step = adam.steps(), loss = batch_loss, lr, "Applied batch");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
