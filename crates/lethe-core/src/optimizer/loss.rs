//! Binary cross-entropy of recall predictions
//!
//! For every cross-day review the model predicts recall with the card's
//! retrievability at that moment; stability comes from folding the card's
//! earlier reviews through the same update formulas the scheduler uses.

use rayon::prelude::*;

use crate::error::{Error, Result, ensure_finite};
use crate::fsrs::{MemoryState, Model, PARAMETER_COUNT, Real, Weights};
use crate::optimizer::dataset::CardHistory;
use crate::optimizer::dual::Dual;

/// Predictions are clamped to `[EPS, 1 - EPS]` before taking logs
pub const BCE_EPS: f64 = 1e-7;

/// `-(y ln p + (1 - y) ln(1 - p))`
pub fn bce<T: Real>(prediction: T, label: f64) -> T {
    let p = prediction
        .max(T::constant(BCE_EPS))
        .min(T::constant(1.0 - BCE_EPS));
    let one = T::constant(1.0);
    -(T::constant(label) * p.ln() + T::constant(1.0 - label) * (one - p).ln())
}

/// Summed loss over one card's cross-day reviews, and how many there were
pub fn card_loss<T: Real>(model: &Model<T>, card: &CardHistory) -> (T, usize) {
    let mut memory: Option<MemoryState<T>> = None;
    let mut loss = T::constant(0.0);
    let mut count = 0;

    for review in &card.reviews {
        if let (Some(m), true) = (memory, review.is_cross_day()) {
            let elapsed = review.elapsed_days.unwrap_or(0.0);
            let r = model.retrievability(T::constant(elapsed), m.stability);
            loss = loss + bce(r, review.label);
            count += 1;
        }
        memory = Some(model.next_memory(memory, review.rating, review.elapsed_days.unwrap_or(0.0)));
    }
    (loss, count)
}

/// Summed loss, summed gradient and review count over a set of cards
#[derive(Debug, Clone, Copy)]
pub struct BatchGradient {
    pub loss_sum: f64,
    pub grad_sum: [f64; PARAMETER_COUNT],
    pub count: usize,
}

impl BatchGradient {
    fn zero() -> Self {
        Self {
            loss_sum: 0.0,
            grad_sum: [0.0; PARAMETER_COUNT],
            count: 0,
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.loss_sum += other.loss_sum;
        for (a, b) in self.grad_sum.iter_mut().zip(other.grad_sum) {
            *a += b;
        }
        self.count += other.count;
        self
    }

    /// Mean loss and mean gradient
    pub fn mean(&self) -> Result<(f64, [f64; PARAMETER_COUNT])> {
        if self.count == 0 {
            return Err(Error::insufficient("batch holds no cross-day reviews"));
        }
        let n = self.count as f64;
        let loss = ensure_finite(self.loss_sum / n, "batch loss")?;
        let mut grad = self.grad_sum;
        for g in &mut grad {
            *g = ensure_finite(*g / n, "gradient")?;
        }
        Ok((loss, grad))
    }
}

/// Exact loss gradient over `cards`, computed per card in parallel
pub fn batch_gradient(weights: &Weights, cards: &[&CardHistory]) -> BatchGradient {
    let model = Model::new(Dual::seed(weights));
    let per_card: Vec<BatchGradient> = cards
        .par_iter()
        .map(|card| {
            let (loss, count) = card_loss(&model, card);
            BatchGradient {
                loss_sum: loss.v,
                grad_sum: loss.g,
                count,
            }
        })
        .collect();
    // Summed in card order so the result does not depend on thread scheduling
    per_card
        .into_iter()
        .fold(BatchGradient::zero(), BatchGradient::merge)
}

/// Mean loss over every cross-day review in `cards`
pub fn mean_loss(weights: &Weights, cards: &[CardHistory]) -> Result<f64> {
    let model = Model::from_weights(weights);
    let per_card: Vec<(f64, usize)> = cards
        .par_iter()
        .map(|card| card_loss(&model, card))
        .collect();
    let (sum, count) = per_card
        .iter()
        .fold((0.0, 0), |acc, &(loss, n)| (acc.0 + loss, acc.1 + n));
    if count == 0 {
        return Err(Error::insufficient("corpus holds no cross-day reviews"));
    }
    ensure_finite(sum / count as f64, "loss")
}
