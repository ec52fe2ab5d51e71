//! Adam with bias correction, and a cosine-annealed learning rate
//!
//! ```text
//! m = β1 m + (1 - β1) g
//! v = β2 v + (1 - β2) g²
//! w = w - lr · m̂ / (√v̂ + ε)
//! ```

use crate::fsrs::PARAMETER_COUNT;

#[derive(Debug, Clone)]
pub struct Adam {
    beta1: f64,
    beta2: f64,
    eps: f64,
    m: [f64; PARAMETER_COUNT],
    v: [f64; PARAMETER_COUNT],
    t: i32,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            m: [0.0; PARAMETER_COUNT],
            v: [0.0; PARAMETER_COUNT],
            t: 0,
        }
    }
}

impl Adam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps taken so far
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update in place. Weights with a zero gradient are left alone.
    pub fn step(
        &mut self,
        params: &mut [f64; PARAMETER_COUNT],
        grad: &[f64; PARAMETER_COUNT],
        lr: f64,
    ) {
        self.t += 1;
        let bias1 = 1.0 - self.beta1.powi(self.t);
        let bias2 = 1.0 - self.beta2.powi(self.t);

        for i in 0..PARAMETER_COUNT {
            let g = grad[i];
            if g == 0.0 {
                continue;
            }
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = self.m[i] / bias1;
            let v_hat = self.v[i] / bias2;
            params[i] -= lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

/// `lr_t = 0.5 · lr_max · (1 + cos(π t / T))`
#[derive(Debug, Clone, Copy)]
pub struct CosineAnnealing {
    lr_max: f64,
    total_steps: usize,
}

impl CosineAnnealing {
    pub fn new(lr_max: f64, total_steps: usize) -> Self {
        Self {
            lr_max,
            total_steps: total_steps.max(1),
        }
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        let progress = step.min(self.total_steps) as f64 / self.total_steps as f64;
        0.5 * self.lr_max * (1.0 + (std::f64::consts::PI * progress).cos())
    }
}
