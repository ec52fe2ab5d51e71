//! Forward-mode dual numbers over the FSRS weight vector
//!
//! A `Dual` carries a value together with its partial derivatives with
//! respect to all 21 weights. Evaluating the generic formulas on duals yields
//! the exact loss gradient in one pass per card.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::fsrs::{PARAMETER_COUNT, Real, Weights};

type Grad = [f64; PARAMETER_COUNT];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    pub v: f64,
    pub g: Grad,
}

impl Dual {
    /// The `i`-th weight as an independent variable
    pub fn variable(value: f64, i: usize) -> Self {
        let mut g = [0.0; PARAMETER_COUNT];
        g[i] = 1.0;
        Self { v: value, g }
    }

    /// Lift every weight into its own variable
    pub fn seed(weights: &Weights) -> [Dual; PARAMETER_COUNT] {
        std::array::from_fn(|i| Dual::variable(weights[i], i))
    }

    #[inline]
    fn map_grad(self, scale: f64) -> Grad {
        let mut g = self.g;
        for x in &mut g {
            *x *= scale;
        }
        g
    }
}

#[inline]
fn combine(a: &Grad, wa: f64, b: &Grad, wb: f64) -> Grad {
    let mut g = [0.0; PARAMETER_COUNT];
    for i in 0..PARAMETER_COUNT {
        g[i] = a[i] * wa + b[i] * wb;
    }
    g
}

impl Add for Dual {
    type Output = Dual;

    fn add(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v + rhs.v,
            g: combine(&self.g, 1.0, &rhs.g, 1.0),
        }
    }
}

impl Sub for Dual {
    type Output = Dual;

    fn sub(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v - rhs.v,
            g: combine(&self.g, 1.0, &rhs.g, -1.0),
        }
    }
}

impl Mul for Dual {
    type Output = Dual;

    fn mul(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v * rhs.v,
            g: combine(&self.g, rhs.v, &rhs.g, self.v),
        }
    }
}

impl Div for Dual {
    type Output = Dual;

    fn div(self, rhs: Dual) -> Dual {
        let inv = 1.0 / rhs.v;
        Dual {
            v: self.v * inv,
            g: combine(&self.g, inv, &rhs.g, -self.v * inv * inv),
        }
    }
}

impl Neg for Dual {
    type Output = Dual;

    fn neg(self) -> Dual {
        Dual {
            v: -self.v,
            g: self.map_grad(-1.0),
        }
    }
}

impl Real for Dual {
    #[inline]
    fn constant(value: f64) -> Self {
        Dual {
            v: value,
            g: [0.0; PARAMETER_COUNT],
        }
    }

    #[inline]
    fn value(self) -> f64 {
        self.v
    }

    fn exp(self) -> Self {
        let e = self.v.exp();
        Dual {
            v: e,
            g: self.map_grad(e),
        }
    }

    fn ln(self) -> Self {
        Dual {
            v: self.v.ln(),
            g: self.map_grad(1.0 / self.v),
        }
    }

    /// d(a^b) = a^b (b' ln a + b a' / a)
    fn powf(self, exponent: Self) -> Self {
        let v = self.v.powf(exponent.v);
        let ln_base = if self.v > 0.0 { self.v.ln() } else { 0.0 };
        let base_scale = if self.v != 0.0 {
            v * exponent.v / self.v
        } else {
            0.0
        };
        Dual {
            v,
            g: combine(&self.g, base_scale, &exponent.g, v * ln_base),
        }
    }
}
