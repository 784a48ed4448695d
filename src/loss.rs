//! Second-order loss functions (C7): the surrogate every split-gain and leaf
//! weight computation in [`crate::binning`] and [`crate::tree`] is built on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Num;

/// L2 regularization applied to leaf weights by every concrete loss.
pub const DEFAULT_LAMBDA: f64 = 1.0;

/// A second-order boosting loss: residuals, curvatures, and a 1-D line
/// search for the per-round update rate.
pub trait LossFunction: Send + Sync {
    /// `g_i = ∂L/∂ŷ_i` for every row.
    fn gradients(&self, yhat: &[Num], y: &[Num]) -> Vec<Num>;

    /// `h_i = ∂²L/∂ŷ_i²` for every row.
    fn curvatures(&self, yhat: &[Num], y: &[Num]) -> Vec<Num>;

    /// L2 penalty on leaf weights used by every split-gain computation.
    fn lambda(&self) -> f64 {
        DEFAULT_LAMBDA
    }

    /// Optimal leaf weight given accumulated `(Σg, Σh)`.
    fn optimal_weight(&self, sum_g: f64, sum_h: f64) -> f64 {
        crate::binning::optimal_weight(sum_g, sum_h, self.lambda())
    }

    /// Solves for the update rate `η` minimizing `L(ŷ + η·Δŷ)` via 1-D line
    /// search.
    fn line_search(&self, yhat: &[Num], y: &[Num], delta: &[Num]) -> f64;

    fn name(&self) -> &'static str;
}

/// Regression loss: `g_i = ŷ_i - y_i`, `h_i = 1`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SquareLoss;

impl LossFunction for SquareLoss {
    fn gradients(&self, yhat: &[Num], y: &[Num]) -> Vec<Num> {
        yhat.iter().zip(y).map(|(p, t)| p - t).collect()
    }

    fn curvatures(&self, yhat: &[Num], _y: &[Num]) -> Vec<Num> {
        vec![1.0; yhat.len()]
    }

    fn line_search(&self, yhat: &[Num], y: &[Num], delta: &[Num]) -> f64 {
        // Closed form: eta = sum(residual * delta) / sum(delta^2), where
        // residual = y - yhat (so a positive eta moves yhat toward y).
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..yhat.len() {
            let residual = y[i] - yhat[i];
            num += residual * delta[i];
            den += delta[i] * delta[i];
        }
        if den.abs() < 1e-12 {
            0.0
        } else {
            num / den
        }
    }

    fn name(&self) -> &'static str {
        "square_loss"
    }
}

/// Binary classification loss with `σ(ŷ) = 1/(1+e^{-ŷ})`: `g_i = σ - y`,
/// `h_i = σ(1-σ)`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CrossEntropyLoss;

fn sigmoid(x: Num) -> Num {
    1.0 / (1.0 + (-x).exp())
}

impl CrossEntropyLoss {
    fn loss_at(&self, yhat: &[Num], y: &[Num], eta: f64, delta: &[Num]) -> f64 {
        let mut total = 0.0;
        for i in 0..yhat.len() {
            let p = sigmoid(yhat[i] + eta * delta[i]).clamp(1e-12, 1.0 - 1e-12);
            total -= y[i] * p.ln() + (1.0 - y[i]) * (1.0 - p).ln();
        }
        total
    }
}

impl LossFunction for CrossEntropyLoss {
    fn gradients(&self, yhat: &[Num], y: &[Num]) -> Vec<Num> {
        yhat.iter().zip(y).map(|(p, t)| sigmoid(*p) - t).collect()
    }

    fn curvatures(&self, yhat: &[Num], _y: &[Num]) -> Vec<Num> {
        yhat.iter()
            .map(|p| {
                let s = sigmoid(*p);
                (s * (1.0 - s)).max(1e-12)
            })
            .collect()
    }

    fn line_search(&self, yhat: &[Num], y: &[Num], delta: &[Num]) -> f64 {
        // No closed form; bounded bisection on the golden-section style
        // since the loss is convex in eta along a fixed descent direction.
        let mut lo = -5.0_f64;
        let mut hi = 5.0_f64;
        for _ in 0..40 {
            let m1 = lo + (hi - lo) / 3.0;
            let m2 = hi - (hi - lo) / 3.0;
            if self.loss_at(yhat, y, m1, delta) < self.loss_at(yhat, y, m2, delta) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        (lo + hi) / 2.0
    }

    fn name(&self) -> &'static str {
        "cross_entropy_loss"
    }
}

/// Errors raised resolving a loss function by name from the hyperparameter
/// bag.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LossError {
    #[error("unknown loss function '{0}'")]
    Unknown(String),
}

/// Resolves a loss function by name, accepting both the internal
/// `snake_case` form (`square_loss`) and the Fit API's `PascalCase` form
/// (`SquareLoss`) — matched case- and separator-insensitively so either
/// spelling works.
pub fn by_name(name: &str) -> Result<Box<dyn LossFunction>, LossError> {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    match normalized.as_str() {
        "squareloss" => Ok(Box::new(SquareLoss)),
        "crossentropyloss" => Ok(Box::new(CrossEntropyLoss)),
        _ => Err(LossError::Unknown(name.to_string())),
    }
}
