//! Score API: summarizes prediction quality for regression or classification.

use serde::{Deserialize, Serialize};

use crate::value::Num;

/// Regression scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionScores {
    pub rmse: f64,
    pub mae: f64,
    pub rsquared: f64,
}

/// Classification scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationScores {
    pub accuracy: f64,
    pub auc: f64,
    pub cross_entropy: f64,
}

/// The result of [`score`]: one of the two score shapes, depending on
/// `is_classification`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scores {
    Regression(RegressionScores),
    Classification(ClassificationScores),
}

/// Computes regression or classification scores for `yhat` against `y`.
#[must_use]
pub fn score(yhat: &[Num], y: &[Num], is_classification: bool) -> Scores {
    if is_classification {
        Scores::Classification(ClassificationScores {
            accuracy: accuracy(yhat, y),
            auc: auc(yhat, y),
            cross_entropy: cross_entropy(yhat, y),
        })
    } else {
        Scores::Regression(RegressionScores {
            rmse: rmse(yhat, y),
            mae: mae(yhat, y),
            rsquared: rsquared(yhat, y),
        })
    }
}

#[must_use]
pub fn rmse(yhat: &[Num], y: &[Num]) -> f64 {
    mse(yhat, y).sqrt()
}

fn mse(yhat: &[Num], y: &[Num]) -> f64 {
    let n = yhat.len() as f64;
    yhat.iter().zip(y).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / n
}

#[must_use]
pub fn mae(yhat: &[Num], y: &[Num]) -> f64 {
    let n = yhat.len() as f64;
    yhat.iter().zip(y).map(|(p, t)| (p - t).abs()).sum::<f64>() / n
}

#[must_use]
pub fn rsquared(yhat: &[Num], y: &[Num]) -> f64 {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let ss_tot: f64 = y.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = yhat.iter().zip(y).map(|(p, t)| (p - t).powi(2)).sum();
    if ss_tot == 0.0 {
        f64::NAN
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Predictions `>= 0.5` are classified positive.
#[must_use]
pub fn accuracy(yhat: &[Num], y: &[Num]) -> f64 {
    let n = yhat.len() as f64;
    let correct = yhat
        .iter()
        .zip(y)
        .filter(|(p, t)| (**p >= 0.5) == (**t >= 0.5))
        .count();
    correct as f64 / n
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
#[must_use]
pub fn auc(yhat: &[Num], y: &[Num]) -> f64 {
    let mut positives = Vec::new();
    let mut negatives = Vec::new();
    for (p, t) in yhat.iter().zip(y) {
        if *t >= 0.5 {
            positives.push(*p);
        } else {
            negatives.push(*p);
        }
    }
    if positives.is_empty() || negatives.is_empty() {
        return f64::NAN;
    }
    let mut wins = 0.0;
    for &p in &positives {
        for &n in &negatives {
            if p > n {
                wins += 1.0;
            } else if p == n {
                wins += 0.5;
            }
        }
    }
    wins / (positives.len() as f64 * negatives.len() as f64)
}

#[must_use]
pub fn cross_entropy(yhat: &[Num], y: &[Num]) -> f64 {
    let n = yhat.len() as f64;
    let total: f64 = yhat
        .iter()
        .zip(y)
        .map(|(p, t)| {
            let p = p.clamp(1e-12, 1.0 - 1e-12);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    total / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_regression_predictions_score_zero_error() {
        let y = [1.0, 2.0, 3.0];
        let scores = score(&y, &y, false);
        match scores {
            Scores::Regression(r) => {
                assert_eq!(r.rmse, 0.0);
                assert_eq!(r.mae, 0.0);
                assert_eq!(r.rsquared, 1.0);
            }
            Scores::Classification(_) => panic!("expected regression scores"),
        }
    }

    #[test]
    fn perfect_classification_predictions_score_full_accuracy() {
        let yhat = [0.9, 0.1, 0.8];
        let y = [1.0, 0.0, 1.0];
        let scores = score(&yhat, &y, true);
        match scores {
            Scores::Classification(c) => {
                assert_eq!(c.accuracy, 1.0);
                assert_eq!(c.auc, 1.0);
            }
            Scores::Regression(_) => panic!("expected classification scores"),
        }
    }

    #[test]
    fn auc_is_nan_with_single_class() {
        let yhat = [0.1, 0.9];
        let y = [1.0, 1.0];
        assert!(auc(&yhat, &y).is_nan());
    }
}
