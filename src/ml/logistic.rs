//! Regularized logistic regression.
//!
//! Plain batch gradient descent on mean log-loss. Regularization follows
//! the inverse-strength convention: larger `c` means a weaker penalty.
//! Inputs are expected to be scaled, which the transformation stage
//! guarantees.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

const LEARNING_RATE: f64 = 0.1;
const MAX_ITER: usize = 500;

/// Penalty applied to the weight vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L1,
    L2,
}

/// Hyperparameters for logistic regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub penalty: Penalty,
}

/// A fitted logistic regression model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    params: LogisticParams,
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    /// Fit on 0/1 labels.
    pub fn fit(params: LogisticParams, x: ArrayView2<'_, f64>, y: &[f64]) -> Self {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let mut weights = vec![0.0f64; n_features];
        let mut bias = 0.0f64;
        let reg = 1.0 / (params.c * n_samples.max(1) as f64);

        for _ in 0..MAX_ITER {
            let mut grad_w = vec![0.0f64; n_features];
            let mut grad_b = 0.0f64;

            for (i, row) in x.rows().into_iter().enumerate() {
                let z: f64 = row
                    .iter()
                    .zip(weights.iter())
                    .map(|(xi, wi)| xi * wi)
                    .sum::<f64>()
                    + bias;
                let err = sigmoid(z) - y[i];

                for (g, xi) in grad_w.iter_mut().zip(row.iter()) {
                    *g += err * xi;
                }
                grad_b += err;
            }

            let scale = 1.0 / n_samples.max(1) as f64;
            for (w, g) in weights.iter_mut().zip(grad_w.iter()) {
                let penalty_grad = match params.penalty {
                    Penalty::L2 => reg * *w,
                    Penalty::L1 => reg * w.signum(),
                };
                *w -= LEARNING_RATE * (g * scale + penalty_grad);
            }
            bias -= LEARNING_RATE * grad_b * scale;
        }

        Self {
            params,
            weights,
            bias,
        }
    }

    /// Class-1 probability per row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let z: f64 = row
                    .iter()
                    .zip(self.weights.iter())
                    .map(|(xi, wi)| xi * wi)
                    .sum::<f64>()
                    + self.bias;
                sigmoid(z)
            })
            .collect()
    }

    /// Hard 0/1 labels per row.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        self.predict_proba(x)
            .into_iter()
            .map(|p| if p >= 0.5 { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }
}
