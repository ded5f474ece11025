//! Gradient-boosted trees for binary classification.
//!
//! Standard log-loss boosting: start from the prior log-odds, then fit
//! shallow regression trees to the pseudo-residuals and add them with a
//! learning-rate step.

use ndarray::ArrayView2;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeParams};

/// Hyperparameters for gradient boosting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostedParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
}

/// A fitted boosted ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostedParams,

    /// Prior log-odds of class 1
    init_score: f64,

    trees: Vec<DecisionTree>,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl GradientBoostedTrees {
    /// Fit on 0/1 labels.
    pub fn fit(params: BoostedParams, x: ArrayView2<'_, f64>, y: &[f64], seed: u64) -> Self {
        let n = y.len();
        let positives: f64 = y.iter().sum();
        let p = (positives / n.max(1) as f64).clamp(1e-6, 1.0 - 1e-6);
        let init_score = (p / (1.0 - p)).ln();

        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_samples_split: 2,
            max_features: None,
        };

        let mut rng = SmallRng::seed_from_u64(seed);
        let mut scores = vec![init_score; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = scores
                .iter()
                .zip(y.iter())
                .map(|(s, t)| t - sigmoid(*s))
                .collect();

            let tree = DecisionTree::fit(tree_params, x, &residuals, &mut rng);

            for (i, row) in x.rows().into_iter().enumerate() {
                scores[i] += params.learning_rate * tree.predict_value(row);
            }
            trees.push(tree);
        }

        Self {
            params,
            init_score,
            trees,
        }
    }

    /// Class-1 probability per row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let score: f64 = self.init_score
                    + self
                        .trees
                        .iter()
                        .map(|t| self.params.learning_rate * t.predict_value(row))
                        .sum::<f64>();
                sigmoid(score)
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

    pub fn params(&self) -> &BoostedParams {
        &self.params
    }
}
