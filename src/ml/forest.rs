//! Random forest classifier.
//!
//! Bootstrap-sampled probability trees with per-split feature subsampling
//! (sqrt of the feature count). Prediction averages tree outputs and
//! thresholds at 0.5.

use ndarray::ArrayView2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, TreeParams};

/// Hyperparameters for a random forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

/// A fitted random forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on 0/1 labels.
    pub fn fit(params: ForestParams, x: ArrayView2<'_, f64>, y: &[f64], seed: u64) -> Self {
        let n_samples = x.nrows();
        let max_features = ((x.ncols() as f64).sqrt().round() as usize).max(1);

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some(max_features),
        };

        let mut rng = SmallRng::seed_from_u64(seed);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::fit_on(tree_params, x, y, &bootstrap, &mut rng)
            })
            .collect();

        Self { params, trees }
    }

    /// Averaged class-1 probability per row.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let sum: f64 = self.trees.iter().map(|t| t.predict_value(row)).sum();
                sum / self.trees.len() as f64
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

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable_data() -> (Array2<f64>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let offset = if i % 2 == 0 { 0.0 } else { 10.0 };
            rows.push(vec![offset + (i as f64 % 5.0) * 0.1, offset - (i as f64 % 3.0) * 0.1]);
            labels.push((i % 2) as f64);
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        (Array2::from_shape_vec((40, 2), flat).unwrap(), labels)
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (x, y) = separable_data();
        let params = ForestParams {
            n_estimators: 20,
            max_depth: Some(5),
            min_samples_split: 2,
        };

        let forest = RandomForest::fit(params, x.view(), &y, 42);
        let preds = forest.predict(x.view());

        let correct = preds.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        assert_eq!(correct, y.len());
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let (x, y) = separable_data();
        let params = ForestParams {
            n_estimators: 5,
            max_depth: Some(3),
            min_samples_split: 2,
        };

        let a = RandomForest::fit(params, x.view(), &y, 7);
        let b = RandomForest::fit(params, x.view(), &y, 7);

        assert_eq!(a.predict_proba(x.view()), b.predict_proba(x.view()));
    }

    #[test]
    fn test_probabilities_in_unit_interval() {
        let (x, y) = separable_data();
        let params = ForestParams {
            n_estimators: 10,
            max_depth: None,
            min_samples_split: 2,
        };

        let forest = RandomForest::fit(params, x.view(), &y, 1);
        for p in forest.predict_proba(x.view()) {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
