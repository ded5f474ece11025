//! Candidate models and cross-validated grid search.
//!
//! The candidate set is data, not code: each candidate is a name plus a
//! list of hyperparameter records, and one generic tune-and-score routine
//! handles every family. Grid points are scored in parallel; the
//! parallelism starts and fully joins inside `grid_search`.

use anyhow::Result;
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::boosted::{BoostedParams, GradientBoostedTrees};
use super::forest::{ForestParams, RandomForest};
use super::logistic::{LogisticParams, LogisticRegression, Penalty};

/// One point in a candidate's hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum HyperParams {
    Forest(ForestParams),
    Logistic(LogisticParams),
    Boosted(BoostedParams),
}

impl HyperParams {
    /// Fit this configuration on the given data.
    pub fn fit(&self, x: ArrayView2<'_, f64>, y: &[f64], seed: u64) -> TrainedClassifier {
        match self {
            HyperParams::Forest(p) => {
                TrainedClassifier::Forest(RandomForest::fit(*p, x, y, seed))
            }
            HyperParams::Logistic(p) => {
                TrainedClassifier::Logistic(LogisticRegression::fit(*p, x, y))
            }
            HyperParams::Boosted(p) => {
                TrainedClassifier::Boosted(GradientBoostedTrees::fit(*p, x, y, seed))
            }
        }
    }
}

/// A fitted classifier of any candidate family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TrainedClassifier {
    Forest(RandomForest),
    Logistic(LogisticRegression),
    Boosted(GradientBoostedTrees),
}

impl TrainedClassifier {
    /// Hard 0/1 labels per row.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<f64> {
        match self {
            TrainedClassifier::Forest(m) => m.predict(x),
            TrainedClassifier::Logistic(m) => m.predict(x),
            TrainedClassifier::Boosted(m) => m.predict(x),
        }
    }
}

/// A named model family with its search grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub grid: Vec<HyperParams>,
}

/// The fixed candidate set: random forest, regularized logistic
/// regression, gradient-boosted trees.
pub fn default_candidates() -> Vec<Candidate> {
    let mut forest_grid = Vec::new();
    for n_estimators in [50, 100, 200] {
        for max_depth in [Some(5), Some(10), None] {
            for min_samples_split in [2, 5, 10] {
                forest_grid.push(HyperParams::Forest(ForestParams {
                    n_estimators,
                    max_depth,
                    min_samples_split,
                }));
            }
        }
    }

    let mut logistic_grid = Vec::new();
    for c in [0.1, 1.0, 10.0] {
        for penalty in [Penalty::L1, Penalty::L2] {
            logistic_grid.push(HyperParams::Logistic(LogisticParams { c, penalty }));
        }
    }

    let mut boosted_grid = Vec::new();
    for n_estimators in [50, 100, 200] {
        for max_depth in [3, 6, 10] {
            for learning_rate in [0.01, 0.1, 0.2] {
                boosted_grid.push(HyperParams::Boosted(BoostedParams {
                    n_estimators,
                    max_depth,
                    learning_rate,
                }));
            }
        }
    }

    vec![
        Candidate {
            name: "random_forest".to_string(),
            grid: forest_grid,
        },
        Candidate {
            name: "logistic_regression".to_string(),
            grid: logistic_grid,
        },
        Candidate {
            name: "gradient_boosting".to_string(),
            grid: boosted_grid,
        },
    ]
}

/// Outcome of tuning one candidate.
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: HyperParams,

    /// Mean CV accuracy of the best configuration
    pub cv_accuracy: f64,
}

/// Exhaustive k-fold cross-validated search over a candidate's grid,
/// optimizing accuracy. Ties keep the earlier grid entry.
pub fn grid_search(
    candidate: &Candidate,
    x: ArrayView2<'_, f64>,
    y: &[f64],
    folds: usize,
    seed: u64,
) -> Result<GridSearchResult> {
    if candidate.grid.is_empty() {
        anyhow::bail!("candidate '{}' has an empty grid", candidate.name);
    }
    if x.nrows() < folds || folds < 2 {
        anyhow::bail!(
            "cannot run {}-fold CV on {} samples",
            folds,
            x.nrows()
        );
    }

    let fold_assignments = assign_folds(x.nrows(), folds, seed);

    let scored: Vec<(usize, f64)> = candidate
        .grid
        .par_iter()
        .enumerate()
        .map(|(grid_idx, params)| {
            let mut fold_scores = Vec::with_capacity(folds);
            for fold in 0..folds {
                let (train_idx, val_idx): (Vec<usize>, Vec<usize>) = (0..x.nrows())
                    .partition(|i| fold_assignments[*i] != fold);

                let x_train = take_rows(x, &train_idx);
                let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
                let x_val = take_rows(x, &val_idx);
                let y_val: Vec<f64> = val_idx.iter().map(|&i| y[i]).collect();

                let model = params.fit(x_train.view(), &y_train, seed);
                let preds = model.predict(x_val.view());

                let correct = preds
                    .iter()
                    .zip(y_val.iter())
                    .filter(|(p, t)| p == t)
                    .count();
                fold_scores.push(correct as f64 / y_val.len().max(1) as f64);
            }
            let mean = fold_scores.iter().sum::<f64>() / folds as f64;
            (grid_idx, mean)
        })
        .collect();

    let (best_idx, cv_accuracy) = scored
        .into_iter()
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Prefer the earlier grid entry on equal scores.
                .then(b.0.cmp(&a.0))
        })
        .expect("non-empty grid");

    Ok(GridSearchResult {
        best_params: candidate.grid[best_idx],
        cv_accuracy,
    })
}

/// Copy the selected rows into an owned matrix.
pub fn take_rows(x: ArrayView2<'_, f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

fn assign_folds(n_samples: usize, folds: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = SmallRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut assignment = vec![0usize; n_samples];
    for (pos, &sample) in indices.iter().enumerate() {
        assignment[sample] = pos % folds;
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<f64>) {
        let mut flat = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let side = if i % 2 == 0 { 0.0 } else { 8.0 };
            flat.push(side + (i as f64 % 3.0) * 0.1);
            y.push(if side > 0.0 { 1.0 } else { 0.0 });
        }
        (Array2::from_shape_vec((30, 1), flat).unwrap(), y)
    }

    #[test]
    fn test_default_candidate_set() {
        let candidates = default_candidates();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].grid.len(), 27);
        assert_eq!(candidates[1].grid.len(), 6);
        assert_eq!(candidates[2].grid.len(), 27);
    }

    #[test]
    fn test_grid_search_finds_accurate_config() {
        let (x, y) = separable();
        let candidate = Candidate {
            name: "logistic_regression".to_string(),
            grid: vec![
                HyperParams::Logistic(LogisticParams {
                    c: 1.0,
                    penalty: Penalty::L2,
                }),
                HyperParams::Logistic(LogisticParams {
                    c: 10.0,
                    penalty: Penalty::L2,
                }),
            ],
        };

        let result = grid_search(&candidate, x.view(), &y, 3, 42).unwrap();
        assert!(result.cv_accuracy > 0.9);
    }

    #[test]
    fn test_fold_assignment_covers_all_folds() {
        let assignment = assign_folds(10, 3, 0);
        assert_eq!(assignment.len(), 10);
        for fold in 0..3 {
            assert!(assignment.iter().any(|&f| f == fold));
        }
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let x = array![[1.0], [2.0]];
        let y = vec![0.0, 1.0];
        let candidate = Candidate {
            name: "t".to_string(),
            grid: vec![HyperParams::Logistic(LogisticParams {
                c: 1.0,
                penalty: Penalty::L2,
            })],
        };

        assert!(grid_search(&candidate, x.view(), &y, 3, 0).is_err());
    }

    #[test]
    fn test_take_rows_selects_in_order() {
        let x = array![[1.0], [2.0], [3.0]];
        let taken = take_rows(x.view(), &[2, 0]);
        assert_eq!(taken, array![[3.0], [1.0]]);
    }
}
