//! Model trainer stage.
//!
//! Tunes each candidate family with cross-validated grid search, scores
//! the tuned models on train and test, selects the winner by test
//! macro-F1, and persists it bundled with the fitted preprocessor
//! reference.

use anyhow::{Context, Result};
use ndarray::{s, Array2};
use tracing::{info, instrument};

use crate::config::TrainerConfig;
use crate::domain::{ClassificationMetric, TrainerArtifact, TransformationArtifact};
use crate::error::{Stage, StageError, StageResultExt};
use crate::ml::{
    classification_score, default_candidates, grid_search, load_array, SavedModel,
};

/// Folds used for every candidate's grid search.
const CV_FOLDS: usize = 3;

/// Seed for bootstrap sampling and fold assignment.
const TRAINER_SEED: u64 = 42;

/// Trainer stage over the fixed candidate set.
pub struct ModelTrainer<'a> {
    config: &'a TrainerConfig,
}

struct TunedCandidate {
    name: String,
    model: crate::ml::TrainedClassifier,
    train_metric: ClassificationMetric,
    test_metric: ClassificationMetric,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(config: &'a TrainerConfig) -> Self {
        Self { config }
    }

    /// Run training over the transformed arrays.
    #[instrument(skip_all)]
    pub fn run(
        &self,
        transformation: &TransformationArtifact,
    ) -> Result<TrainerArtifact, StageError> {
        self.train(transformation).at_stage(Stage::Training)
    }

    fn train(&self, transformation: &TransformationArtifact) -> Result<TrainerArtifact> {
        let train_array = load_array(&transformation.transformed_train_path)
            .context("loading transformed train array")?;
        let test_array = load_array(&transformation.transformed_test_path)
            .context("loading transformed test array")?;

        let (x_train, y_train) = split_features(&train_array)?;
        let (x_test, y_test) = split_features(&test_array)?;

        let classes: std::collections::BTreeSet<u64> =
            y_train.iter().map(|v| v.to_bits()).collect();
        if classes.len() < 2 {
            anyhow::bail!("training data is degenerate: only one class present");
        }

        let mut tuned = Vec::new();
        for candidate in default_candidates() {
            let search = grid_search(&candidate, x_train.view(), &y_train, CV_FOLDS, TRAINER_SEED)
                .with_context(|| format!("grid search for '{}'", candidate.name))?;

            let model = search.best_params.fit(x_train.view(), &y_train, TRAINER_SEED);

            let train_metric =
                classification_score(&y_train, &model.predict(x_train.view()));
            let test_metric = classification_score(&y_test, &model.predict(x_test.view()));

            info!(
                candidate = %candidate.name,
                cv_accuracy = search.cv_accuracy,
                train_f1 = train_metric.f1,
                test_f1 = test_metric.f1,
                "candidate tuned"
            );

            tuned.push(TunedCandidate {
                name: candidate.name,
                model,
                train_metric,
                test_metric,
            });
        }

        let best = select_best(tuned)?;

        info!(
            model = %best.name,
            test_f1 = best.test_metric.f1,
            "best model selected"
        );

        let bundle = SavedModel::bundle(
            best.name.clone(),
            best.model,
            &transformation.preprocessor_path,
        )?;
        bundle.save(&self.config.model_path)?;

        Ok(TrainerArtifact {
            model_path: self.config.model_path.clone(),
            model_name: best.name,
            train_metric: best.train_metric,
            test_metric: best.test_metric,
        })
    }
}

/// Winner by TEST F1: the generalization-oriented criterion, so an
/// overfit candidate's train score buys it nothing.
fn select_best(tuned: Vec<TunedCandidate>) -> Result<TunedCandidate> {
    tuned
        .into_iter()
        .max_by(|a, b| {
            a.test_metric
                .f1
                .partial_cmp(&b.test_metric.f1)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .context("no candidates were tuned")
}

/// Split a flat array into features and the trailing label column.
fn split_features(array: &Array2<f64>) -> Result<(Array2<f64>, Vec<f64>)> {
    if array.nrows() == 0 {
        anyhow::bail!("transformed array is empty");
    }
    if array.ncols() < 2 {
        anyhow::bail!(
            "transformed array has {} columns; need features plus a label",
            array.ncols()
        );
    }

    let features = array.slice(s![.., ..array.ncols() - 1]).to_owned();
    let labels = array.column(array.ncols() - 1).to_vec();
    Ok((features, labels))
}
