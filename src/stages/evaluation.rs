//! Model evaluation stage.
//!
//! The feasibility gate between training and push: the winning model is
//! accepted only when its test macro-F1 clears the configured threshold.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::EvaluationConfig;
use crate::domain::{EvaluationArtifact, TrainerArtifact};
use crate::error::{Stage, StageError, StageResultExt};

#[derive(Serialize)]
struct EvaluationReport<'a> {
    model_name: &'a str,
    test_f1: f64,
    test_accuracy: f64,
    acceptance_threshold: f64,
    is_model_accepted: bool,
    improved_score: f64,
}

/// Evaluation stage applying the acceptance gate.
pub struct ModelEvaluation<'a> {
    config: &'a EvaluationConfig,
}

impl<'a> ModelEvaluation<'a> {
    pub fn new(config: &'a EvaluationConfig) -> Self {
        Self { config }
    }

    /// Gate the trained model on its test score.
    #[instrument(skip_all)]
    pub fn run(&self, trainer: &TrainerArtifact) -> Result<EvaluationArtifact, StageError> {
        self.evaluate(trainer).at_stage(Stage::Evaluation)
    }

    fn evaluate(&self, trainer: &TrainerArtifact) -> Result<EvaluationArtifact> {
        let threshold = self.config.acceptance_threshold;
        let test_f1 = trainer.test_metric.f1;

        let accepted = test_f1 >= threshold;
        let improved_score = test_f1 - threshold;

        if accepted {
            info!(model = %trainer.model_name, test_f1, threshold, "model accepted");
        } else {
            warn!(model = %trainer.model_name, test_f1, threshold, "model rejected");
        }

        let report = EvaluationReport {
            model_name: &trainer.model_name,
            test_f1,
            test_accuracy: trainer.test_metric.accuracy,
            acceptance_threshold: threshold,
            is_model_accepted: accepted,
            improved_score,
        };

        let path = &self.config.report_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(&report).context("serializing evaluation report")?;
        std::fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;

        Ok(EvaluationArtifact {
            is_model_accepted: accepted,
            improved_score,
            report_path: path.clone(),
        })
    }
}
