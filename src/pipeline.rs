//! Pipeline orchestrator.
//!
//! Runs the stages in fixed order, threading each artifact into the next
//! call. Transitions are strictly sequential and forward-only; any stage
//! error moves the run to `Failed` and nothing downstream executes. The
//! orchestrator holds no retry or backoff logic — a run is all-or-nothing.

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::config::RunConfig;
use crate::domain::{DataSchema, PipelineReport, PipelineState};
use crate::error::{Stage, StageError, StageResultExt};
use crate::settings::Settings;
use crate::stages::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher, ModelTrainer,
};
use crate::store::DocumentStore;

/// Orchestrates one training run end to end.
pub struct TrainingPipeline {
    settings: Settings,
    config: RunConfig,
}

impl TrainingPipeline {
    /// Create a pipeline with a fresh run configuration.
    pub fn new(settings: Settings) -> Self {
        let config = RunConfig::new(&settings);
        Self { settings, config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute every stage in order. Returns the full report on success;
    /// on failure the error carries the originating stage and cause.
    #[instrument(skip(self, store), fields(run_id = %self.config.run_id))]
    pub fn run(&self, store: &dyn DocumentStore) -> Result<PipelineReport, StageError> {
        info!(timestamp = %self.config.timestamp, "training pipeline started");
        let mut report = PipelineReport::new(self.config.run_id, self.config.timestamp.clone());

        let result = self.run_stages(store, &mut report);

        match result {
            Ok(()) => {
                report.state = PipelineState::Done;
                report.completed_at = Some(Utc::now());
                info!("training pipeline completed");
                Ok(report)
            }
            Err(e) => {
                report.state = PipelineState::Failed {
                    stage: e.stage.to_string(),
                    error: e.message.clone(),
                };
                report.completed_at = Some(Utc::now());
                error!(stage = %e.stage, error = %e.message, "training pipeline failed");
                Err(e)
            }
        }
    }

    fn run_stages(
        &self,
        store: &dyn DocumentStore,
        report: &mut PipelineReport,
    ) -> Result<(), StageError> {
        report.state = PipelineState::Ingesting;
        let ingestion = DataIngestion::new(&self.config.ingestion, store).run()?;
        report.ingestion = Some(ingestion.clone());

        report.state = PipelineState::Validating;
        // A missing or malformed schema fails the validation stage.
        let schema = self
            .settings
            .require_schema()
            .and_then(|path| DataSchema::from_file(path))
            .at_stage(Stage::Validation)?;
        let validation = DataValidation::new(&self.config.validation, &schema).run(&ingestion)?;
        report.validation = Some(validation.clone());

        report.state = PipelineState::Transforming;
        let transformation = DataTransformation::new(&self.config.transformation, &schema)
            .run(&ingestion, &validation)?;
        report.transformation = Some(transformation.clone());

        report.state = PipelineState::Training;
        let trainer = ModelTrainer::new(&self.config.trainer).run(&transformation)?;
        report.trainer = Some(trainer.clone());

        report.state = PipelineState::Evaluating;
        let evaluation = ModelEvaluation::new(&self.config.evaluation).run(&trainer)?;
        report.evaluation = Some(evaluation.clone());

        report.state = PipelineState::Pushing;
        let pusher = ModelPusher::new(&self.config.pusher).run(&trainer, &evaluation)?;
        report.pusher = Some(pusher);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    #[test]
    fn test_failed_run_reports_origin_stage() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            artifact_root: dir.path().join("artifacts"),
            store_path: dir.path().join("store.db"),
            schema_path: dir.path().join("schema.yaml"),
            ..Settings::from_env()
        };

        // Empty store: ingestion is the first stage to raise.
        let store = SqliteStore::in_memory().unwrap();
        let pipeline = TrainingPipeline::new(settings);

        let err = pipeline.run(&store).unwrap_err();
        assert_eq!(err.stage, Stage::Ingestion);
    }

    #[test]
    fn test_run_configs_are_per_invocation() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            artifact_root: dir.path().to_path_buf(),
            ..Settings::from_env()
        };

        let a = TrainingPipeline::new(settings.clone());
        let b = TrainingPipeline::new(settings);
        assert_ne!(a.config().run_id, b.config().run_id);
    }
}
