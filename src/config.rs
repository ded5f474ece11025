//! Per-run configuration and artifact path layout.
//!
//! A [`RunConfig`] is created once at orchestrator start and passed by
//! reference to every stage. All stage output paths derive from the run's
//! timestamp, so concurrent runs never collide. Nothing here reads or
//! writes process-wide state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::settings::Settings;

/// Timestamp format used for run directory names.
const RUN_TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// File-system layout for one pipeline execution.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Timestamp string the artifact directory is named after
    pub timestamp: String,

    /// Root directory for this run's artifacts
    pub artifact_dir: PathBuf,

    pub ingestion: IngestionConfig,
    pub validation: ValidationConfig,
    pub transformation: TransformationConfig,
    pub trainer: TrainerConfig,
    pub evaluation: EvaluationConfig,
    pub pusher: PusherConfig,
}

impl RunConfig {
    /// Create a run configuration rooted under the settings' artifact root,
    /// stamped with the current time.
    pub fn new(settings: &Settings) -> Self {
        Self::at_time(settings, Utc::now())
    }

    /// Create a run configuration for an explicit timestamp.
    pub fn at_time(settings: &Settings, at: DateTime<Utc>) -> Self {
        let timestamp = at.format(RUN_TIMESTAMP_FORMAT).to_string();
        let artifact_dir = settings.artifact_root.join(&timestamp);

        Self {
            run_id: Uuid::new_v4(),
            timestamp,
            ingestion: IngestionConfig::new(&artifact_dir, settings),
            validation: ValidationConfig::new(&artifact_dir),
            transformation: TransformationConfig::new(&artifact_dir),
            trainer: TrainerConfig::new(&artifact_dir),
            evaluation: EvaluationConfig::new(&artifact_dir, settings),
            pusher: PusherConfig::new(&artifact_dir, settings),
            artifact_dir,
        }
    }
}

/// Paths and parameters for the ingestion stage.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Full unsplit snapshot of the pulled data
    pub feature_store_path: PathBuf,

    /// Training split
    pub train_path: PathBuf,

    /// Test split
    pub test_path: PathBuf,

    /// Fraction of rows held out for test
    pub test_ratio: f64,

    /// Document store database to pull from
    pub database: String,

    /// Document store collection to pull from
    pub collection: String,

    /// Seed for the split shuffle (None = entropy)
    pub split_seed: Option<u64>,
}

impl IngestionConfig {
    fn new(artifact_dir: &Path, settings: &Settings) -> Self {
        let dir = artifact_dir.join("data_ingestion");
        Self {
            feature_store_path: dir.join("feature_store").join("phishing_data.csv"),
            train_path: dir.join("ingested").join("train.csv"),
            test_path: dir.join("ingested").join("test.csv"),
            test_ratio: settings.test_ratio,
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            split_seed: None,
        }
    }
}

/// Paths for the validation stage.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub valid_dir: PathBuf,
    pub invalid_dir: PathBuf,
    pub drift_report_path: PathBuf,
}

impl ValidationConfig {
    fn new(artifact_dir: &Path) -> Self {
        let dir = artifact_dir.join("data_validation");
        Self {
            valid_dir: dir.join("validated"),
            invalid_dir: dir.join("invalid"),
            drift_report_path: dir.join("drift_report").join("report.yaml"),
        }
    }
}

/// Paths for the transformation stage.
#[derive(Debug, Clone)]
pub struct TransformationConfig {
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

impl TransformationConfig {
    fn new(artifact_dir: &Path) -> Self {
        let dir = artifact_dir.join("data_transformation");
        Self {
            transformed_train_path: dir.join("train_transformed.json"),
            transformed_test_path: dir.join("test_transformed.json"),
            preprocessor_path: dir.join("preprocessor.json"),
        }
    }
}

/// Paths for the model trainer stage.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub model_path: PathBuf,
}

impl TrainerConfig {
    fn new(artifact_dir: &Path) -> Self {
        Self {
            model_path: artifact_dir.join("model_trainer").join("model.json"),
        }
    }
}

/// Paths and gate parameters for the evaluation stage.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    pub report_path: PathBuf,

    /// Minimum test macro-F1 for acceptance
    pub acceptance_threshold: f64,
}

impl EvaluationConfig {
    fn new(artifact_dir: &Path, settings: &Settings) -> Self {
        Self {
            report_path: artifact_dir
                .join("model_evaluation")
                .join("evaluation_report.yaml"),
            acceptance_threshold: settings.acceptance_threshold,
        }
    }
}

/// Paths for the model pusher stage.
#[derive(Debug, Clone)]
pub struct PusherConfig {
    /// Run-local copy of the pushed bundle
    pub pushed_model_path: PathBuf,

    /// Stable cross-run registry location
    pub registry_path: PathBuf,
}

impl PusherConfig {
    fn new(artifact_dir: &Path, settings: &Settings) -> Self {
        Self {
            pushed_model_path: artifact_dir.join("model_pusher").join("saved_model.json"),
            registry_path: settings.registry_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_settings(root: &Path) -> Settings {
        Settings {
            artifact_root: root.to_path_buf(),
            ..Settings::from_env()
        }
    }

    #[test]
    fn test_paths_derive_from_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let settings = test_settings(Path::new("/tmp/artifacts"));
        let config = RunConfig::at_time(&settings, at);

        assert_eq!(config.timestamp, "03_14_2026_09_26_53");
        assert_eq!(
            config.artifact_dir,
            PathBuf::from("/tmp/artifacts/03_14_2026_09_26_53")
        );
        assert!(config
            .ingestion
            .train_path
            .starts_with(&config.artifact_dir));
        assert!(config
            .validation
            .drift_report_path
            .starts_with(&config.artifact_dir));
        assert!(config.trainer.model_path.starts_with(&config.artifact_dir));
    }

    #[test]
    fn test_concurrent_runs_do_not_collide() {
        let settings = test_settings(Path::new("/tmp/artifacts"));
        let a = RunConfig::at_time(&settings, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let b = RunConfig::at_time(&settings, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 1).unwrap());

        assert_ne!(a.artifact_dir, b.artifact_dir);
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_registry_path_is_run_independent() {
        let settings = test_settings(Path::new("/tmp/artifacts"));
        let a = RunConfig::at_time(&settings, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        let b = RunConfig::at_time(&settings, Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap());

        assert_eq!(a.pusher.registry_path, b.pusher.registry_path);
    }
}
