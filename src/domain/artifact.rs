//! Artifacts produced by pipeline stages.
//!
//! Each stage returns an immutable record of what it wrote; the next stage
//! consumes it by reference. No stage mutates an artifact it did not create.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of pulling and splitting raw data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionArtifact {
    /// Full unsplit snapshot persisted before splitting
    pub feature_store_path: PathBuf,

    /// Training split
    pub train_path: PathBuf,

    /// Test split
    pub test_path: PathBuf,
}

/// Per-column drift comparison between the two splits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub p_value: f64,
    pub drift_detected: bool,
}

/// Drift report keyed by column name.
pub type DriftReport = BTreeMap<String, DriftEntry>;

/// Result of schema and drift checks.
///
/// `validation_status` is the conjunction of the schema and domain checks
/// over both splits; drift is reported but never folded into the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationArtifact {
    pub validation_status: bool,
    pub valid_train_path: Option<PathBuf>,
    pub valid_test_path: Option<PathBuf>,
    pub invalid_train_path: Option<PathBuf>,
    pub invalid_test_path: Option<PathBuf>,
    pub drift_report_path: PathBuf,
}

/// Result of feature engineering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationArtifact {
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

/// A scored model's performance. Precision, recall, and F1 are
/// macro-averaged, so minority classes weigh equally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetric {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Result of model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerArtifact {
    pub model_path: PathBuf,

    /// Name of the winning candidate family
    pub model_name: String,

    pub train_metric: ClassificationMetric,
    pub test_metric: ClassificationMetric,
}

/// Result of the acceptance gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationArtifact {
    pub is_model_accepted: bool,

    /// Margin of the test F1 over the acceptance threshold
    pub improved_score: f64,

    pub report_path: PathBuf,
}

/// Result of publishing the accepted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PusherArtifact {
    pub pushed_model_path: PathBuf,
    pub registry_path: PathBuf,
}
