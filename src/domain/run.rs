//! Run state for a pipeline execution.
//!
//! Transitions are strictly sequential and forward-only; `Failed` is
//! terminal and reachable from any state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifact::{
    EvaluationArtifact, IngestionArtifact, PusherArtifact, TrainerArtifact,
    TransformationArtifact, ValidationArtifact,
};

/// State of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PipelineState {
    Ingesting,
    Validating,
    Transforming,
    Training,
    Evaluating,
    Pushing,
    Done,
    Failed { stage: String, error: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }
}

/// Everything a completed (or failed) run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,

    /// Timestamp the artifact directory is named after
    pub timestamp: String,

    pub state: PipelineState,

    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    pub ingestion: Option<IngestionArtifact>,
    pub validation: Option<ValidationArtifact>,
    pub transformation: Option<TransformationArtifact>,
    pub trainer: Option<TrainerArtifact>,
    pub evaluation: Option<EvaluationArtifact>,
    pub pusher: Option<PusherArtifact>,
}

impl PipelineReport {
    /// Fresh report for a run that is about to start ingesting.
    pub fn new(run_id: Uuid, timestamp: String) -> Self {
        Self {
            run_id,
            timestamp,
            state: PipelineState::Ingesting,
            started_at: Utc::now(),
            completed_at: None,
            ingestion: None,
            validation: None,
            transformation: None,
            trainer: None,
            evaluation: None,
            pusher: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_starts_ingesting() {
        let report = PipelineReport::new(Uuid::new_v4(), "01_01_2026_00_00_00".to_string());

        assert_eq!(report.state, PipelineState::Ingesting);
        assert!(!report.is_finished());
        assert!(report.trainer.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed {
            stage: "training".to_string(),
            error: "empty array".to_string()
        }
        .is_terminal());
        assert!(!PipelineState::Training.is_terminal());
    }

    #[test]
    fn test_state_serialization_tag() {
        let state = PipelineState::Failed {
            stage: "validation".to_string(),
            error: "missing column".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains(r#""state":"failed""#));
    }
}
