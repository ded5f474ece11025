//! Data structures shared across pipeline stages.
//!
//! Artifacts are immutable records describing a completed stage's outputs;
//! the schema declares what ingested data must look like; the frame is the
//! in-memory tabular representation flowing between ingestion, validation,
//! and transformation.

pub mod artifact;
pub mod frame;
pub mod run;
pub mod schema;

pub use artifact::{
    ClassificationMetric, DriftEntry, DriftReport, EvaluationArtifact, IngestionArtifact,
    PusherArtifact, TrainerArtifact, TransformationArtifact, ValidationArtifact,
};
pub use frame::{Frame, Value};
pub use run::{PipelineReport, PipelineState};
pub use schema::{ColumnSpec, DataSchema};
