//! Domain error type for pipeline failures.
//!
//! Every stage failure is wrapped into a single `StageError` carrying the
//! stage of origin, a short message, and the underlying cause. Stages never
//! recover; errors propagate to the orchestrator, which marks the run failed.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
    Push,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Transformation => "transformation",
            Stage::Training => "training",
            Stage::Evaluation => "evaluation",
            Stage::Push => "push",
        };
        f.write_str(name)
    }
}

/// Uniform wrapper for any failure raised inside a stage.
///
/// Constructed through [`StageError::wrap`] (or [`StageResultExt::at_stage`])
/// so the wrapping convention lives in one place.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {message}")]
pub struct StageError {
    /// Stage the failure originated from
    pub stage: Stage,

    /// Short description of what went wrong
    pub message: String,

    /// Underlying cause, preserved for diagnostics
    #[source]
    pub source: Option<anyhow::Error>,
}

impl StageError {
    /// Wrap an underlying error, tagging it with its stage of origin.
    pub fn wrap(stage: Stage, cause: anyhow::Error) -> Self {
        Self {
            stage,
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    /// Create an error with a message and no underlying cause.
    pub fn msg(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            source: None,
        }
    }

    /// The full cause chain, outermost first, for diagnostics.
    pub fn chain(&self) -> Vec<String> {
        let mut chain = vec![self.message.clone()];
        if let Some(ref source) = self.source {
            chain.extend(source.chain().skip(1).map(|c| c.to_string()));
        }
        chain
    }
}

/// Extension for converting `anyhow::Result` at a stage boundary.
pub trait StageResultExt<T> {
    /// Tag a failure with the stage it escaped from.
    fn at_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> StageResultExt<T> for anyhow::Result<T> {
    fn at_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError::wrap(stage, e))
    }
}
