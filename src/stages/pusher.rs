//! Model pusher stage.
//!
//! Publishes an accepted model: the bundle and its preprocessor are copied
//! into the run's pusher directory and to the stable registry location the
//! serving layer loads from. The registry copy is self-contained — its
//! bundle points at the registry preprocessor, so old run directories can
//! be cleaned up without breaking serving.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::PusherConfig;
use crate::domain::{EvaluationArtifact, PusherArtifact, TrainerArtifact};
use crate::error::{Stage, StageError, StageResultExt};
use crate::ml::SavedModel;

/// Pusher stage publishing to the model registry.
pub struct ModelPusher<'a> {
    config: &'a PusherConfig,
}

impl<'a> ModelPusher<'a> {
    pub fn new(config: &'a PusherConfig) -> Self {
        Self { config }
    }

    /// Publish the trained model, refusing rejected ones.
    #[instrument(skip_all)]
    pub fn run(
        &self,
        trainer: &TrainerArtifact,
        evaluation: &EvaluationArtifact,
    ) -> Result<PusherArtifact, StageError> {
        if !evaluation.is_model_accepted {
            return Err(StageError::msg(
                Stage::Push,
                "refusing to push a model that failed the acceptance gate",
            ));
        }
        self.push(trainer).at_stage(Stage::Push)
    }

    fn push(&self, trainer: &TrainerArtifact) -> Result<PusherArtifact> {
        let bundle = SavedModel::load(&trainer.model_path)?;

        // Run-local copy keeps the run directory self-describing.
        bundle.save(&self.config.pushed_model_path)?;

        // Registry copy: preprocessor lands beside the bundle and the
        // bundle is rebuilt against it, checksum included.
        let registry_prep = sibling_path(&self.config.registry_path, "latest_preprocessor.json");
        if let Some(parent) = registry_prep.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::copy(&bundle.preprocessor_path, &registry_prep).with_context(|| {
            format!(
                "copying preprocessor {} to registry",
                bundle.preprocessor_path.display()
            )
        })?;

        let registry_bundle =
            SavedModel::bundle(bundle.model_name.clone(), bundle.model, &registry_prep)?;
        registry_bundle.save(&self.config.registry_path)?;

        info!(
            registry = %self.config.registry_path.display(),
            model = %registry_bundle.model_name,
            "model pushed"
        );

        Ok(PusherArtifact {
            pushed_model_path: self.config.pushed_model_path.clone(),
            registry_path: self.config.registry_path.clone(),
        })
    }
}

fn sibling_path(path: &Path, file_name: &str) -> std::path::PathBuf {
    path.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(file_name)
}
