//! Data transformation stage.
//!
//! Fits the column-wise preprocessor on the training split's feature
//! columns only, applies it to both splits, and persists the transformed
//! arrays (target appended as the last column) plus the fitted
//! preprocessor object.

use anyhow::{Context, Result};
use ndarray::Array2;
use tracing::{info, instrument, warn};

use crate::config::TransformationConfig;
use crate::domain::{
    DataSchema, Frame, IngestionArtifact, TransformationArtifact, ValidationArtifact,
};
use crate::error::{Stage, StageError, StageResultExt};
use crate::ml::{save_array, Preprocessor};

/// Transformation stage over the schema's column lists.
pub struct DataTransformation<'a> {
    config: &'a TransformationConfig,
    schema: &'a DataSchema,
}

impl<'a> DataTransformation<'a> {
    pub fn new(config: &'a TransformationConfig, schema: &'a DataSchema) -> Self {
        Self { config, schema }
    }

    /// Run transformation over the ingested splits.
    #[instrument(skip_all)]
    pub fn run(
        &self,
        ingestion: &IngestionArtifact,
        validation: &ValidationArtifact,
    ) -> Result<TransformationArtifact, StageError> {
        if !validation.validation_status {
            // The pipeline does not branch on validation_status; callers
            // wanting a hard gate must inspect the artifact themselves.
            warn!("transforming a split that failed validation");
        }
        self.transform(ingestion).at_stage(Stage::Transformation)
    }

    fn transform(&self, ingestion: &IngestionArtifact) -> Result<TransformationArtifact> {
        let train =
            Frame::from_csv(&ingestion.train_path).context("reading train split")?;
        let test = Frame::from_csv(&ingestion.test_path).context("reading test split")?;

        let target = &self.schema.target_column;
        let y_train = label_vector(&train, target)?;
        let y_test = label_vector(&test, target)?;

        // Target out before fitting; statistics must never see the label.
        let x_train = train.drop_column(target)?;
        let x_test = test.drop_column(target)?;

        let preprocessor = Preprocessor::fit(
            &x_train,
            &self.schema.numerical_columns,
            &self.schema.categorical_columns,
        )?;

        let train_features = preprocessor.transform(&x_train)?;
        let test_features = preprocessor.transform(&x_test)?;

        let train_array = append_target(train_features, &y_train);
        let test_array = append_target(test_features, &y_test);

        save_array(&self.config.transformed_train_path, &train_array)
            .context("persisting transformed train array")?;
        save_array(&self.config.transformed_test_path, &test_array)
            .context("persisting transformed test array")?;
        preprocessor
            .to_file(&self.config.preprocessor_path)
            .context("persisting fitted preprocessor")?;

        info!(
            features = preprocessor.n_output_features(),
            train_rows = train_array.nrows(),
            test_rows = test_array.nrows(),
            "transformation complete"
        );

        Ok(TransformationArtifact {
            transformed_train_path: self.config.transformed_train_path.clone(),
            transformed_test_path: self.config.transformed_test_path.clone(),
            preprocessor_path: self.config.preprocessor_path.clone(),
        })
    }
}

/// Extract the label column as a numeric vector.
fn label_vector(frame: &Frame, target: &str) -> Result<Vec<f64>> {
    let values = frame
        .column(target)
        .with_context(|| format!("target column '{}' missing", target))?;

    values
        .enumerate()
        .map(|(row, v)| {
            v.as_number()
                .with_context(|| format!("target column '{}' is not numeric at row {}", target, row))
        })
        .collect()
}

/// Features plus the label as the trailing column — the flat shape the
/// trainer expects.
fn append_target(features: Array2<f64>, target: &[f64]) -> Array2<f64> {
    let (rows, cols) = features.dim();
    let mut out = Array2::zeros((rows, cols + 1));
    out.slice_mut(ndarray::s![.., ..cols]).assign(&features);
    for (r, label) in target.iter().enumerate() {
        out[[r, cols]] = *label;
    }
    out
}
