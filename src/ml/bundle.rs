//! The deployable model bundle.
//!
//! A [`SavedModel`] pairs the winning fitted classifier with the path to
//! its fitted preprocessor — a reference, not a copy, since serving must
//! replay the identical transform. The preprocessor's content hash is
//! recorded so a swapped file is detected instead of silently producing
//! garbage predictions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Frame, Value};

use super::grid::TrainedClassifier;
use super::preprocess::Preprocessor;

/// A serialized, servable model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    /// Winning candidate family name
    pub model_name: String,

    /// The fitted classifier
    pub model: TrainedClassifier,

    /// Path to the paired fitted preprocessor
    pub preprocessor_path: PathBuf,

    /// SHA-256 of the preprocessor file at bundle time
    pub preprocessor_sha256: String,
}

impl SavedModel {
    /// Bundle a fitted classifier with its preprocessor reference.
    pub fn bundle(
        model_name: impl Into<String>,
        model: TrainedClassifier,
        preprocessor_path: &Path,
    ) -> Result<Self> {
        let preprocessor_sha256 = hash_file(preprocessor_path)?;
        Ok(Self {
            model_name: model_name.into(),
            model,
            preprocessor_path: preprocessor_path.to_path_buf(),
            preprocessor_sha256,
        })
    }

    /// Persist the bundle as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("serializing model bundle")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Load a bundle persisted by [`SavedModel::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading model bundle {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing model bundle {}", path.display()))
    }

    /// Load the paired preprocessor, verifying it is the one the bundle
    /// was built against.
    pub fn load_preprocessor(&self) -> Result<Preprocessor> {
        if !self.preprocessor_path.exists() {
            anyhow::bail!(
                "preprocessor missing at {}; the bundle cannot serve predictions without it",
                self.preprocessor_path.display()
            );
        }

        let actual = hash_file(&self.preprocessor_path)?;
        if actual != self.preprocessor_sha256 {
            anyhow::bail!(
                "preprocessor at {} does not match the bundled checksum",
                self.preprocessor_path.display()
            );
        }

        Preprocessor::from_file(&self.preprocessor_path)
    }

    /// Predict the label for one raw feature row (preprocessor input
    /// order: numeric columns, then categorical).
    pub fn predict_row(&self, values: &[Value]) -> Result<i64> {
        let preprocessor = self.load_preprocessor()?;
        let x = preprocessor.transform_row(values)?;
        let preds = self.model.predict(x.view());
        Ok(preds[0] as i64)
    }

    /// Predict every row of an input CSV, appending a `prediction` column
    /// and writing the result to `output_path`.
    pub fn predict_batch(&self, input_path: &Path, output_path: &Path) -> Result<PathBuf> {
        let preprocessor = self.load_preprocessor()?;
        let frame = Frame::from_csv(input_path)?;
        if frame.is_empty() {
            anyhow::bail!("input file {} has no rows", input_path.display());
        }

        let x = preprocessor.transform(&frame)?;
        let preds = self.model.predict(x.view());

        let mut columns: Vec<String> = frame.columns().to_vec();
        columns.push("prediction".to_string());
        let mut out = Frame::new(columns);
        for (row, pred) in frame.rows().iter().zip(preds.iter()) {
            let mut row = row.clone();
            row.push(Value::Number(*pred));
            out.push_row(row)?;
        }

        out.to_csv(output_path)?;
        Ok(output_path.to_path_buf())
    }
}

/// SHA-256 of a file's contents, hex-encoded.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("hashing {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
