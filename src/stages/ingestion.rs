//! Data ingestion stage.
//!
//! Pulls every document from the configured collection, strips the
//! store-internal id, persists the full set as a feature-store snapshot,
//! then splits into train/test and persists both.

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, instrument};

use crate::config::IngestionConfig;
use crate::domain::{Frame, IngestionArtifact};
use crate::error::{Stage, StageError, StageResultExt};
use crate::store::{DocumentStore, ID_FIELD};

/// Ingestion stage over a document store.
pub struct DataIngestion<'a> {
    config: &'a IngestionConfig,
    store: &'a dyn DocumentStore,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: &'a IngestionConfig, store: &'a dyn DocumentStore) -> Self {
        Self { config, store }
    }

    /// Run ingestion, producing the split artifact.
    #[instrument(skip(self), fields(collection = %self.config.collection))]
    pub fn run(&self) -> Result<IngestionArtifact, StageError> {
        self.ingest().at_stage(Stage::Ingestion)
    }

    fn ingest(&self) -> Result<IngestionArtifact> {
        let docs = self
            .store
            .fetch_all(&self.config.database, &self.config.collection)
            .with_context(|| {
                format!(
                    "fetching {}/{}",
                    self.config.database, self.config.collection
                )
            })?;

        if docs.is_empty() {
            anyhow::bail!(
                "collection {}/{} is empty",
                self.config.database,
                self.config.collection
            );
        }
        info!(count = docs.len(), "pulled documents from store");

        let frame = Frame::from_documents(&docs, &[ID_FIELD]);

        // Full snapshot before splitting, as the audit trail.
        frame
            .to_csv(&self.config.feature_store_path)
            .context("persisting feature store snapshot")?;

        // Random, unstratified split.
        let mut rng = match self.config.split_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let (train, test) = frame.train_test_split(self.config.test_ratio, &mut rng);

        train
            .to_csv(&self.config.train_path)
            .context("persisting train split")?;
        test.to_csv(&self.config.test_path)
            .context("persisting test split")?;

        info!(
            train_rows = train.n_rows(),
            test_rows = test.n_rows(),
            "ingestion complete"
        );

        Ok(IngestionArtifact {
            feature_store_path: self.config.feature_store_path.clone(),
            train_path: self.config.train_path.clone(),
            test_path: self.config.test_path.clone(),
        })
    }
}
