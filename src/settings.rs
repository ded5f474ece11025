//! Process settings resolved from the environment.
//!
//! Sources (highest priority first):
//! 1. Environment variables (NETSENTRY_HOME, NETSENTRY_STORE, NETSENTRY_SCHEMA)
//! 2. Defaults (./artifacts, ./netsentry.db, data_schema/schema.yaml)
//!
//! Settings are loaded explicitly and passed by value; nothing here is
//! cached in process-wide state, so two runs in one process can use
//! different settings.

use std::path::PathBuf;

use anyhow::Result;

/// Environment variable naming the artifact root directory.
pub const ENV_HOME: &str = "NETSENTRY_HOME";

/// Environment variable naming the document store file.
pub const ENV_STORE: &str = "NETSENTRY_STORE";

/// Environment variable naming the dataset schema file.
pub const ENV_SCHEMA: &str = "NETSENTRY_SCHEMA";

/// Environment variable naming the model registry directory.
pub const ENV_REGISTRY: &str = "NETSENTRY_REGISTRY";

/// Default database/collection queried during ingestion.
pub const DEFAULT_DATABASE: &str = "network_security";
pub const DEFAULT_COLLECTION: &str = "phishing_records";

/// Resolved process settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory for all run artifacts
    pub artifact_root: PathBuf,

    /// Path to the SQLite document store
    pub store_path: PathBuf,

    /// Path to the dataset schema YAML
    pub schema_path: PathBuf,

    /// Directory the latest pushed model is published into
    pub registry_root: PathBuf,

    /// Document store database name
    pub database: String,

    /// Document store collection name
    pub collection: String,

    /// Fraction of rows held out for the test split
    pub test_ratio: f64,

    /// Minimum test macro-F1 for a model to be accepted
    pub acceptance_threshold: f64,
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            artifact_root: std::env::var(ENV_HOME)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("artifacts")),
            store_path: std::env::var(ENV_STORE)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("netsentry.db")),
            schema_path: std::env::var(ENV_SCHEMA)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data_schema").join("schema.yaml")),
            registry_root: std::env::var(ENV_REGISTRY)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("saved_models")),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            test_ratio: 0.2,
            acceptance_threshold: 0.6,
        }
    }

    /// Require the document store file to exist.
    ///
    /// Ingestion needs the store before doing anything else; a missing store
    /// is a startup-time fatal condition, not something to discover mid-run.
    pub fn require_store(&self) -> Result<&PathBuf> {
        if !self.store_path.exists() {
            anyhow::bail!(
                "document store not found at {} (set {})",
                self.store_path.display(),
                ENV_STORE
            );
        }
        Ok(&self.store_path)
    }

    /// Require the schema file to exist.
    pub fn require_schema(&self) -> Result<&PathBuf> {
        if !self.schema_path.exists() {
            anyhow::bail!(
                "schema file not found at {} (set {})",
                self.schema_path.display(),
                ENV_SCHEMA
            );
        }
        Ok(&self.schema_path)
    }

    /// Stable registry path for the latest pushed model.
    pub fn registry_path(&self) -> PathBuf {
        self.registry_root.join("latest_model.json")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings {
            artifact_root: PathBuf::from("artifacts"),
            store_path: PathBuf::from("netsentry.db"),
            schema_path: PathBuf::from("data_schema/schema.yaml"),
            registry_root: PathBuf::from("saved_models"),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            test_ratio: 0.2,
            acceptance_threshold: 0.6,
        };

        assert_eq!(settings.test_ratio, 0.2);
        assert_eq!(
            settings.registry_path(),
            PathBuf::from("saved_models/latest_model.json")
        );
    }

    #[test]
    fn test_require_store_missing() {
        let settings = Settings {
            store_path: PathBuf::from("/nonexistent/store.db"),
            ..Settings::from_env()
        };

        let err = settings.require_store().unwrap_err();
        assert!(err.to_string().contains("document store not found"));
    }
}
