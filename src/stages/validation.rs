//! Data validation stage.
//!
//! Checks each split against the declared schema (column presence and
//! domain values, judged per split) and computes a per-column drift report
//! comparing the two splits. Drift is reported, not enforced: it never
//! affects `validation_status`.

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};

use crate::config::ValidationConfig;
use crate::domain::{
    DataSchema, DriftEntry, DriftReport, Frame, IngestionArtifact, ValidationArtifact,
};
use crate::error::{Stage, StageError, StageResultExt};
use crate::ml::ks_2samp;

/// p-value below which a column counts as drifted.
const DRIFT_ALPHA: f64 = 0.05;

/// Validation stage over a declarative schema.
pub struct DataValidation<'a> {
    config: &'a ValidationConfig,
    schema: &'a DataSchema,
}

impl<'a> DataValidation<'a> {
    pub fn new(config: &'a ValidationConfig, schema: &'a DataSchema) -> Self {
        Self { config, schema }
    }

    /// Run validation over the ingested splits.
    #[instrument(skip(self, ingestion))]
    pub fn run(&self, ingestion: &IngestionArtifact) -> Result<ValidationArtifact, StageError> {
        self.validate(ingestion).at_stage(Stage::Validation)
    }

    fn validate(&self, ingestion: &IngestionArtifact) -> Result<ValidationArtifact> {
        let train =
            Frame::from_csv(&ingestion.train_path).context("reading train split")?;
        let test = Frame::from_csv(&ingestion.test_path).context("reading test split")?;

        // Each split is judged independently: a missing column fails that
        // split, not the whole run.
        let train_ok = self.validate_columns(&train, "train") && self.validate_domain(&train, "train");
        let test_ok = self.validate_columns(&test, "test") && self.validate_domain(&test, "test");

        let drift_report = self.detect_drift(&train, &test);
        self.write_drift_report(&drift_report)?;

        let drifted = drift_report.values().filter(|e| e.drift_detected).count();
        if drifted > 0 {
            warn!(drifted, "distribution drift detected between splits");
        }

        let status = train_ok && test_ok;
        info!(validation_status = status, "validation complete");

        Ok(ValidationArtifact {
            validation_status: status,
            valid_train_path: train_ok.then(|| ingestion.train_path.clone()),
            valid_test_path: test_ok.then(|| ingestion.test_path.clone()),
            invalid_train_path: (!train_ok).then(|| ingestion.train_path.clone()),
            invalid_test_path: (!test_ok).then(|| ingestion.test_path.clone()),
            drift_report_path: self.config.drift_report_path.clone(),
        })
    }

    /// Every schema-declared column must be present in the split.
    fn validate_columns(&self, frame: &Frame, split: &str) -> bool {
        let missing: Vec<&str> = self
            .schema
            .required_columns()
            .into_iter()
            .filter(|col| !frame.has_column(col))
            .collect();

        if missing.is_empty() {
            true
        } else {
            error!(split, ?missing, "required columns missing");
            false
        }
    }

    /// Columns with an enumerated domain may only hold allowed values.
    fn validate_domain(&self, frame: &Frame, split: &str) -> bool {
        for column in frame.columns() {
            let Some(allowed) = self.schema.allowed_values(column) else {
                continue;
            };
            let violations = frame
                .column(column)
                .map(|values| {
                    values
                        .filter_map(|v| v.canonical())
                        .filter(|v| !allowed.contains(v))
                        .count()
                })
                .unwrap_or(0);

            if violations > 0 {
                error!(split, column, violations, "values outside allowed domain");
                return false;
            }
        }
        true
    }

    /// Two-sample KS scan over numeric columns present in both splits.
    fn detect_drift(&self, base: &Frame, current: &Frame) -> DriftReport {
        let mut report = DriftReport::new();

        for column in base.columns() {
            if !current.has_column(column) || !base.is_numeric_column(column) {
                continue;
            }

            let d1 = base.numeric_column(column).unwrap_or_default();
            let d2 = current.numeric_column(column).unwrap_or_default();

            if let Some(ks) = ks_2samp(&d1, &d2) {
                report.insert(
                    column.clone(),
                    DriftEntry {
                        p_value: ks.p_value,
                        drift_detected: ks.p_value < DRIFT_ALPHA,
                    },
                );
            }
        }

        report
    }

    fn write_drift_report(&self, report: &DriftReport) -> Result<()> {
        let path = &self.config.drift_report_path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(report).context("serializing drift report")?;
        std::fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "drift report saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::domain::Value;
    use crate::settings::Settings;
    use tempfile::TempDir;

    const SCHEMA_YAML: &str = r#"
columns:
  - name: packet_rate
  - name: protocol
  - name: label
numerical_columns: [packet_rate]
categorical_columns: [protocol]
target_column: label
domain_values:
  protocol: [tcp, udp]
  label: [0, 1]
"#;

    fn write_split(path: &std::path::Path, rows: &[(f64, &str, f64)]) {
        let mut frame = Frame::new(vec![
            "packet_rate".to_string(),
            "protocol".to_string(),
            "label".to_string(),
        ]);
        for (rate, proto, label) in rows {
            frame
                .push_row(vec![
                    Value::Number(*rate),
                    Value::Text(proto.to_string()),
                    Value::Number(*label),
                ])
                .unwrap();
        }
        frame.to_csv(path).unwrap();
    }

    fn setup(dir: &TempDir) -> (ValidationConfig, DataSchema, IngestionArtifact) {
        let settings = Settings {
            artifact_root: dir.path().to_path_buf(),
            ..Settings::from_env()
        };
        let run = RunConfig::new(&settings);
        let schema = DataSchema::from_yaml(SCHEMA_YAML).unwrap();

        let artifact = IngestionArtifact {
            feature_store_path: run.ingestion.feature_store_path.clone(),
            train_path: run.ingestion.train_path.clone(),
            test_path: run.ingestion.test_path.clone(),
        };
        (run.validation, schema, artifact)
    }

    #[test]
    fn test_conforming_splits_pass() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        let rows: Vec<(f64, &str, f64)> = (0..40)
            .map(|i| (i as f64, if i % 2 == 0 { "tcp" } else { "udp" }, (i % 2) as f64))
            .collect();
        write_split(&ingestion.train_path, &rows[..32]);
        write_split(&ingestion.test_path, &rows[32..]);

        let artifact = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap();

        assert!(artifact.validation_status);
        assert_eq!(artifact.valid_train_path, Some(ingestion.train_path.clone()));
        assert!(artifact.invalid_train_path.is_none());
        assert!(artifact.drift_report_path.exists());
    }

    #[test]
    fn test_missing_column_fails_only_that_split() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        let rows: Vec<(f64, &str, f64)> = (0..20)
            .map(|i| (i as f64, "tcp", (i % 2) as f64))
            .collect();
        write_split(&ingestion.train_path, &rows);

        // Test split lacks the protocol column.
        let mut test = Frame::new(vec!["packet_rate".to_string(), "label".to_string()]);
        for i in 0..5 {
            test.push_row(vec![Value::Number(i as f64), Value::Number(0.0)])
                .unwrap();
        }
        test.to_csv(&ingestion.test_path).unwrap();

        let artifact = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap();

        assert!(!artifact.validation_status);
        assert!(artifact.valid_train_path.is_some());
        assert!(artifact.valid_test_path.is_none());
        assert_eq!(artifact.invalid_test_path, Some(ingestion.test_path.clone()));
    }

    #[test]
    fn test_domain_violation_fails_split() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        let good: Vec<(f64, &str, f64)> =
            (0..20).map(|i| (i as f64, "tcp", (i % 2) as f64)).collect();
        write_split(&ingestion.train_path, &good);
        write_split(&ingestion.test_path, &[(1.0, "gopher", 0.0), (2.0, "tcp", 1.0)]);

        let artifact = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap();

        assert!(!artifact.validation_status);
        assert!(artifact.invalid_test_path.is_some());
    }

    #[test]
    fn test_validation_status_ignores_drift() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        // Wildly different packet_rate distributions, schema otherwise fine.
        let train_rows: Vec<(f64, &str, f64)> =
            (0..50).map(|i| (i as f64, "tcp", (i % 2) as f64)).collect();
        let test_rows: Vec<(f64, &str, f64)> = (0..50)
            .map(|i| (10_000.0 + i as f64, "udp", (i % 2) as f64))
            .collect();
        write_split(&ingestion.train_path, &train_rows);
        write_split(&ingestion.test_path, &test_rows);

        let artifact = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap();

        // Drift detected but the status still passes.
        assert!(artifact.validation_status);
        let report: DriftReport = serde_yaml::from_str(
            &std::fs::read_to_string(&artifact.drift_report_path).unwrap(),
        )
        .unwrap();
        assert!(report["packet_rate"].drift_detected);
    }

    #[test]
    fn test_drift_skips_text_columns() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        let rows: Vec<(f64, &str, f64)> =
            (0..30).map(|i| (i as f64, "tcp", (i % 2) as f64)).collect();
        write_split(&ingestion.train_path, &rows[..24]);
        write_split(&ingestion.test_path, &rows[24..]);

        let artifact = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap();

        let report: DriftReport = serde_yaml::from_str(
            &std::fs::read_to_string(&artifact.drift_report_path).unwrap(),
        )
        .unwrap();
        assert!(report.contains_key("packet_rate"));
        assert!(!report.contains_key("protocol"));
    }

    #[test]
    fn test_unreadable_split_wraps_stage_error() {
        let dir = TempDir::new().unwrap();
        let (config, schema, ingestion) = setup(&dir);

        let err = DataValidation::new(&config, &schema)
            .run(&ingestion)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Validation);
    }
}
