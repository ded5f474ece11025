//! Declarative dataset schema.
//!
//! The schema YAML names every expected column, the numeric/categorical
//! split used by the transformation stage, the target column, and optional
//! per-column allowed-value sets enforced during validation.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One declared column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,

    /// Expected type tag (informational: "int", "float", "str")
    #[serde(default)]
    pub dtype: Option<String>,
}

/// The full dataset schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSchema {
    /// Every column an ingested split must contain
    pub columns: Vec<ColumnSpec>,

    /// Columns fed through the numeric preprocessing pipeline
    pub numerical_columns: Vec<String>,

    /// Columns fed through the categorical preprocessing pipeline
    pub categorical_columns: Vec<String>,

    /// The label column
    pub target_column: String,

    /// Optional enumerated allowed values per column
    #[serde(default)]
    pub domain_values: BTreeMap<String, Vec<serde_yaml::Value>>,
}

impl DataSchema {
    /// Load a schema from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading schema file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse a schema from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let schema: DataSchema =
            serde_yaml::from_str(content).context("parsing schema YAML")?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check internal consistency of the declaration.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            anyhow::bail!("schema declares no columns");
        }

        let declared: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();

        if !declared.contains(&self.target_column.as_str()) {
            anyhow::bail!(
                "target column '{}' is not among the declared columns",
                self.target_column
            );
        }

        for col in self
            .numerical_columns
            .iter()
            .chain(self.categorical_columns.iter())
        {
            if !declared.contains(&col.as_str()) {
                anyhow::bail!("feature column '{}' is not among the declared columns", col);
            }
            if col == &self.target_column {
                anyhow::bail!("target column '{}' listed as a feature", col);
            }
        }

        Ok(())
    }

    /// Names of all required columns, in declaration order.
    pub fn required_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Allowed values for a column, canonicalized to strings. None when the
    /// column has no enumerated domain.
    pub fn allowed_values(&self, column: &str) -> Option<Vec<String>> {
        self.domain_values.get(column).map(|values| {
            values
                .iter()
                .map(|v| match v {
                    serde_yaml::Value::Number(n) => {
                        let f = n.as_f64().unwrap_or(f64::NAN);
                        if f.fract() == 0.0 && f.abs() < 1e15 {
                            format!("{}", f as i64)
                        } else {
                            format!("{}", f)
                        }
                    }
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Bool(b) => format!("{}", *b as u8),
                    other => serde_yaml::to_string(other)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                })
                .collect()
        })
    }
}
