//! Column-wise feature preprocessing.
//!
//! Numeric columns: median imputation, then zero-mean/unit-variance
//! scaling. Categorical columns: most-frequent imputation, one-hot
//! encoding (unknown categories at transform time produce all-zero
//! indicators instead of erroring), then per-indicator scaling without
//! mean centering, since the one-hot output is non-negative.
//!
//! Statistics are fit exclusively on the training split; the test split
//! and serving-time rows only ever pass through `transform`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::domain::{Frame, Value};

/// Fitted statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericColumn {
    name: String,
    median: f64,
    mean: f64,
    std: f64,
}

/// Fitted statistics for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalColumn {
    name: String,
    mode: String,

    /// Known categories, sorted; one output indicator per entry
    categories: Vec<String>,

    /// Per-indicator scale (train-split standard deviation, 1.0 if constant)
    scales: Vec<f64>,
}

/// The fitted column-wise preprocessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric: Vec<NumericColumn>,
    categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    /// Fit on the training split's feature columns.
    pub fn fit(frame: &Frame, numerical: &[String], categorical: &[String]) -> Result<Self> {
        let mut numeric = Vec::with_capacity(numerical.len());
        for name in numerical {
            let values: Vec<f64> = frame
                .column(name)
                .with_context(|| format!("numeric column '{}' missing from training data", name))?
                .filter_map(Value::as_number)
                .collect();
            if values.is_empty() {
                anyhow::bail!("numeric column '{}' has no numeric values", name);
            }

            let median = median_of(&values);

            // Scaler statistics are computed after imputation, so nulls
            // contribute the median.
            let n = frame.n_rows() as f64;
            let imputed: Vec<f64> = frame
                .column(name)?
                .map(|v| v.as_number().unwrap_or(median))
                .collect();
            let mean = imputed.iter().sum::<f64>() / n;
            let var = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = if var > 0.0 { var.sqrt() } else { 1.0 };

            numeric.push(NumericColumn {
                name: name.clone(),
                median,
                mean,
                std,
            });
        }

        let mut cat = Vec::with_capacity(categorical.len());
        for name in categorical {
            let raw: Vec<Option<String>> = frame
                .column(name)
                .with_context(|| {
                    format!("categorical column '{}' missing from training data", name)
                })?
                .map(|v| v.canonical())
                .collect();

            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for value in raw.iter().flatten() {
                *counts.entry(value.clone()).or_insert(0) += 1;
            }
            if counts.is_empty() {
                anyhow::bail!("categorical column '{}' has no values", name);
            }

            // Ties break toward the lexicographically smallest value: the
            // map iterates ascending and only a strictly higher count wins.
            let mut mode = String::new();
            let mut best_count = 0usize;
            for (value, count) in &counts {
                if *count > best_count {
                    best_count = *count;
                    mode = value.clone();
                }
            }

            let imputed: Vec<String> = raw
                .into_iter()
                .map(|v| v.unwrap_or_else(|| mode.clone()))
                .collect();

            let mut categories: Vec<String> = imputed.clone();
            categories.sort();
            categories.dedup();

            let n = imputed.len() as f64;
            let scales: Vec<f64> = categories
                .iter()
                .map(|category| {
                    let p = imputed.iter().filter(|v| *v == category).count() as f64 / n;
                    let var = p * (1.0 - p);
                    if var > 0.0 {
                        var.sqrt()
                    } else {
                        1.0
                    }
                })
                .collect();

            cat.push(CategoricalColumn {
                name: name.clone(),
                mode,
                categories,
                scales,
            });
        }

        Ok(Self {
            numeric,
            categorical: cat,
        })
    }

    /// Feature columns in the order `transform_row` expects its input.
    pub fn input_columns(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|c| c.name.clone())
            .chain(self.categorical.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Width of the transformed feature matrix.
    pub fn n_output_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Transform a frame's feature columns into a numeric matrix.
    pub fn transform(&self, frame: &Frame) -> Result<Array2<f64>> {
        let n_rows = frame.n_rows();
        let n_out = self.n_output_features();
        let mut out = Array2::zeros((n_rows, n_out));

        let mut offset = 0;
        for col in &self.numeric {
            let idx = frame
                .column_index(&col.name)
                .with_context(|| format!("numeric column '{}' missing", col.name))?;
            for (r, row) in frame.rows().iter().enumerate() {
                let raw = row[idx].as_number().unwrap_or(col.median);
                out[[r, offset]] = (raw - col.mean) / col.std;
            }
            offset += 1;
        }

        for col in &self.categorical {
            let idx = frame
                .column_index(&col.name)
                .with_context(|| format!("categorical column '{}' missing", col.name))?;
            for (r, row) in frame.rows().iter().enumerate() {
                let value = row[idx]
                    .canonical()
                    .unwrap_or_else(|| col.mode.clone());
                // Unknown category: every indicator stays zero.
                if let Some(pos) = col.categories.iter().position(|c| *c == value) {
                    out[[r, offset + pos]] = 1.0 / col.scales[pos];
                }
            }
            offset += col.categories.len();
        }

        Ok(out)
    }

    /// Transform a single serving-time row given positionally, in
    /// [`Preprocessor::input_columns`] order.
    pub fn transform_row(&self, values: &[Value]) -> Result<Array2<f64>> {
        let columns = self.input_columns();
        if values.len() != columns.len() {
            anyhow::bail!(
                "expected {} feature values ({}), got {}",
                columns.len(),
                columns.join(", "),
                values.len()
            );
        }

        let mut frame = Frame::new(columns);
        frame.push_row(values.to_vec())?;
        self.transform(&frame)
    }

    /// Persist the fitted preprocessor as JSON.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("serializing preprocessor")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Load a preprocessor persisted by [`Preprocessor::to_file`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading preprocessor {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("parsing preprocessor {}", path.display()))
    }
}

fn median_of(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn training_frame() -> Frame {
        let mut frame = Frame::new(vec![
            "packet_rate".to_string(),
            "protocol".to_string(),
        ]);
        let rows = vec![
            (Value::Number(1.0), Value::Text("tcp".into())),
            (Value::Number(2.0), Value::Text("udp".into())),
            (Value::Number(3.0), Value::Text("tcp".into())),
            (Value::Null, Value::Text("icmp".into())),
            (Value::Number(4.0), Value::Null),
        ];
        for (a, b) in rows {
            frame.push_row(vec![a, b]).unwrap();
        }
        frame
    }

    fn fitted() -> Preprocessor {
        Preprocessor::fit(
            &training_frame(),
            &["packet_rate".to_string()],
            &["protocol".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn test_output_width_is_numeric_plus_categories() {
        let prep = fitted();
        // 1 numeric + 3 protocol categories (icmp, tcp, udp)
        assert_eq!(prep.n_output_features(), 4);
        assert_eq!(prep.input_columns(), vec!["packet_rate", "protocol"]);
    }

    #[test]
    fn test_transform_shape_and_rows_preserved() {
        let prep = fitted();
        let out = prep.transform(&training_frame()).unwrap();
        assert_eq!(out.nrows(), 5);
        assert_eq!(out.ncols(), 4);
    }

    #[test]
    fn test_numeric_scaling_centers_train_split() {
        let prep = fitted();
        let out = prep.transform(&training_frame()).unwrap();

        let col_mean: f64 = out.column(0).iter().sum::<f64>() / out.nrows() as f64;
        assert!(col_mean.abs() < 1e-9);
    }

    #[test]
    fn test_unknown_category_encodes_to_zeros() {
        let prep = fitted();
        let out = prep
            .transform_row(&[Value::Number(2.0), Value::Text("sctp".into())])
            .unwrap();

        for c in 1..4 {
            assert_eq!(out[[0, c]], 0.0);
        }
    }

    #[test]
    fn test_null_categorical_imputes_mode() {
        let prep = fitted();
        let with_null = prep
            .transform_row(&[Value::Number(2.0), Value::Null])
            .unwrap();
        let with_mode = prep
            .transform_row(&[Value::Number(2.0), Value::Text("tcp".into())])
            .unwrap();

        assert_eq!(with_null, with_mode);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prep.json");

        let prep = fitted();
        prep.to_file(&path).unwrap();
        let reloaded = Preprocessor::from_file(&path).unwrap();
        assert_eq!(reloaded, prep);

        let a = prep.transform(&training_frame()).unwrap();
        let b = reloaded.transform(&training_frame()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_column_errors() {
        let frame = Frame::new(vec!["other".to_string()]);
        let result = Preprocessor::fit(&frame, &["packet_rate".to_string()], &[]);
        assert!(result.is_err());
    }
}
