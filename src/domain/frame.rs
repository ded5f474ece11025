//! In-memory tabular data.
//!
//! A [`Frame`] is a small column-named row store: one row per ingested
//! document, values either numeric, text, or missing. CSV is the on-disk
//! interchange format between stages.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Null,
}

impl Value {
    /// Canonical string form used for domain checks and CSV output.
    ///
    /// Whole numbers print without a fractional part so `1.0` and `"1"`
    /// compare equal against a schema's allowed-value set.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Value::Number(n) => Some(format_number(*n)),
            Value::Text(s) => Some(s.clone()),
            Value::Null => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Null => Ok(()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Column-named row store.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Create an empty frame with the given column names.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a frame from JSON documents. Columns are the union of keys in
    /// sorted order; keys named in `drop` (the store-internal id) are
    /// stripped. Missing keys become nulls.
    pub fn from_documents(docs: &[BTreeMap<String, serde_json::Value>], drop: &[&str]) -> Self {
        let mut columns: Vec<String> = docs
            .iter()
            .flat_map(|d| d.keys().cloned())
            .filter(|k| !drop.contains(&k.as_str()))
            .collect();
        columns.sort();
        columns.dedup();

        let rows = docs
            .iter()
            .map(|doc| {
                columns
                    .iter()
                    .map(|col| match doc.get(col) {
                        Some(serde_json::Value::Number(n)) => {
                            Value::Number(n.as_f64().unwrap_or(f64::NAN))
                        }
                        Some(serde_json::Value::String(s)) => Value::Text(s.clone()),
                        Some(serde_json::Value::Bool(b)) => {
                            Value::Number(if *b { 1.0 } else { 0.0 })
                        }
                        Some(serde_json::Value::Null) | None => Value::Null,
                        Some(other) => Value::Text(other.to_string()),
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Append a row. The row length must match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            anyhow::bail!(
                "row has {} values, frame has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterate a column's values. Errors if the column does not exist.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value>> {
        let idx = self
            .column_index(name)
            .with_context(|| format!("no such column: {}", name))?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Non-null numeric values of a column. Empty result for text columns.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.column(name)?.filter_map(Value::as_number).collect())
    }

    /// A column counts as numeric when it has at least one value and every
    /// non-null value is a number.
    pub fn is_numeric_column(&self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut seen = false;
        for row in &self.rows {
            match &row[idx] {
                Value::Number(_) => seen = true,
                Value::Null => {}
                Value::Text(_) => return false,
            }
        }
        seen
    }

    /// Copy of the frame without the named column.
    pub fn drop_column(&self, name: &str) -> Result<Frame> {
        let idx = self
            .column_index(name)
            .with_context(|| format!("no such column: {}", name))?;

        let columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, c)| c.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .collect();

        Ok(Frame { columns, rows })
    }

    /// Shuffle rows and split off the trailing fraction as the test set.
    ///
    /// The split is random, not stratified.
    pub fn train_test_split<R: Rng>(&self, test_ratio: f64, rng: &mut R) -> (Frame, Frame) {
        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        indices.shuffle(rng);

        let test_size = (self.rows.len() as f64 * test_ratio).round() as usize;
        let (test_idx, train_idx) = indices.split_at(test_size.min(indices.len()));

        let pick = |idx: &[usize]| Frame {
            columns: self.columns.clone(),
            rows: idx.iter().map(|&i| self.rows[i].clone()).collect(),
        };

        (pick(train_idx), pick(test_idx))
    }

    /// Write the frame as CSV, creating parent directories.
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut out = String::new();
        out.push_str(&self.columns.iter().map(|c| escape_csv(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::Text(s) => escape_csv(s),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }

        std::fs::write(path, out).with_context(|| format!("writing {}", path.display()))
    }

    /// Read a CSV written by [`Frame::to_csv`]. Unquoted numeric fields
    /// parse as numbers, empty fields as nulls, everything else as text.
    pub fn from_csv(path: &Path) -> Result<Frame> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut lines = content.lines();

        let header = lines
            .next()
            .with_context(|| format!("{} is empty", path.display()))?;
        let columns = split_csv_line(header);

        let mut frame = Frame::new(columns);
        for (line_no, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields = split_csv_line(line);
            let row: Vec<Value> = fields
                .into_iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else if let Ok(n) = field.parse::<f64>() {
                        Value::Number(n)
                    } else {
                        Value::Text(field)
                    }
                })
                .collect();
            frame
                .push_row(row)
                .with_context(|| format!("{}: line {}", path.display(), line_no + 2))?;
        }

        Ok(frame)
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn sample_frame() -> Frame {
        let mut frame = Frame::new(vec![
            "bytes".to_string(),
            "proto".to_string(),
            "label".to_string(),
        ]);
        for i in 0..10 {
            frame
                .push_row(vec![
                    Value::Number(i as f64 * 10.0),
                    Value::Text(if i % 2 == 0 { "tcp" } else { "udp" }.to_string()),
                    Value::Number((i % 2) as f64),
                ])
                .unwrap();
        }
        frame
    }

    #[test]
    fn test_from_documents_strips_id_and_sorts_columns() {
        let doc: BTreeMap<String, serde_json::Value> = serde_json::from_str(
            r#"{"_id": "abc", "proto": "tcp", "bytes": 42}"#,
        )
        .unwrap();

        let frame = Frame::from_documents(&[doc], &["_id"]);
        assert_eq!(frame.columns(), &["bytes".to_string(), "proto".to_string()]);
        assert_eq!(frame.rows()[0][0], Value::Number(42.0));
        assert_eq!(frame.rows()[0][1], Value::Text("tcp".to_string()));
    }

    #[test]
    fn test_numeric_column_detection() {
        let frame = sample_frame();
        assert!(frame.is_numeric_column("bytes"));
        assert!(frame.is_numeric_column("label"));
        assert!(!frame.is_numeric_column("proto"));
        assert!(!frame.is_numeric_column("missing"));
    }

    #[test]
    fn test_split_preserves_rows() {
        let frame = sample_frame();
        let mut rng = SmallRng::seed_from_u64(7);
        let (train, test) = frame.train_test_split(0.2, &mut rng);

        assert_eq!(train.n_rows(), 8);
        assert_eq!(test.n_rows(), 2);
        assert_eq!(train.columns(), frame.columns());
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");

        let mut frame = sample_frame();
        frame
            .push_row(vec![
                Value::Null,
                Value::Text("needs,quoting".to_string()),
                Value::Number(1.0),
            ])
            .unwrap();
        frame.to_csv(&path).unwrap();

        let loaded = Frame::from_csv(&path).unwrap();
        assert_eq!(loaded, frame);
    }

    #[test]
    fn test_drop_column() {
        let frame = sample_frame();
        let dropped = frame.drop_column("proto").unwrap();

        assert_eq!(dropped.n_cols(), 2);
        assert!(!dropped.has_column("proto"));
        assert_eq!(dropped.n_rows(), frame.n_rows());
    }

    #[test]
    fn test_canonical_value_formatting() {
        assert_eq!(Value::Number(1.0).canonical().unwrap(), "1");
        assert_eq!(Value::Number(-1.0).canonical().unwrap(), "-1");
        assert_eq!(Value::Number(0.5).canonical().unwrap(), "0.5");
        assert_eq!(Value::Text("tcp".into()).canonical().unwrap(), "tcp");
        assert!(Value::Null.canonical().is_none());
    }
}
