//! In-crate ML building blocks.
//!
//! Estimators, preprocessing, metrics, and the two-sample statistics used by
//! drift detection. Everything here is plain numerics over `ndarray`; the
//! pipeline stages own the file layout and orchestration.

pub mod boosted;
pub mod bundle;
pub mod forest;
pub mod grid;
pub mod logistic;
pub mod metrics;
pub mod preprocess;
pub mod stats;
pub mod tree;

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;

pub use bundle::SavedModel;
pub use grid::{default_candidates, grid_search, Candidate, HyperParams, TrainedClassifier};
pub use metrics::classification_score;
pub use preprocess::Preprocessor;
pub use stats::ks_2samp;

/// Persist a 2-D array as JSON, creating parent directories.
pub fn save_array(path: &Path, array: &Array2<f64>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string(array).context("serializing array")?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Load a 2-D array persisted by [`save_array`].
pub fn load_array(path: &Path) -> Result<Array2<f64>> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing array from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_array_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("arr.json");

        let arr = array![[1.0, 2.0], [3.0, 4.0]];
        save_array(&path, &arr).unwrap();

        let loaded = load_array(&path).unwrap();
        assert_eq!(loaded, arr);
    }

    #[test]
    fn test_save_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");

        let arr = array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]];
        save_array(&a, &arr).unwrap();
        save_array(&b, &arr).unwrap();

        assert_eq!(
            std::fs::read(&a).unwrap(),
            std::fs::read(&b).unwrap()
        );
    }
}
