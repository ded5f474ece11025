//! Classification metrics.
//!
//! Precision, recall, and F1 are macro-averaged: computed per class and
//! averaged unweighted, so minority classes count as much as the majority.
//! Degenerate denominators score zero rather than erroring.

use std::collections::BTreeSet;

use crate::domain::ClassificationMetric;

/// Score predictions against true labels.
///
/// Labels are compared by value; classes are the union of labels seen in
/// either slice. Panics are avoided by treating empty input as all-zero
/// scores.
pub fn classification_score(y_true: &[f64], y_pred: &[f64]) -> ClassificationMetric {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return ClassificationMetric {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        };
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    let accuracy = correct as f64 / y_true.len() as f64;

    // Classes keyed by bit pattern so f64 can live in an ordered set.
    let classes: BTreeSet<u64> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|v| v.to_bits())
        .collect();

    let mut precision_sum = 0.0;
    let mut recall_sum = 0.0;
    let mut f1_sum = 0.0;

    for class_bits in &classes {
        let class = f64::from_bits(*class_bits);

        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut fn_ = 0usize;
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let is_true = *t == class;
            let is_pred = *p == class;
            match (is_true, is_pred) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }

        let precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };
        let recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        precision_sum += precision;
        recall_sum += recall;
        f1_sum += f1;
    }

    let n_classes = classes.len() as f64;
    ClassificationMetric {
        accuracy,
        precision: precision_sum / n_classes,
        recall: recall_sum / n_classes,
        f1: f1_sum / n_classes,
    }
}
