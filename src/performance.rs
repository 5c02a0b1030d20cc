//! Model performance evaluation
//!
//! Joins predictions with ground truth on a key column and computes binary
//! classification metrics on the matched pairs.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::numeric_values_nullable;
use crate::error::{DriftwatchError, Result};

/// Binary classification metrics, all in [0, 1].
///
/// `roc_auc` is NaN when the ground truth contains a single class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub accuracy: f64,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub roc_auc: f64,
}

impl PerformanceMetrics {
    /// Compute metrics from aligned label/prediction pairs.
    ///
    /// The positive class is 1; values are thresholded at 0.5 for the
    /// confusion counts while `roc_auc` ranks the raw prediction scores.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n = y_true.len().max(1) as f64;

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (**t - **p).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / n;

        let (tp, fp, _tn, fn_) = confusion_counts(y_true, y_pred);
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
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            f1_score,
            precision,
            recall,
            roc_auc: roc_auc(y_true, y_pred),
        }
    }

    /// Open metric-name map for the emitter boundary
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("accuracy".to_string(), self.accuracy);
        map.insert("f1_score".to_string(), self.f1_score);
        map.insert("precision".to_string(), self.precision);
        map.insert("recall".to_string(), self.recall);
        map.insert("roc_auc".to_string(), self.roc_auc);
        map
    }
}

/// Result of one performance check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    /// Rows in the joined table
    pub n_rows: usize,
    /// Rows with both a prediction and a label
    pub n_evaluated: usize,
    /// Rows missing one side after the outer join; excluded from metrics
    pub n_unmatched: usize,
}

/// Joins an inference table with a ground-truth table and evaluates the
/// model's predictions.
#[derive(Debug, Clone)]
pub struct PerformanceEvaluator {
    key_column: String,
    prediction_column: String,
    label_column: String,
}

impl PerformanceEvaluator {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
            prediction_column: "pred".to_string(),
            label_column: "ground_truth".to_string(),
        }
    }

    pub fn with_prediction_column(mut self, column: impl Into<String>) -> Self {
        self.prediction_column = column.into();
        self
    }

    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    /// Outer-join `inference` with `ground_truth` on the key column and
    /// compute metrics over the complete pairs.
    ///
    /// Rows unmatched on either side are retained by the join with nulls; no
    /// imputation happens here. Pairs with a null are excluded from the
    /// metrics and reported through `n_unmatched`.
    pub fn evaluate(
        &self,
        inference: &DataFrame,
        ground_truth: &DataFrame,
    ) -> Result<PerformanceReport> {
        self.require_column(inference, &self.key_column, "inference")?;
        self.require_column(inference, &self.prediction_column, "inference")?;
        self.require_column(ground_truth, &self.key_column, "ground truth")?;
        self.require_column(ground_truth, &self.label_column, "ground truth")?;

        let joined = inference
            .clone()
            .lazy()
            .join(
                ground_truth.clone().lazy(),
                [col(self.key_column.as_str())],
                [col(self.key_column.as_str())],
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            )
            .collect()?;

        let predictions = numeric_values_nullable(
            joined
                .column(&self.prediction_column)
                .map_err(|_| DriftwatchError::SchemaMismatch {
                    column: self.prediction_column.clone(),
                    side: "joined".to_string(),
                })?
                .as_materialized_series(),
            &self.prediction_column,
        )?;
        let labels = numeric_values_nullable(
            joined
                .column(&self.label_column)
                .map_err(|_| DriftwatchError::SchemaMismatch {
                    column: self.label_column.clone(),
                    side: "joined".to_string(),
                })?
                .as_materialized_series(),
            &self.label_column,
        )?;

        let mut y_true = Vec::with_capacity(labels.len());
        let mut y_pred = Vec::with_capacity(predictions.len());
        let mut n_unmatched = 0;
        for (label, prediction) in labels.iter().zip(predictions.iter()) {
            match (label, prediction) {
                (Some(t), Some(p)) => {
                    y_true.push(*t);
                    y_pred.push(*p);
                }
                _ => n_unmatched += 1,
            }
        }

        if y_true.is_empty() {
            return Err(DriftwatchError::StatisticalComputation(
                "no rows with both a prediction and a ground-truth label".to_string(),
            ));
        }
        if n_unmatched > 0 {
            warn!(
                n_unmatched,
                "outer join left {} row(s) without a counterpart; excluded from metrics",
                n_unmatched
            );
        }

        Ok(PerformanceReport {
            metrics: PerformanceMetrics::compute(&y_true, &y_pred),
            n_rows: joined.height(),
            n_evaluated: y_true.len(),
            n_unmatched,
        })
    }

    fn require_column(&self, df: &DataFrame, column: &str, side: &str) -> Result<()> {
        if df.column(column).is_err() {
            return Err(DriftwatchError::SchemaMismatch {
                column: column.to_string(),
                side: side.to_string(),
            });
        }
        Ok(())
    }
}

fn confusion_counts(y_true: &[f64], y_pred: &[f64]) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let t_pos = *t > 0.5;
        let p_pos = *p > 0.5;
        match (t_pos, p_pos) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// ROC-AUC by the rank statistic: the probability a random positive outranks
/// a random negative, with tied scores sharing their average rank.
fn roc_auc(y_true: &[f64], score: &[f64]) -> f64 {
    let n_pos = y_true.iter().filter(|t| **t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..score.len()).collect();
    order.sort_by(|&a, &b| {
        score[a]
            .partial_cmp(&score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Average ranks over ties.
    let mut ranks = vec![0.0; score.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && score[order[j + 1]] == score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(t, _)| **t > 0.5)
        .map(|(_, r)| r)
        .sum();

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos * n_neg) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![1.0, 0.0, 1.0, 0.0, 1.0];
        let metrics = PerformanceMetrics::compute(&y, &y);

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1_score, 1.0);
        assert_eq!(metrics.roc_auc, 1.0);
    }

    #[test]
    fn test_inverted_predictions() {
        let y_true = vec![1.0, 0.0, 1.0, 0.0];
        let y_pred = vec![0.0, 1.0, 0.0, 1.0];
        let metrics = PerformanceMetrics::compute(&y_true, &y_pred);

        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.roc_auc, 0.0);
    }

    #[test]
    fn test_roc_auc_single_class_is_nan() {
        let y_true = vec![1.0, 1.0, 1.0];
        let y_pred = vec![1.0, 0.0, 1.0];
        let metrics = PerformanceMetrics::compute(&y_true, &y_pred);

        assert!(metrics.roc_auc.is_nan());
        assert!(metrics.accuracy > 0.0);
    }

    #[test]
    fn test_metric_map_keys() {
        let metrics = PerformanceMetrics::compute(&[1.0, 0.0], &[1.0, 0.0]);
        let map = metrics.to_map();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();

        assert_eq!(
            keys,
            vec!["accuracy", "f1_score", "precision", "recall", "roc_auc"]
        );
    }

    #[test]
    fn test_evaluate_joined_tables() {
        let inference = df!(
            "patient_id" => &[1i64, 2, 3],
            "pred" => &[1.0, 0.0, 1.0]
        )
        .unwrap();
        let ground_truth = df!(
            "patient_id" => &[1i64, 2, 3],
            "ground_truth" => &[1.0, 0.0, 0.0]
        )
        .unwrap();

        let report = PerformanceEvaluator::new("patient_id")
            .evaluate(&inference, &ground_truth)
            .unwrap();

        assert_eq!(report.n_evaluated, 3);
        assert_eq!(report.n_unmatched, 0);
        assert!((report.metrics.accuracy - 2.0 / 3.0).abs() < 1e-12);
        // Ground truth is y_true: one true positive, one false positive.
        assert!((report.metrics.precision - 0.5).abs() < 1e-12);
        assert!((report.metrics.recall - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_outer_join_keeps_unmatched_rows() {
        let inference = df!(
            "id" => &[1i64, 2, 3],
            "pred" => &[1.0, 0.0, 1.0]
        )
        .unwrap();
        let ground_truth = df!(
            "id" => &[2i64, 3, 4],
            "ground_truth" => &[0.0, 1.0, 1.0]
        )
        .unwrap();

        let report = PerformanceEvaluator::new("id")
            .evaluate(&inference, &ground_truth)
            .unwrap();

        // ids 1 and 4 have no counterpart; both rows survive the join.
        assert_eq!(report.n_rows, 4);
        assert_eq!(report.n_evaluated, 2);
        assert_eq!(report.n_unmatched, 2);
    }

    #[test]
    fn test_missing_key_column_is_schema_mismatch() {
        let inference = df!("id" => &[1i64], "pred" => &[1.0]).unwrap();
        let ground_truth = df!("other" => &[1i64], "ground_truth" => &[1.0]).unwrap();

        let err = PerformanceEvaluator::new("id")
            .evaluate(&inference, &ground_truth)
            .unwrap_err();

        match err {
            DriftwatchError::SchemaMismatch { column, side } => {
                assert_eq!(column, "id");
                assert_eq!(side, "ground truth");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_no_overlap_is_an_error() {
        let inference = df!("id" => &[1i64], "pred" => &[1.0]).unwrap();
        let ground_truth = df!("id" => &[9i64], "ground_truth" => &[1.0]).unwrap();

        let err = PerformanceEvaluator::new("id")
            .evaluate(&inference, &ground_truth)
            .unwrap_err();
        assert!(matches!(err, DriftwatchError::StatisticalComputation(_)));
    }
}
