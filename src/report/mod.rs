//! Per-feature reporting
//!
//! For every feature of a comparison the reporter produces a small metric
//! summary (most frequent category or column mean, on both sides) and a chart
//! artifact. A p-value heatmap covering all features is produced once per
//! comparison.

pub mod charts;

pub use charts::{density_chart, frequency_chart, p_value_heatmap, ChartArtifact};

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{numeric_values, string_values};
use crate::drift::FeatureDriftResult;
use crate::emit::Properties;
use crate::error::{DriftwatchError, Result};
use crate::schema::ColumnRole;

/// Side-by-side summary metrics for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureSummary {
    Categorical {
        most_common_ref: String,
        most_common_freq_ref: f64,
        most_common_new: String,
        most_common_freq_new: f64,
    },
    Continuous {
        mean_ref: f64,
        mean_new: f64,
    },
}

impl FeatureSummary {
    /// Most frequent category and its relative frequency on each side
    pub fn categorical(reference: &DataFrame, new: &DataFrame, column: &str) -> Result<Self> {
        let (most_common_ref, most_common_freq_ref) =
            most_common(&column_series(reference, column, "reference")?)?;
        let (most_common_new, most_common_freq_new) =
            most_common(&column_series(new, column, "new")?)?;
        Ok(FeatureSummary::Categorical {
            most_common_ref,
            most_common_freq_ref,
            most_common_new,
            most_common_freq_new,
        })
    }

    /// Column mean on each side
    pub fn continuous(reference: &DataFrame, new: &DataFrame, column: &str) -> Result<Self> {
        Ok(FeatureSummary::Continuous {
            mean_ref: mean(&column_series(reference, column, "reference")?, column)?,
            mean_new: mean(&column_series(new, column, "new")?, column)?,
        })
    }

    /// Flatten into an emitter properties map
    pub fn extend_properties(&self, props: &mut Properties) {
        match self {
            FeatureSummary::Categorical {
                most_common_ref,
                most_common_freq_ref,
                most_common_new,
                most_common_freq_new,
            } => {
                props.insert("most_common_category_ref".into(), most_common_ref.clone());
                props.insert(
                    "most_common_category_freq_ref".into(),
                    format!("{most_common_freq_ref}"),
                );
                props.insert("most_common_category_new".into(), most_common_new.clone());
                props.insert(
                    "most_common_category_freq_new".into(),
                    format!("{most_common_freq_new}"),
                );
            }
            FeatureSummary::Continuous { mean_ref, mean_new } => {
                props.insert("mean_ref".into(), format!("{mean_ref}"));
                props.insert("mean_new".into(), format!("{mean_new}"));
            }
        }
    }
}

/// Summarize one feature: metric summary plus its chart artifact.
pub fn summarize(
    reference: &DataFrame,
    new: &DataFrame,
    feature: &str,
    role: ColumnRole,
    result: &FeatureDriftResult,
) -> Result<(FeatureSummary, ChartArtifact)> {
    match role {
        ColumnRole::Categorical => {
            let summary = FeatureSummary::categorical(reference, new, feature)?;
            let ref_freqs = category_frequencies(&column_series(reference, feature, "reference")?)?;
            let new_freqs = category_frequencies(&column_series(new, feature, "new")?)?;
            let chart = frequency_chart(feature, &ref_freqs, &new_freqs, result.is_drift());
            Ok((summary, chart))
        }
        ColumnRole::Continuous => {
            let summary = FeatureSummary::continuous(reference, new, feature)?;
            let ref_values = numeric_values(&column_series(reference, feature, "reference")?, feature)?;
            let new_values = numeric_values(&column_series(new, feature, "new")?, feature)?;
            let chart = density_chart(feature, &ref_values, &new_values, result.is_drift());
            Ok((summary, chart))
        }
    }
}

/// Relative category frequencies, most frequent first (ties broken by name).
pub fn category_frequencies(series: &Series) -> Result<Vec<(String, f64)>> {
    let values = string_values(series)?;
    if values.is_empty() {
        return Err(DriftwatchError::Data(format!(
            "column '{}' has no values to summarize",
            series.name()
        )));
    }
    let total = values.len() as f64;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut frequencies: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(category, count)| (category, count as f64 / total))
        .collect();
    frequencies.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    Ok(frequencies)
}

fn most_common(series: &Series) -> Result<(String, f64)> {
    category_frequencies(series)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            DriftwatchError::Data(format!(
                "column '{}' has no values to summarize",
                series.name()
            ))
        })
}

fn mean(series: &Series, column: &str) -> Result<f64> {
    let values = numeric_values(series, column)?;
    if values.is_empty() {
        return Err(DriftwatchError::Data(format!(
            "column '{column}' has no values to summarize"
        )));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

fn column_series(df: &DataFrame, column: &str, side: &str) -> Result<Series> {
    Ok(df
        .column(column)
        .map_err(|_| DriftwatchError::SchemaMismatch {
            column: column.to_string(),
            side: side.to_string(),
        })?
        .as_materialized_series()
        .clone())
}
