//! Tabular drift detector

use ndarray::Array1;
use polars::prelude::*;
use tracing::warn;

use crate::data::{is_numeric_dtype, numeric_values, string_values};
use crate::drift::{
    chi_square_test, ks_test, CorrectionPolicy, DriftReport, FeatureDriftResult, TestOutcome,
};
use crate::error::{DriftwatchError, Result};
use crate::schema::{ColumnRole, ColumnRoles};

/// Per-feature two-sample drift detector for tabular data.
///
/// The new table is reduced to the reference table's columns, in the
/// reference's order, before any test runs; results and downstream artifacts
/// keep that order because consumers key on positional index.
#[derive(Debug, Clone)]
pub struct TabularDriftDetector {
    significance: f64,
    correction: CorrectionPolicy,
}

impl Default for TabularDriftDetector {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl TabularDriftDetector {
    pub fn new(significance: f64) -> Self {
        Self {
            significance,
            correction: CorrectionPolicy::None,
        }
    }

    pub fn with_correction(mut self, correction: CorrectionPolicy) -> Self {
        self.correction = correction;
        self
    }

    /// Run one reference/new comparison.
    ///
    /// A column missing from `new` is fatal. A test that cannot be computed
    /// for a single feature records that feature as undetermined and
    /// processing continues.
    pub fn detect(
        &self,
        reference: &DataFrame,
        new: &DataFrame,
        roles: &ColumnRoles,
    ) -> Result<DriftReport> {
        let feature_names: Vec<String> = reference
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let threshold = self
            .correction
            .effective_threshold(self.significance, feature_names.len());

        let mut features = Vec::with_capacity(feature_names.len());
        let mut n_undetermined = 0;

        for name in &feature_names {
            let ref_series = reference
                .column(name)
                .map_err(|_| DriftwatchError::SchemaMismatch {
                    column: name.clone(),
                    side: "reference".to_string(),
                })?
                .as_materialized_series()
                .clone();
            let new_series = new
                .column(name)
                .map_err(|_| DriftwatchError::SchemaMismatch {
                    column: name.clone(),
                    side: "new".to_string(),
                })?
                .as_materialized_series()
                .clone();

            let role = roles
                .role_of(name)
                .ok_or_else(|| DriftwatchError::SchemaMismatch {
                    column: name.clone(),
                    side: "reference".to_string(),
                })?;

            let outcome = match self.test_feature(name, role, &ref_series, &new_series, threshold) {
                Ok(outcome) => outcome,
                Err(DriftwatchError::StatisticalComputation(reason)) => {
                    n_undetermined += 1;
                    TestOutcome::Undetermined { reason }
                }
                Err(other) => return Err(other),
            };

            features.push(FeatureDriftResult {
                feature: name.clone(),
                role,
                outcome,
            });
        }

        if n_undetermined > 0 {
            warn!(
                n_undetermined,
                "drift check left {} feature(s) undetermined", n_undetermined
            );
        }

        let overall_is_drift = features.iter().any(|f| f.is_drift());

        Ok(DriftReport {
            features,
            overall_is_drift,
            severity: 0,
            significance: self.significance,
            effective_threshold: threshold,
            correction: self.correction,
            n_undetermined,
        })
    }

    fn test_feature(
        &self,
        name: &str,
        role: ColumnRole,
        ref_series: &Series,
        new_series: &Series,
        threshold: f64,
    ) -> Result<TestOutcome> {
        let result = match role {
            ColumnRole::Continuous => {
                // The new side must still be numeric; declared-continuous
                // columns are never coerced from strings.
                if !is_numeric_dtype(new_series.dtype()) {
                    return Err(DriftwatchError::TypeMismatch {
                        column: name.to_string(),
                        expected: "numeric".to_string(),
                        actual: new_series.dtype().to_string(),
                    });
                }
                let ref_values = Array1::from_vec(numeric_values(ref_series, name)?);
                let new_values = Array1::from_vec(numeric_values(new_series, name)?);
                ks_test(&ref_values, &new_values)?
            }
            ColumnRole::Categorical => {
                let ref_values = string_values(ref_series)?;
                let new_values = string_values(new_series)?;
                chi_square_test(&ref_values, &new_values)?
            }
        };

        Ok(TestOutcome::completed(
            result.statistic,
            result.p_value,
            threshold,
        ))
    }
}
