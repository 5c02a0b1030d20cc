//! Data drift detection
//!
//! Compares a reference dataset against newly observed data feature by
//! feature with two-sample hypothesis tests and aggregates the outcomes into
//! a report used for alerting.

mod detector;
pub mod severity;
pub mod two_sample;

pub use detector::TabularDriftDetector;
pub use severity::{ConstantSeverity, DriftFractionSeverity, MinPValueSeverity, SeverityPolicy};
pub use two_sample::{chi_square_test, ks_test, TestStatistic};

use serde::{Deserialize, Serialize};

use crate::schema::ColumnRole;

/// Multiple-comparisons correction applied to the significance threshold.
///
/// The baseline applies none: each feature is tested against the raw
/// threshold, matching the behavior monitoring dashboards were calibrated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionPolicy {
    #[default]
    None,
    /// Divide the threshold by the number of features tested
    Bonferroni,
}

impl CorrectionPolicy {
    /// Threshold a single feature's p-value is compared against
    pub fn effective_threshold(&self, significance: f64, n_features: usize) -> f64 {
        match self {
            CorrectionPolicy::None => significance,
            CorrectionPolicy::Bonferroni => significance / n_features.max(1) as f64,
        }
    }
}

/// Outcome of one feature's hypothesis test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Completed {
        /// Test statistic (KS distance or chi-squared value)
        statistic: f64,
        p_value: f64,
        is_drift: bool,
    },
    /// The test could not be computed for this feature; recorded explicitly
    /// rather than reported as "no drift".
    Undetermined { reason: String },
}

impl TestOutcome {
    /// Build a completed outcome; the drift flag is fixed here so it cannot
    /// disagree with `p_value < threshold`.
    pub fn completed(statistic: f64, p_value: f64, threshold: f64) -> Self {
        TestOutcome::Completed {
            statistic,
            p_value,
            is_drift: p_value < threshold,
        }
    }
}

/// Drift result for a single feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDriftResult {
    pub feature: String,
    pub role: ColumnRole,
    pub outcome: TestOutcome,
}

impl FeatureDriftResult {
    pub fn is_drift(&self) -> bool {
        matches!(self.outcome, TestOutcome::Completed { is_drift: true, .. })
    }

    pub fn p_value(&self) -> Option<f64> {
        match self.outcome {
            TestOutcome::Completed { p_value, .. } => Some(p_value),
            TestOutcome::Undetermined { .. } => None,
        }
    }

    pub fn statistic(&self) -> Option<f64> {
        match self.outcome {
            TestOutcome::Completed { statistic, .. } => Some(statistic),
            TestOutcome::Undetermined { .. } => None,
        }
    }

    pub fn is_undetermined(&self) -> bool {
        matches!(self.outcome, TestOutcome::Undetermined { .. })
    }
}

/// Complete drift report for one reference/new comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReport {
    /// Per-feature results, in reference column order
    pub features: Vec<FeatureDriftResult>,
    /// True iff at least one feature drifted
    pub overall_is_drift: bool,
    /// Alert priority, filled in by a [`SeverityPolicy`]
    pub severity: u8,
    /// Significance level requested by the caller
    pub significance: f64,
    /// Threshold actually applied per feature after correction
    pub effective_threshold: f64,
    pub correction: CorrectionPolicy,
    /// Features whose test could not be computed
    pub n_undetermined: usize,
}

impl DriftReport {
    /// Names of drifting features, in reference column order
    pub fn drifted_features(&self) -> Vec<&str> {
        self.features
            .iter()
            .filter(|f| f.is_drift())
            .map(|f| f.feature.as_str())
            .collect()
    }

    pub fn n_drifted(&self) -> usize {
        self.features.iter().filter(|f| f.is_drift()).count()
    }

    /// Human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str("Drift Report\n");
        s.push_str("============\n");
        s.push_str(&format!("Features tested: {}\n", self.features.len()));
        s.push_str(&format!("Drifted features: {}\n", self.n_drifted()));
        s.push_str(&format!("Undetermined: {}\n", self.n_undetermined));
        s.push_str(&format!("Overall drift: {}\n", self.overall_is_drift));
        s.push_str(&format!("Severity: {}\n", self.severity));

        if self.n_drifted() > 0 {
            s.push_str("\nDrifted:\n");
            for f in self.features.iter().filter(|f| f.is_drift()) {
                if let Some(p) = f.p_value() {
                    s.push_str(&format!("  - {} (p = {:.2e})\n", f.feature, p));
                }
            }
        }

        s
    }
}
