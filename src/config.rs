//! Job configuration
//!
//! Every monitoring entry point receives an explicit configuration object;
//! nothing is read from ambient process state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drift::CorrectionPolicy;
use crate::error::{DriftwatchError, Result};

/// Identity of the model under monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
}

impl ModelInfo {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Configuration for a data drift check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftJobConfig {
    pub model: ModelInfo,
    /// Baseline dataset the new data is compared against
    pub reference_data_path: PathBuf,
    /// Newly observed dataset
    pub new_data_path: PathBuf,
    /// Per-feature significance threshold
    pub significance: f64,
    /// Multiple-comparisons correction applied to the threshold
    pub correction: CorrectionPolicy,
    /// Root directory of the local tracking store
    pub tracking_dir: PathBuf,
}

impl DriftJobConfig {
    pub fn new(
        model: ModelInfo,
        reference_data_path: impl Into<PathBuf>,
        new_data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model,
            reference_data_path: reference_data_path.into(),
            new_data_path: new_data_path.into(),
            significance: 0.05,
            correction: CorrectionPolicy::None,
            tracking_dir: PathBuf::from("./runs"),
        }
    }

    pub fn with_significance(mut self, significance: f64) -> Self {
        self.significance = significance;
        self
    }

    pub fn with_correction(mut self, correction: CorrectionPolicy) -> Self {
        self.correction = correction;
        self
    }

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(DriftwatchError::Config(format!(
                "significance must be in (0, 1), got {}",
                self.significance
            )));
        }
        Ok(())
    }
}

/// Configuration for a model performance check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceJobConfig {
    pub model: ModelInfo,
    /// Dataset holding the model's predictions
    pub inference_data_path: PathBuf,
    /// Dataset holding the observed ground truth
    pub groundtruth_data_path: PathBuf,
    /// Column joining predictions to ground truth
    pub key_column: String,
    /// Prediction column in the inference dataset
    pub prediction_column: String,
    /// Label column in the ground truth dataset
    pub label_column: String,
    /// Root directory of the local tracking store
    pub tracking_dir: PathBuf,
}

impl PerformanceJobConfig {
    pub fn new(
        model: ModelInfo,
        inference_data_path: impl Into<PathBuf>,
        groundtruth_data_path: impl Into<PathBuf>,
        key_column: impl Into<String>,
    ) -> Self {
        Self {
            model,
            inference_data_path: inference_data_path.into(),
            groundtruth_data_path: groundtruth_data_path.into(),
            key_column: key_column.into(),
            prediction_column: "pred".to_string(),
            label_column: "ground_truth".to_string(),
            tracking_dir: PathBuf::from("./runs"),
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

    pub fn with_tracking_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tracking_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_column.is_empty() {
            return Err(DriftwatchError::Config(
                "key_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_config_defaults() {
        let cfg = DriftJobConfig::new(ModelInfo::new("m", "1"), "ref.csv", "new.csv");
        assert_eq!(cfg.significance, 0.05);
        assert!(matches!(cfg.correction, CorrectionPolicy::None));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_drift_config_rejects_bad_significance() {
        let cfg = DriftJobConfig::new(ModelInfo::new("m", "1"), "ref.csv", "new.csv")
            .with_significance(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_performance_config_defaults() {
        let cfg = PerformanceJobConfig::new(ModelInfo::new("m", "1"), "inf.csv", "gt.csv", "id");
        assert_eq!(cfg.prediction_column, "pred");
        assert_eq!(cfg.label_column, "ground_truth");
        assert!(cfg.validate().is_ok());
    }
}
