//! Severity scoring for drift reports
//!
//! Maps a drift report to a small integer used to route alerts. The baseline
//! policy always returns zero, which keeps alerting quiet until a deployment
//! opts into one of the graded policies.

use crate::drift::DriftReport;

/// Maps a drift report to an alert priority.
///
/// Implementations must be pure and total: any report yields a score.
pub trait SeverityPolicy {
    fn score(&self, report: &DriftReport) -> u8;
}

/// Baseline policy: a fixed severity regardless of the report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantSeverity(pub u8);

impl SeverityPolicy for ConstantSeverity {
    fn score(&self, _report: &DriftReport) -> u8 {
        self.0
    }
}

/// Severity proportional to the fraction of drifting features:
/// 0 when nothing drifts, then 1..=3 as the fraction grows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriftFractionSeverity;

impl SeverityPolicy for DriftFractionSeverity {
    fn score(&self, report: &DriftReport) -> u8 {
        if report.features.is_empty() {
            return 0;
        }
        let fraction = report.n_drifted() as f64 / report.features.len() as f64;
        if fraction == 0.0 {
            0
        } else if fraction < 0.25 {
            1
        } else if fraction < 0.5 {
            2
        } else {
            3
        }
    }
}

/// Severity driven by the smallest completed p-value: the further below the
/// effective threshold, the higher the priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinPValueSeverity;

impl SeverityPolicy for MinPValueSeverity {
    fn score(&self, report: &DriftReport) -> u8 {
        let min_p = report
            .features
            .iter()
            .filter_map(|f| f.p_value())
            .fold(f64::INFINITY, f64::min);

        if !min_p.is_finite() || min_p >= report.effective_threshold {
            0
        } else if min_p < report.effective_threshold / 100.0 {
            3
        } else if min_p < report.effective_threshold / 10.0 {
            2
        } else {
            1
        }
    }
}
