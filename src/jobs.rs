//! Monitoring job entry points
//!
//! One function per monitoring job, wiring loader, classifier, detector,
//! reporter, and emitter together. Each invocation owns its tables and
//! report; nothing is shared between runs. Per-feature metrics, events, and
//! artifacts are emitted in the reference table's column order, which
//! downstream consumers rely on.

use tracing::{info, warn};

use crate::config::{DriftJobConfig, PerformanceJobConfig};
use crate::data::DatasetLoader;
use crate::drift::{DriftReport, SeverityPolicy, TabularDriftDetector};
use crate::emit::{EventSink, MetricsSink, Properties};
use crate::error::Result;
use crate::performance::{PerformanceEvaluator, PerformanceReport};
use crate::report::{p_value_heatmap, summarize};
use crate::schema::ColumnRoles;

/// Run a data drift check: reference vs newly observed data.
pub fn run_data_drift(
    config: &DriftJobConfig,
    severity_policy: &dyn SeverityPolicy,
    metrics: &mut dyn MetricsSink,
    events: &dyn EventSink,
    run_id: &str,
) -> Result<DriftReport> {
    config.validate()?;

    let loader = DatasetLoader::new();
    let reference = loader.load_csv(&config.reference_data_path)?;
    let new = loader.load_csv(&config.new_data_path)?;

    let roles = ColumnRoles::classify(&reference);
    let detector =
        TabularDriftDetector::new(config.significance).with_correction(config.correction);
    let mut report = detector.detect(&reference, &new, &roles)?;
    report.severity = severity_policy.score(&report);

    info!(
        model = %config.model.name,
        overall_is_drift = report.overall_is_drift,
        severity = report.severity,
        "data drift check complete"
    );

    // Comparison-level event and p-value summary artifact.
    let mut props = Properties::new();
    props.insert("is_drift".into(), bool_flag(report.overall_is_drift));
    props.insert("severity".into(), report.severity.to_string());
    props.insert("run_id".into(), run_id.to_string());
    events.log_event(&format!("{}_data_drift_total", config.model.name), &props);

    let heatmap_entries: Vec<(String, Option<f64>)> = report
        .features
        .iter()
        .map(|f| (f.feature.clone(), f.p_value()))
        .collect();
    let heatmap = p_value_heatmap(&heatmap_entries, report.effective_threshold);
    metrics.log_artifact(&heatmap.name, &heatmap.bytes)?;

    // Per-feature metrics, chart, and event, in reference column order.
    for result in &report.features {
        let mut props = Properties::new();
        props.insert("model_name".into(), config.model.name.clone());
        props.insert("model_version".into(), config.model.version.clone());
        props.insert("feature_name".into(), result.feature.clone());
        props.insert("is_drift".into(), bool_flag(result.is_drift()));
        props.insert("run_id".into(), run_id.to_string());

        match (result.statistic(), result.p_value()) {
            (Some(statistic), Some(p_value)) => {
                props.insert("distances".into(), statistic.to_string());
                props.insert("p_values".into(), p_value.to_string());

                let mut feature_metrics = std::collections::BTreeMap::new();
                feature_metrics.insert(
                    format!("{}_drift", result.feature),
                    if result.is_drift() { 1.0 } else { 0.0 },
                );
                feature_metrics.insert(format!("{}_distance", result.feature), statistic);
                feature_metrics.insert(format!("{}_p_value", result.feature), p_value);
                metrics.log_metrics(&feature_metrics)?;
            }
            _ => {
                props.insert("status".into(), "undetermined".into());
            }
        }

        match summarize(&reference, &new, &result.feature, result.role, result) {
            Ok((summary, chart)) => {
                summary.extend_properties(&mut props);
                metrics.log_artifact(&chart.name, &chart.bytes)?;
            }
            // A feature whose test was undetermined may not be summarizable
            // either (e.g. an empty column); the run still covers the rest.
            Err(e) if result.is_undetermined() => {
                warn!(feature = %result.feature, error = %e, "skipping summary for undetermined feature");
            }
            Err(e) => return Err(e),
        }

        events.log_event(&format!("{}_data_drift_features", config.model.name), &props);
    }

    Ok(report)
}

/// Run a model performance check: predictions vs ground truth.
pub fn run_model_performance(
    config: &PerformanceJobConfig,
    metrics: &mut dyn MetricsSink,
    events: &dyn EventSink,
    run_id: &str,
) -> Result<PerformanceReport> {
    config.validate()?;

    let loader = DatasetLoader::new();
    let inference = loader.load_csv(&config.inference_data_path)?;
    let ground_truth = loader.load_csv(&config.groundtruth_data_path)?;

    let evaluator = PerformanceEvaluator::new(config.key_column.clone())
        .with_prediction_column(config.prediction_column.clone())
        .with_label_column(config.label_column.clone());
    let report = evaluator.evaluate(&inference, &ground_truth)?;

    info!(
        model = %config.model.name,
        accuracy = report.metrics.accuracy,
        n_evaluated = report.n_evaluated,
        "model performance check complete"
    );

    let metric_map = report.metrics.to_map();
    metrics.log_metrics(&metric_map)?;

    let mut props = Properties::new();
    for (name, value) in &metric_map {
        props.insert(name.clone(), value.to_string());
    }
    props.insert("model_name".into(), config.model.name.clone());
    props.insert("model_version".into(), config.model.version.clone());
    props.insert("run_id".into(), run_id.to_string());
    events.log_event(&format!("{}_model_performance", config.model.name), &props);

    Ok(report)
}

fn bool_flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}
