//! Integration tests for the model performance job.

use std::io::Write;

use driftwatch::prelude::*;
use tempfile::NamedTempFile;

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn performance_config(
    inference: &NamedTempFile,
    ground_truth: &NamedTempFile,
) -> PerformanceJobConfig {
    PerformanceJobConfig::new(
        ModelInfo::new("diabetes", "3"),
        inference.path(),
        ground_truth.path(),
        "patient_id",
    )
}

#[test]
fn test_patient_join_scenario() {
    let inference = write_csv(&["patient_id,pred", "1,1", "2,0", "3,1"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "1,1", "2,0", "3,0"]);

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let report = run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut metrics,
        &events,
        "test-run",
    )
    .unwrap();

    assert_eq!(report.n_evaluated, 3);
    assert!((report.metrics.accuracy - 2.0 / 3.0).abs() < 1e-12);
    // One true positive (id 1) and one false positive (id 3).
    assert!((report.metrics.precision - 0.5).abs() < 1e-12);
    assert!((report.metrics.recall - 1.0).abs() < 1e-12);

    assert!((metrics.metrics["accuracy"] - 2.0 / 3.0).abs() < 1e-12);
    let emitted = events.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, "diabetes_model_performance");
    assert_eq!(emitted[0].1.get("run_id").unwrap(), "test-run");
    assert!(emitted[0].1.contains_key("accuracy"));
    assert!(emitted[0].1.contains_key("roc_auc"));
}

#[test]
fn test_perfect_predictions_end_to_end() {
    let inference = write_csv(&["patient_id,pred", "1,1", "2,0", "3,1", "4,0"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "1,1", "2,0", "3,1", "4,0"]);

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let report = run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut metrics,
        &events,
        "test-run",
    )
    .unwrap();

    assert_eq!(report.metrics.accuracy, 1.0);
    assert_eq!(report.metrics.precision, 1.0);
    assert_eq!(report.metrics.recall, 1.0);
    assert_eq!(report.metrics.f1_score, 1.0);
}

#[test]
fn test_opposite_predictions_end_to_end() {
    let inference = write_csv(&["patient_id,pred", "1,0", "2,1", "3,0", "4,1"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "1,1", "2,0", "3,1", "4,0"]);

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let report = run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut metrics,
        &events,
        "test-run",
    )
    .unwrap();

    assert_eq!(report.metrics.accuracy, 0.0);
}

#[test]
fn test_outer_join_retains_unmatched_rows() {
    let inference = write_csv(&["patient_id,pred", "1,1", "2,0", "3,1"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "2,0", "3,1", "4,1"]);

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let report = run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut metrics,
        &events,
        "test-run",
    )
    .unwrap();

    // Patients 1 and 4 survive the outer join with a null counterpart and
    // are excluded from the metrics, not imputed.
    assert_eq!(report.n_rows, 4);
    assert_eq!(report.n_evaluated, 2);
    assert_eq!(report.n_unmatched, 2);
    assert_eq!(report.metrics.accuracy, 1.0);
}

#[test]
fn test_missing_key_column_fails() {
    let inference = write_csv(&["id,pred", "1,1"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "1,1"]);

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let err = run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut metrics,
        &events,
        "test-run",
    )
    .unwrap_err();

    assert!(matches!(err, DriftwatchError::SchemaMismatch { .. }));
}

#[test]
fn test_performance_job_writes_tracking_run() {
    let inference = write_csv(&["patient_id,pred", "1,1", "2,0"]);
    let ground_truth = write_csv(&["patient_id,ground_truth", "1,1", "2,0"]);
    let tracking = tempfile::tempdir().unwrap();

    let mut run = TrackingRun::start(tracking.path(), "diabetes_model_performance").unwrap();
    let run_id = run.run_id().to_string();
    run_model_performance(
        &performance_config(&inference, &ground_truth),
        &mut run,
        &TracingEventSink,
        &run_id,
    )
    .unwrap();
    assert_eq!(run.metric("accuracy"), Some(1.0));
    run.finish().unwrap();

    assert!(tracking.path().join(&run_id).join("run.json").exists());
}

#[test]
fn test_custom_prediction_and_label_columns() {
    let inference = write_csv(&["patient_id,score", "1,1", "2,0"]);
    let ground_truth = write_csv(&["patient_id,label", "1,1", "2,1"]);

    let config = performance_config(&inference, &ground_truth)
        .with_prediction_column("score")
        .with_label_column("label");

    let mut metrics = InMemorySink::new();
    let events = InMemorySink::new();
    let report =
        run_model_performance(&config, &mut metrics, &events, "test-run").unwrap();

    assert!((report.metrics.accuracy - 0.5).abs() < 1e-12);
    assert!((report.metrics.recall - 0.5).abs() < 1e-12);
}
