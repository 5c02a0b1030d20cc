//! Command-line interface
//!
//! Parses invocation parameters into typed job configurations and drives the
//! monitoring entry points. Each command starts a tracking run, executes the
//! job, prints a short summary, and finishes the run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{DriftJobConfig, ModelInfo, PerformanceJobConfig};
use crate::drift::{ConstantSeverity, CorrectionPolicy};
use crate::emit::TracingEventSink;
use crate::error::{DriftwatchError, Result};
use crate::jobs::{run_data_drift, run_model_performance};
use crate::tracking::TrackingRun;

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tabular model monitoring: data drift and performance checks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect distribution drift between a reference and a new dataset
    DataDrift {
        /// Name of the monitored model
        #[arg(long)]
        model_name: String,

        /// Version of the monitored model
        #[arg(long, default_value = "0")]
        model_version: String,

        /// Reference (baseline) dataset, CSV
        #[arg(long)]
        reference_data: PathBuf,

        /// Newly observed dataset, CSV
        #[arg(long)]
        new_data: PathBuf,

        /// Per-feature significance threshold
        #[arg(long, default_value_t = 0.05)]
        significance: f64,

        /// Multiple-comparisons correction (none, bonferroni)
        #[arg(long, default_value = "none")]
        correction: String,

        /// Root directory of the local tracking store
        #[arg(long, default_value = "./runs")]
        tracking_dir: PathBuf,
    },

    /// Evaluate model predictions against ground truth
    Performance {
        /// Name of the monitored model
        #[arg(long)]
        model_name: String,

        /// Version of the monitored model
        #[arg(long, default_value = "0")]
        model_version: String,

        /// Dataset with the model's predictions, CSV
        #[arg(long)]
        inference_data: PathBuf,

        /// Dataset with the observed ground truth, CSV
        #[arg(long)]
        groundtruth_data: PathBuf,

        /// Column joining predictions to ground truth
        #[arg(long)]
        key_column: String,

        /// Prediction column in the inference dataset
        #[arg(long, default_value = "pred")]
        prediction_column: String,

        /// Label column in the ground truth dataset
        #[arg(long, default_value = "ground_truth")]
        label_column: String,

        /// Root directory of the local tracking store
        #[arg(long, default_value = "./runs")]
        tracking_dir: PathBuf,
    },
}

pub fn cmd_data_drift(config: DriftJobConfig) -> Result<()> {
    let mut run = TrackingRun::start(
        &config.tracking_dir,
        format!("{}_data_drift", config.model.name),
    )?;
    let run_id = run.run_id().to_string();
    run.set_tag("model_name", config.model.name.clone());
    run.set_tag("model_version", config.model.version.clone());

    let report = run_data_drift(
        &config,
        &ConstantSeverity::default(),
        &mut run,
        &TracingEventSink,
        &run_id,
    )?;
    run.finish()?;

    println!("{}", report.summary());
    Ok(())
}

pub fn cmd_performance(config: PerformanceJobConfig) -> Result<()> {
    let mut run = TrackingRun::start(
        &config.tracking_dir,
        format!("{}_model_performance", config.model.name),
    )?;
    let run_id = run.run_id().to_string();
    run.set_tag("model_name", config.model.name.clone());
    run.set_tag("model_version", config.model.version.clone());

    let report = run_model_performance(&config, &mut run, &TracingEventSink, &run_id)?;
    run.finish()?;

    println!("Performance ({} rows evaluated, {} unmatched)", report.n_evaluated, report.n_unmatched);
    for (name, value) in report.metrics.to_map() {
        println!("  {name}: {value:.4}");
    }
    Ok(())
}

pub fn parse_correction(value: &str) -> Result<CorrectionPolicy> {
    match value.to_lowercase().as_str() {
        "none" => Ok(CorrectionPolicy::None),
        "bonferroni" => Ok(CorrectionPolicy::Bonferroni),
        other => Err(DriftwatchError::Config(format!(
            "unknown correction policy '{other}' (expected none or bonferroni)"
        ))),
    }
}

/// Build the job config for a parsed command and run it.
pub fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::DataDrift {
            model_name,
            model_version,
            reference_data,
            new_data,
            significance,
            correction,
            tracking_dir,
        } => {
            let config = DriftJobConfig::new(
                ModelInfo::new(model_name, model_version),
                reference_data,
                new_data,
            )
            .with_significance(significance)
            .with_correction(parse_correction(&correction)?)
            .with_tracking_dir(tracking_dir);
            cmd_data_drift(config)
        }
        Commands::Performance {
            model_name,
            model_version,
            inference_data,
            groundtruth_data,
            key_column,
            prediction_column,
            label_column,
            tracking_dir,
        } => {
            let config = PerformanceJobConfig::new(
                ModelInfo::new(model_name, model_version),
                inference_data,
                groundtruth_data,
                key_column,
            )
            .with_prediction_column(prediction_column)
            .with_label_column(label_column)
            .with_tracking_dir(tracking_dir);
            cmd_performance(config)
        }
    }
}
