//! Local experiment-tracking client
//!
//! A minimal stand-in for the remote tracking service: each monitoring run
//! gets a directory under the tracking root holding its artifacts and a
//! `run.json` with parameters, metrics, and status. Delivery is best-effort;
//! the monitoring results themselves never depend on it.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::emit::MetricsSink;
use crate::error::{DriftwatchError, Result};

/// Status of a tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One tracked monitoring run
#[derive(Debug, Serialize)]
pub struct TrackingRun {
    run_id: String,
    run_name: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    status: RunStatus,
    tags: BTreeMap<String, String>,
    metrics: BTreeMap<String, f64>,
    artifacts: Vec<String>,
    #[serde(skip)]
    root: PathBuf,
}

impl TrackingRun {
    /// Start a run under `tracking_dir`, creating its directory tree.
    pub fn start(tracking_dir: impl Into<PathBuf>, run_name: impl Into<String>) -> Result<Self> {
        let run_id = Uuid::new_v4().simple().to_string();
        let root = tracking_dir.into().join(&run_id);
        fs::create_dir_all(root.join("artifacts"))
            .map_err(|e| DriftwatchError::Tracking(format!("cannot create run directory: {e}")))?;

        Ok(Self {
            run_id,
            run_name: run_name.into(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            tags: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
            root,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Latest recorded value for a metric
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Mark the run finished and persist `run.json`.
    pub fn finish(mut self) -> Result<()> {
        self.status = RunStatus::Finished;
        self.end_time = Some(Utc::now());
        self.persist()
    }

    /// Mark the run failed and persist what was recorded so far.
    pub fn fail(mut self) -> Result<()> {
        self.status = RunStatus::Failed;
        self.end_time = Some(Utc::now());
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(self.root.join("run.json"), json)
            .map_err(|e| DriftwatchError::Tracking(format!("cannot write run.json: {e}")))?;
        Ok(())
    }
}

impl MetricsSink for TrackingRun {
    fn log_metrics(&mut self, metrics: &BTreeMap<String, f64>) -> Result<()> {
        for (name, value) in metrics {
            self.metrics.insert(name.clone(), *value);
        }
        Ok(())
    }

    fn log_artifact(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join("artifacts").join(name);
        fs::write(&path, bytes).map_err(|e| {
            DriftwatchError::Tracking(format!("cannot write artifact {}: {e}", path.display()))
        })?;
        self.artifacts.push(name.to_string());
        Ok(())
    }
}
