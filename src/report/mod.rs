//! Persistent per-run reports.
//!
//! Every `sitefleet run` writes one JSON report into `.sitefleet/runs/`, named
//! `<started_at>_<run_id prefix>.json` so a plain sort orders them by time.

use crate::archive::ArchiveReport;
use crate::plan::ListAllocation;
use crate::pool::{LaunchState, WorkerHandle};
use crate::supervise::{SupervisionReport, SupervisorState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How a worker ended, as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerOutcome {
    Exited,
    Terminated,
    NeverStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: usize,
    pub list: String,
    pub shard: usize,
    pub sites: usize,
    pub log_file: PathBuf,
    pub outcome: WorkerOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerRecord {
    fn from_handle(handle: &WorkerHandle, outcome: WorkerOutcome) -> Self {
        let error = match &handle.launch {
            LaunchState::NeverStarted { error } => Some(error.clone()),
            LaunchState::Started { .. } => None,
        };
        Self {
            worker_id: handle.worker_id,
            list: handle.shard.list_name.clone(),
            shard: handle.shard.index,
            sites: handle.shard.sites.len(),
            log_file: handle.log_file.clone(),
            outcome,
            pid: handle.pid(),
            exit_code: handle.exit_code,
            error,
        }
    }
}

/// Everything worth knowing about one run after it finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub run_date: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_workers: usize,
    pub lists: Vec<ListAllocation>,
    #[serde(default)]
    pub workers: Vec<WorkerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervision_state: Option<SupervisorState>,
    #[serde(default)]
    pub supervision_secs: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub termination_failures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unconfirmed: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archives: Option<ArchiveReport>,
}

impl RunReport {
    pub fn new(run_date: impl Into<String>, total_workers: usize, lists: Vec<ListAllocation>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_date: run_date.into(),
            started_at: Utc::now(),
            finished_at: None,
            total_workers,
            lists,
            workers: Vec::new(),
            supervision_state: None,
            supervision_secs: 0.0,
            termination_failures: Vec::new(),
            unconfirmed: Vec::new(),
            archives: None,
        }
    }

    /// Copy the worker partition and termination results out of supervision.
    pub fn record_supervision(&mut self, report: &SupervisionReport) {
        let mut workers: Vec<WorkerRecord> = report
            .completed
            .iter()
            .map(|h| WorkerRecord::from_handle(h, WorkerOutcome::Exited))
            .chain(
                report
                    .terminated
                    .iter()
                    .map(|h| WorkerRecord::from_handle(h, WorkerOutcome::Terminated)),
            )
            .chain(
                report
                    .never_started
                    .iter()
                    .map(|h| WorkerRecord::from_handle(h, WorkerOutcome::NeverStarted)),
            )
            .collect();
        workers.sort_by_key(|w| w.worker_id);

        self.workers = workers;
        self.supervision_state = Some(report.state);
        self.supervision_secs = report.elapsed.as_secs_f64();
        self.termination_failures = report
            .termination_failures
            .iter()
            .map(|e| e.to_string())
            .collect();
        self.unconfirmed = report.unconfirmed.clone();
    }

    pub fn record_archives(&mut self, archives: ArchiveReport) {
        self.archives = Some(archives);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn count(&self, outcome: WorkerOutcome) -> usize {
        self.workers.iter().filter(|w| w.outcome == outcome).count()
    }

    /// Short id used in file names and status output.
    pub fn short_id(&self) -> String {
        self.run_id.to_string()[..8].to_string()
    }
}

/// Reads and writes run reports in a directory.
pub struct ReportStore {
    runs_dir: PathBuf,
}

impl ReportStore {
    pub fn new(runs_dir: &Path) -> Self {
        Self {
            runs_dir: runs_dir.to_path_buf(),
        }
    }

    pub fn save(&self, report: &RunReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.runs_dir).context("Failed to create runs directory")?;
        let filename = format!(
            "{}_{}.json",
            report.started_at.format("%Y-%m-%dT%H-%M-%S"),
            report.short_id()
        );
        let path = self.runs_dir.join(filename);

        let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        Ok(path)
    }

    /// Report files, most recent first.
    pub fn list_runs(&self) -> Result<Vec<PathBuf>> {
        if !self.runs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs: Vec<PathBuf> = fs::read_dir(&self.runs_dir)
            .with_context(|| format!("Failed to read {}", self.runs_dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();

        runs.sort();
        runs.reverse();
        Ok(runs)
    }

    pub fn load(&self, path: &Path) -> Result<RunReport> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run report {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run report {}", path.display()))
    }

    pub fn latest(&self) -> Result<Option<RunReport>> {
        match self.list_runs()?.first() {
            Some(path) => self.load(path).map(Some),
            None => Ok(None),
        }
    }
}
