//! Worker pool abstraction.
//!
//! The scheduler only talks to a [`WorkerPool`]: `submit` a shard to get a
//! [`WorkerHandle`], `poll` a handle for liveness, and `request_termination` when
//! the deadline passes. [`ProcessPool`] runs each shard as a local OS process;
//! other backends (containers, remote dispatch) slot in behind the same trait.

pub mod process;

pub use process::ProcessPool;

use crate::errors::SupervisionError;
use crate::plan::Shard;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether the worker ever started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LaunchState {
    Started { pid: Option<u32> },
    NeverStarted { error: String },
}

/// Liveness reported by [`WorkerPool::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Running,
    Exited { exit_code: Option<i32> },
    NeverStarted,
}

/// The orchestrator's record of one worker: its shard, its log and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerHandle {
    pub worker_id: usize,
    pub shard: Shard,
    pub log_file: PathBuf,
    pub launch: LaunchState,
    pub launched_at: DateTime<Utc>,
    /// Set once the worker is seen to exit on its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl WorkerHandle {
    pub fn started(shard: Shard, log_file: PathBuf, pid: Option<u32>) -> Self {
        Self {
            worker_id: shard.worker_id,
            shard,
            log_file,
            launch: LaunchState::Started { pid },
            launched_at: Utc::now(),
            exit_code: None,
        }
    }

    pub fn never_started(shard: Shard, log_file: PathBuf, error: impl Into<String>) -> Self {
        Self {
            worker_id: shard.worker_id,
            shard,
            log_file,
            launch: LaunchState::NeverStarted {
                error: error.into(),
            },
            launched_at: Utc::now(),
            exit_code: None,
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self.launch, LaunchState::Started { .. })
    }

    pub fn pid(&self) -> Option<u32> {
        match self.launch {
            LaunchState::Started { pid } => pid,
            LaunchState::NeverStarted { .. } => None,
        }
    }
}

/// A pool of workers the scheduler can submit shards to.
///
/// `submit` never fails: a worker that cannot start comes back as a
/// never-started handle so one bad shard does not stop its siblings.
#[async_trait]
pub trait WorkerPool: Send {
    /// Start a worker for `shard` without waiting for it to finish.
    async fn submit(&mut self, shard: &Shard) -> WorkerHandle;

    /// Non-blocking liveness check.
    async fn poll(&mut self, handle: &WorkerHandle) -> WorkerStatus;

    /// Ask the worker to stop (SIGTERM for processes). Does not wait.
    async fn request_termination(&mut self, handle: &WorkerHandle)
    -> Result<(), SupervisionError>;

    /// Stop the worker forcefully. Only used when termination escalation is enabled.
    async fn force_kill(&mut self, handle: &WorkerHandle) -> Result<(), SupervisionError>;
}
