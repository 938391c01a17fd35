//! Local OS-process backend for [`WorkerPool`].

use super::{WorkerHandle, WorkerPool, WorkerStatus};
use crate::config::Config;
use crate::errors::{LaunchError, SupervisionError};
use crate::launch::WorkerCommand;
use crate::plan::{Shard, shard_data_dir};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Runs each shard as an independent child process.
///
/// Combined stdout/stderr of every worker goes to its own log file. The file
/// descriptors are handed to the child at spawn time and the pool keeps no copy,
/// so a log is closed as soon as its worker exits, however it exits.
pub struct ProcessPool {
    command: WorkerCommand,
    work_dir: PathBuf,
    data_dir: PathBuf,
    run_date: String,
    children: HashMap<usize, Child>,
    /// Exit codes of reaped workers, so repeated polls stay consistent
    exited: HashMap<usize, Option<i32>>,
}

impl ProcessPool {
    pub fn new(
        command: WorkerCommand,
        work_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        run_date: impl Into<String>,
    ) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
            data_dir: data_dir.into(),
            run_date: run_date.into(),
            children: HashMap::new(),
            exited: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.worker.clone(),
            &config.work_dir,
            &config.data_dir,
            config.date_string(),
        )
    }

    /// Number of workers the pool has not yet seen exit.
    pub fn live_count(&self) -> usize {
        self.children.len()
    }

    fn spawn(&self, shard: &Shard, log_path: &Path) -> Result<Child, LaunchError> {
        let argv = self.command.argv(shard)?;
        let (program, args) = argv.split_first().ok_or(LaunchError::EmptyCommand)?;

        let log_open_err = |source: std::io::Error| LaunchError::LogOpen {
            path: log_path.to_path_buf(),
            source,
        };
        let stdout_log = File::create(log_path).map_err(log_open_err)?;
        let stderr_log = stdout_log.try_clone().map_err(log_open_err)?;

        let shard_dir = shard_data_dir(&self.data_dir, &self.run_date, &shard.list_name, shard.index);

        Command::new(program)
            .args(args)
            .current_dir(&self.work_dir)
            .env("SITEFLEET_RUN_DATE", &self.run_date)
            .env("SITEFLEET_DATA_DIR", &self.data_dir)
            .env("SITEFLEET_SHARD_DATA_DIR", shard_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                worker_id: shard.worker_id,
                program: program.clone(),
                source,
            })
    }
}

#[async_trait]
impl WorkerPool for ProcessPool {
    async fn submit(&mut self, shard: &Shard) -> WorkerHandle {
        let log_file = shard.log_file();
        match self.spawn(shard, &log_file) {
            Ok(child) => {
                let pid = child.id();
                tracing::info!(
                    worker_id = shard.worker_id,
                    list = %shard.list_name,
                    shard = shard.index,
                    pid = ?pid,
                    log = %log_file.display(),
                    "Started worker"
                );
                self.children.insert(shard.worker_id, child);
                WorkerHandle::started(shard.clone(), log_file, pid)
            }
            Err(e) => {
                tracing::error!(
                    worker_id = shard.worker_id,
                    list = %shard.list_name,
                    shard = shard.index,
                    error = %e,
                    "Worker failed to start"
                );
                WorkerHandle::never_started(shard.clone(), log_file, e.to_string())
            }
        }
    }

    async fn poll(&mut self, handle: &WorkerHandle) -> WorkerStatus {
        if let Some(exit_code) = self.exited.get(&handle.worker_id) {
            return WorkerStatus::Exited {
                exit_code: *exit_code,
            };
        }
        let Some(child) = self.children.get_mut(&handle.worker_id) else {
            return WorkerStatus::NeverStarted;
        };

        let exit_code = match child.try_wait() {
            Ok(None) => return WorkerStatus::Running,
            Ok(Some(status)) => status.code(),
            Err(e) => {
                tracing::warn!(
                    worker_id = handle.worker_id,
                    error = %e,
                    "Failed to query worker status; treating as exited"
                );
                None
            }
        };
        self.children.remove(&handle.worker_id);
        self.exited.insert(handle.worker_id, exit_code);
        WorkerStatus::Exited { exit_code }
    }

    async fn request_termination(
        &mut self,
        handle: &WorkerHandle,
    ) -> Result<(), SupervisionError> {
        let Some(child) = self.children.get_mut(&handle.worker_id) else {
            return Ok(());
        };
        // Already reaped by tokio: nothing left to signal.
        let Some(pid) = child.id() else {
            return Ok(());
        };
        send_sigterm(handle.worker_id, pid, child)
    }

    async fn force_kill(&mut self, handle: &WorkerHandle) -> Result<(), SupervisionError> {
        let Some(child) = self.children.get_mut(&handle.worker_id) else {
            return Ok(());
        };
        child
            .start_kill()
            .map_err(|e| SupervisionError::TerminationFailed {
                worker_id: handle.worker_id,
                message: e.to_string(),
            })
    }
}

#[cfg(unix)]
fn send_sigterm(worker_id: usize, pid: u32, _child: &mut Child) -> Result<(), SupervisionError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| SupervisionError::TerminationFailed {
        worker_id,
        message: format!("pid {} out of range", pid),
    })?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(SupervisionError::TerminationFailed {
            worker_id,
            message: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn send_sigterm(worker_id: usize, _pid: u32, child: &mut Child) -> Result<(), SupervisionError> {
    child
        .start_kill()
        .map_err(|e| SupervisionError::TerminationFailed {
            worker_id,
            message: e.to_string(),
        })
}
