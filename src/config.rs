use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fleet_config::{CONFIG_FILE_NAME, FleetToml};
use crate::launch::WorkerCommand;

/// Date format used in every on-disk name (`2026-01-31`).
pub const RUN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Name of the orchestrator's own state directory inside the work directory.
pub const STATE_DIR_NAME: &str = ".sitefleet";

/// Command-line overrides, applied on top of fleet.toml and the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub total_workers: Option<usize>,
    pub hard_timeout_secs: Option<u64>,
    pub stagger_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub headless: bool,
    pub seed: Option<u64>,
    pub run_date: Option<NaiveDate>,
    pub archive_prefix: Option<String>,
}

/// Runtime configuration for a sitefleet run.
///
/// Resolves the layered settings into concrete paths and durations. All paths
/// are absolute, anchored at the canonical work directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: PathBuf,
    pub chunks_dir: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub run_date: NaiveDate,
    /// Archive prefix path; archives are `<prefix>_<kind>.zip`
    pub archive_prefix: PathBuf,
    pub total_workers: usize,
    pub hard_deadline: Duration,
    pub stagger: Duration,
    pub poll_interval: Duration,
    pub termination_grace: Option<Duration>,
    pub separator: String,
    pub seed: Option<u64>,
    pub worker: WorkerCommand,
    pub verbose: bool,
}

impl Config {
    /// Load fleet.toml (from `config_file` or the work directory), apply the
    /// environment, then the CLI overrides.
    pub fn load(
        work_dir: &Path,
        config_file: Option<&Path>,
        overrides: &CliOverrides,
        verbose: bool,
    ) -> Result<Self> {
        let work_dir = work_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve work directory {}", work_dir.display()))?;

        let mut toml = match config_file {
            Some(path) => FleetToml::load(path)?,
            None => FleetToml::load_or_default(&work_dir)?,
        };
        toml.apply_env();

        Self::from_toml(work_dir, toml, overrides, verbose)
    }

    /// Build the runtime configuration from already-loaded settings.
    pub fn from_toml(
        work_dir: PathBuf,
        toml: FleetToml,
        overrides: &CliOverrides,
        verbose: bool,
    ) -> Result<Self> {
        if toml.run.separator.is_empty() {
            bail!("run.separator must not be empty");
        }

        let run_date = overrides
            .run_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let date = run_date.format(RUN_DATE_FORMAT).to_string();

        let prefix = overrides
            .archive_prefix
            .clone()
            .or(toml.paths.archive_prefix.clone())
            .unwrap_or_else(|| format!("{}_crawl", date));

        let state_dir = work_dir.join(STATE_DIR_NAME);
        let runs_dir = state_dir.join("runs");

        let worker = WorkerCommand {
            program: toml.worker.command.clone(),
            args: toml.worker.args.clone(),
            headless: overrides.headless || toml.worker.headless,
            display_wrapper: toml.worker.display_wrapper.clone(),
        };

        Ok(Self {
            chunks_dir: work_dir.join(&toml.paths.chunks_dir),
            data_dir: work_dir.join(&toml.paths.data_dir),
            archive_prefix: work_dir.join(prefix),
            state_dir,
            runs_dir,
            run_date,
            total_workers: overrides.total_workers.unwrap_or(toml.run.total_workers),
            hard_deadline: Duration::from_secs(
                overrides
                    .hard_timeout_secs
                    .unwrap_or(toml.run.hard_timeout_secs),
            ),
            stagger: Duration::from_secs(overrides.stagger_secs.unwrap_or(toml.run.stagger_secs)),
            poll_interval: Duration::from_secs(
                overrides
                    .poll_interval_secs
                    .unwrap_or(toml.run.poll_interval_secs),
            ),
            termination_grace: toml.run.termination_grace_secs.map(Duration::from_secs),
            separator: toml.run.separator.clone(),
            seed: overrides.seed.or(toml.run.seed),
            worker,
            verbose,
            work_dir,
        })
    }

    /// Run date as it appears in file names.
    pub fn date_string(&self) -> String {
        self.run_date.format(RUN_DATE_FORMAT).to_string()
    }

    /// Path of the config file inside the work directory.
    pub fn config_file(&self) -> PathBuf {
        self.work_dir.join(CONFIG_FILE_NAME)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.chunks_dir).context("Failed to create chunks directory")?;
        std::fs::create_dir_all(&self.data_dir).context("Failed to create data directory")?;
        std::fs::create_dir_all(&self.runs_dir).context("Failed to create runs directory")?;
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` run date from the command line.
pub fn parse_run_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, RUN_DATE_FORMAT)
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", s))
}
