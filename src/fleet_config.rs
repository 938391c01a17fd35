//! Unified configuration file for sitefleet.
//!
//! Settings are read from `fleet.toml` in the work directory. Every section and
//! field is optional; missing values fall back to defaults that match a full-size
//! crawl run.
//!
//! # Configuration File Format
//!
//! ```toml
//! [run]
//! total_workers = 84
//! hard_timeout_secs = 43200
//! stagger_secs = 4
//! poll_interval_secs = 30
//! separator = ","
//! # seed = 42
//! # termination_grace_secs = 60
//!
//! [worker]
//! command = "python3"
//! args = ["run_worker.py"]
//! headless = false
//! display_wrapper = ["xvfb-run", "-a"]
//!
//! [paths]
//! chunks_dir = "chunks"
//! data_dir = "datadir"
//! # archive_prefix = "2026-01-31_crawl"
//! ```
//!
//! Layering is file → environment → CLI. Two environment variables are honoured:
//! `SITEFLEET_WORKER_CMD` replaces `worker.command` and `SITEFLEET_TOTAL_WORKERS`
//! replaces `run.total_workers`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file inside the work directory.
pub const CONFIG_FILE_NAME: &str = "fleet.toml";

/// Scheduling and supervision settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Workers to distribute across all lists
    #[serde(default = "default_total_workers")]
    pub total_workers: usize,
    /// Wall-clock budget for the whole run, in seconds
    #[serde(default = "default_hard_timeout_secs")]
    pub hard_timeout_secs: u64,
    /// Pause between successive worker launches, in seconds
    #[serde(default = "default_stagger_secs")]
    pub stagger_secs: u64,
    /// Liveness polling interval during supervision, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Separator between site identifiers in list and shard files
    #[serde(default = "default_separator")]
    pub separator: String,
    /// Fixed shuffle seed for reproducible shard contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Wait this long after the deadline termination request, then force-kill
    /// any worker still alive. Unset means no escalation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_grace_secs: Option<u64>,
}

fn default_total_workers() -> usize {
    84
}

fn default_hard_timeout_secs() -> u64 {
    12 * 60 * 60
}

fn default_stagger_secs() -> u64 {
    4
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_separator() -> String {
    ",".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            total_workers: default_total_workers(),
            hard_timeout_secs: default_hard_timeout_secs(),
            stagger_secs: default_stagger_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            separator: default_separator(),
            seed: None,
            termination_grace_secs: None,
        }
    }
}

/// How to invoke the crawl-execution worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Program to execute
    #[serde(default = "default_worker_command")]
    pub command: String,
    /// Arguments placed before the shard arguments
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
    /// Wrap every invocation in the virtual-display helper
    #[serde(default)]
    pub headless: bool,
    /// Virtual-display helper invocation
    #[serde(default = "default_display_wrapper")]
    pub display_wrapper: Vec<String>,
}

fn default_worker_command() -> String {
    "python3".to_string()
}

fn default_worker_args() -> Vec<String> {
    vec!["run_worker.py".to_string()]
}

fn default_display_wrapper() -> Vec<String> {
    vec!["xvfb-run".to_string(), "-a".to_string()]
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            command: default_worker_command(),
            args: default_worker_args(),
            headless: false,
            display_wrapper: default_display_wrapper(),
        }
    }
}

/// Directory layout, relative to the work directory unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_chunks_dir")]
    pub chunks_dir: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Archive name prefix; defaults to `<date>_crawl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_prefix: Option<String>,
}

fn default_chunks_dir() -> String {
    "chunks".to_string()
}

fn default_data_dir() -> String {
    "datadir".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            chunks_dir: default_chunks_dir(),
            data_dir: default_data_dir(),
            archive_prefix: None,
        }
    }
}

/// The complete fleet.toml configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FleetToml {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub worker: WorkerSection,
    #[serde(default)]
    pub paths: PathsSection,
}

impl FleetToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse fleet.toml")
    }

    /// Load `fleet.toml` from the work directory, or defaults if it doesn't exist.
    pub fn load_or_default(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize fleet.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides on top of the file settings.
    pub fn apply_env(&mut self) {
        if let Ok(cmd) = std::env::var("SITEFLEET_WORKER_CMD")
            && !cmd.trim().is_empty()
        {
            self.worker.command = cmd;
        }
        if let Ok(workers) = std::env::var("SITEFLEET_TOTAL_WORKERS") {
            match workers.trim().parse::<usize>() {
                Ok(n) => self.run.total_workers = n,
                Err(_) => tracing::warn!(
                    value = %workers,
                    "Ignoring SITEFLEET_TOTAL_WORKERS: not a non-negative integer"
                ),
            }
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.run.total_workers == 0 {
            warnings.push("run.total_workers is 0: planning will refuse to run".to_string());
        }
        if self.run.hard_timeout_secs == 0 {
            warnings.push(
                "run.hard_timeout_secs is 0: every worker will be terminated on the first poll"
                    .to_string(),
            );
        }
        if self.run.poll_interval_secs == 0 {
            warnings.push(
                "run.poll_interval_secs is 0: supervision polls every second instead".to_string(),
            );
        }
        if self.run.separator.is_empty() {
            warnings.push("run.separator is empty: lists cannot be split".to_string());
        }
        if self.worker.command.trim().is_empty() {
            warnings.push("worker.command is empty".to_string());
        }
        if self.worker.headless && self.worker.display_wrapper.is_empty() {
            warnings.push(
                "worker.headless is set but worker.display_wrapper is empty: workers run without a virtual display"
                    .to_string(),
            );
        }
        if self.paths.chunks_dir == self.paths.data_dir {
            warnings.push(format!(
                "paths.chunks_dir and paths.data_dir are both '{}': archives would overlap",
                self.paths.chunks_dir
            ));
        }
        if let Some(prefix) = &self.paths.archive_prefix {
            let prefix = Path::new(prefix);
            for (key, dir) in [
                ("paths.data_dir", &self.paths.data_dir),
                ("paths.chunks_dir", &self.paths.chunks_dir),
            ] {
                if prefix.starts_with(dir) {
                    warnings.push(format!(
                        "paths.archive_prefix '{}' is inside {} '{}': that directory will not be archived",
                        prefix.display(),
                        key,
                        dir
                    ));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_full_run() {
        let config = FleetToml::default();
        assert_eq!(config.run.total_workers, 84);
        assert_eq!(config.run.hard_timeout_secs, 43_200);
        assert_eq!(config.run.stagger_secs, 4);
        assert_eq!(config.run.poll_interval_secs, 30);
        assert_eq!(config.run.separator, ",");
        assert!(config.run.seed.is_none());
        assert!(config.run.termination_grace_secs.is_none());
        assert_eq!(config.worker.display_wrapper, vec!["xvfb-run", "-a"]);
        assert_eq!(config.paths.chunks_dir, "chunks");
        assert_eq!(config.paths.data_dir, "datadir");
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = FleetToml::parse(
            r#"
[run]
total_workers = 12
seed = 7

[worker]
headless = true
"#,
        )
        .unwrap();
        assert_eq!(config.run.total_workers, 12);
        assert_eq!(config.run.seed, Some(7));
        assert_eq!(config.run.stagger_secs, 4);
        assert!(config.worker.headless);
        assert_eq!(config.worker.command, "python3");
    }

    #[test]
    fn test_parse_invalid_toml_errors() {
        let result = FleetToml::parse("[run\ntotal_workers = ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("fleet.toml"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let config = FleetToml::load_or_default(dir.path()).unwrap();
        assert_eq!(config, FleetToml::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let mut config = FleetToml::default();
        config.run.total_workers = 3;
        config.paths.archive_prefix = Some("nightly".to_string());
        let path = dir.path().join(CONFIG_FILE_NAME);
        config.save(&path).unwrap();

        let loaded = FleetToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.run.total_workers, 3);
        assert_eq!(loaded.paths.archive_prefix.as_deref(), Some("nightly"));
    }

    #[test]
    fn test_validate_default_has_no_warnings() {
        assert!(FleetToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut config = FleetToml::default();
        config.run.total_workers = 0;
        config.run.separator = String::new();
        config.paths.data_dir = "chunks".to_string();
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("total_workers")));
        assert!(warnings.iter().any(|w| w.contains("separator")));
        assert!(warnings.iter().any(|w| w.contains("overlap")));
    }

    #[test]
    fn test_validate_flags_archive_prefix_inside_working_dir() {
        let mut config = FleetToml::default();
        config.paths.archive_prefix = Some("datadir/nightly".to_string());
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("paths.data_dir"));

        // A sibling whose name merely starts with the same text is fine
        config.paths.archive_prefix = Some("datadir_nightly".to_string());
        assert!(config.validate().is_empty());
    }
}
