//! Typed error hierarchy for the sitefleet orchestrator.
//!
//! One enum per phase of a run:
//! - `PlanError`: configuration and planning failures (fatal, nothing launched)
//! - `LaunchError`: a single worker failed to start (isolated per shard)
//! - `SupervisionError`: termination requests that could not be delivered or confirmed
//! - `ArchiveError`: compression or cleanup failures for one directory

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading lists and planning shards.
///
/// Every variant is fatal: the run aborts before any worker is launched.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("No site lists supplied")]
    NoLists,

    #[error("Total worker count must be at least 1")]
    ZeroWorkers,

    #[error("Supplied site lists contain no sites (combined size is zero)")]
    EmptyInput,

    #[error("Site list name '{name}' is used by more than one input ({first} and {second})")]
    DuplicateListName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Failed to read site list at {path}: {source}")]
    ListRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write shard file at {path}: {source}")]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while starting a single worker.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn worker {worker_id} ({program}): {source}")]
    Spawn {
        worker_id: usize,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open log file at {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker invocation is empty")]
    EmptyCommand,
}

/// Errors raised while stopping workers at the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisionError {
    #[error("Failed to deliver termination request to worker {worker_id}: {message}")]
    TerminationFailed { worker_id: usize, message: String },

    #[error("Worker {worker_id} still alive after termination request")]
    TerminationNotConfirmed { worker_id: usize },
}

/// Errors raised while archiving one directory.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error while archiving {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write zip archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive {path} is missing or empty; source directory kept")]
    EmptyArchive { path: PathBuf },

    #[error("Archive {archive} would be written inside {dir}; source directory kept")]
    DestinationInsideSource { archive: PathBuf, dir: PathBuf },

    #[error("Cannot archive {path}: not a regular file, directory or symlink")]
    UnsupportedEntry { path: PathBuf },

    #[error("Archived {archive} but failed to remove {dir}: {source}")]
    Remove {
        dir: PathBuf,
        archive: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_list_read_carries_path() {
        let path = PathBuf::from("/lists/iffy.txt");
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = PlanError::ListRead {
            path: path.clone(),
            source: io_err,
        };
        match &err {
            PlanError::ListRead { path: p, source } => {
                assert_eq!(p, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected ListRead"),
        }
        assert!(err.to_string().contains("/lists/iffy.txt"));
    }

    #[test]
    fn plan_error_duplicate_name_mentions_both_paths() {
        let err = PlanError::DuplicateListName {
            name: "news".to_string(),
            first: PathBuf::from("a/news.txt"),
            second: PathBuf::from("b/news.txt"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a/news.txt"));
        assert!(msg.contains("b/news.txt"));
    }

    #[test]
    fn launch_error_spawn_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "python3 not found");
        let err = LaunchError::Spawn {
            worker_id: 7,
            program: "python3".to_string(),
            source: io_err,
        };
        assert!(matches!(err, LaunchError::Spawn { worker_id: 7, .. }));
        assert!(err.to_string().contains("worker 7"));
    }

    #[test]
    fn supervision_error_carries_worker_id() {
        let err = SupervisionError::TerminationNotConfirmed { worker_id: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&PlanError::EmptyInput);
        assert_std_error(&LaunchError::EmptyCommand);
        assert_std_error(&SupervisionError::TerminationNotConfirmed { worker_id: 0 });
        assert_std_error(&ArchiveError::EmptyArchive {
            path: PathBuf::from("x.zip"),
        });
    }
}
