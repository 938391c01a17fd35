//! Shards and their on-disk names.
//!
//! Every per-worker path is keyed by (run date, list name, shard index). These
//! names are the only thing keeping concurrent workers out of each other's files.

use crate::errors::PlanError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A contiguous slice of one site list, assigned to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shard {
    pub worker_id: usize,
    pub list_name: String,
    /// 0-based, contiguous within the list
    pub index: usize,
    pub sites: Vec<String>,
    /// Persisted shard file handed to the worker
    pub chunk_file: PathBuf,
}

impl Shard {
    /// Per-worker log file next to the shard file.
    pub fn log_file(&self) -> PathBuf {
        let stem = self
            .chunk_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.chunk_file
            .with_file_name(format!("{}_worker{}.log", stem, self.worker_id))
    }

    /// Write the shard's sites, joined by `separator`, to its chunk file.
    pub fn persist(&self, separator: &str) -> Result<(), PlanError> {
        std::fs::write(&self.chunk_file, self.sites.join(separator)).map_err(|source| {
            PlanError::ChunkWrite {
                path: self.chunk_file.clone(),
                source,
            }
        })
    }
}

/// `<date>_<list>_shard<index>`, the key shared by every artifact of a shard.
pub fn shard_key(run_date: &str, list_name: &str, index: usize) -> String {
    format!("{}_{}_shard{}", run_date, list_name, index)
}

/// `<chunks_dir>/<date>_<list>_shard<index>.txt`
pub fn chunk_file_path(chunks_dir: &Path, run_date: &str, list_name: &str, index: usize) -> PathBuf {
    chunks_dir.join(format!("{}.txt", shard_key(run_date, list_name, index)))
}

/// `<data_dir>/<date>_<list>_shard<index>`, where the worker writes its results.
pub fn shard_data_dir(data_dir: &Path, run_date: &str, list_name: &str, index: usize) -> PathBuf {
    data_dir.join(shard_key(run_date, list_name, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn shard(dir: &Path) -> Shard {
        Shard {
            worker_id: 12,
            list_name: "iffy".to_string(),
            index: 3,
            sites: vec!["a.com".to_string(), "b.com".to_string()],
            chunk_file: chunk_file_path(dir, "2026-01-31", "iffy", 3),
        }
    }

    #[test]
    fn test_chunk_file_path_format() {
        let path = chunk_file_path(Path::new("chunks"), "2026-01-31", "iffy", 3);
        assert_eq!(path, PathBuf::from("chunks/2026-01-31_iffy_shard3.txt"));
    }

    #[test]
    fn test_log_file_format() {
        let s = shard(Path::new("chunks"));
        assert_eq!(
            s.log_file(),
            PathBuf::from("chunks/2026-01-31_iffy_shard3_worker12.log")
        );
    }

    #[test]
    fn test_shard_data_dir_format() {
        let path = shard_data_dir(Path::new("datadir"), "2026-01-31", "iffy", 0);
        assert_eq!(path, PathBuf::from("datadir/2026-01-31_iffy_shard0"));
    }

    #[test]
    fn test_persist_joins_with_separator() {
        let dir = tempdir().unwrap();
        let s = shard(dir.path());
        s.persist(",").unwrap();
        assert_eq!(std::fs::read_to_string(&s.chunk_file).unwrap(), "a.com,b.com");
    }

    #[test]
    fn test_persist_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let s = shard(&dir.path().join("nope"));
        assert!(matches!(s.persist(","), Err(PlanError::ChunkWrite { .. })));
    }
}
