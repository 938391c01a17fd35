//! Shard planning: load site lists, allocate workers, split and persist shards.
//!
//! ## Components
//!
//! - [`site_list`]: reading and shuffling list files
//! - [`allocate`]: proportional worker allocation and chunk sizing
//! - [`shard`]: the `Shard` record and its deterministic on-disk names
//!
//! Planning is all-or-nothing. Every list is loaded and validated before any
//! shard file is written, and any error aborts the run before launch.

pub mod allocate;
pub mod shard;
pub mod site_list;

pub use allocate::{allocate_workers, chunk_size, split_contiguous};
pub use shard::{Shard, chunk_file_path, shard_data_dir, shard_key};
pub use site_list::{SiteList, list_name};

use crate::config::Config;
use crate::errors::PlanError;
use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Allocation summary for one input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAllocation {
    pub name: String,
    pub source: PathBuf,
    pub sites: usize,
    pub workers: usize,
    pub chunk_size: usize,
    pub shards: usize,
}

/// The output of planning: shards in launch order plus per-list allocation.
#[derive(Debug, Clone, Default)]
pub struct ShardPlan {
    pub lists: Vec<ListAllocation>,
    pub shards: Vec<Shard>,
}

impl ShardPlan {
    pub fn total_sites(&self) -> usize {
        self.lists.iter().map(|l| l.sites).sum()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

/// Plans shards for a run.
pub struct ShardPlanner {
    chunks_dir: PathBuf,
    run_date: String,
    separator: String,
    seed: Option<u64>,
}

impl ShardPlanner {
    pub fn new(
        chunks_dir: impl Into<PathBuf>,
        run_date: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            chunks_dir: chunks_dir.into(),
            run_date: run_date.into(),
            separator: separator.into(),
            seed: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.chunks_dir, config.date_string(), &config.separator)
            .with_seed(config.seed)
    }

    /// Use a fixed shuffle seed so shard contents are reproducible.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Load every list, allocate workers, split into shards and persist them.
    ///
    /// Worker ids are assigned list-major, shard-minor, starting at 0, in the
    /// order the lists are supplied.
    pub fn plan(&self, list_paths: &[PathBuf], total_workers: usize) -> Result<ShardPlan, PlanError> {
        if list_paths.is_empty() {
            return Err(PlanError::NoLists);
        }
        if total_workers == 0 {
            return Err(PlanError::ZeroWorkers);
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut lists = Vec::with_capacity(list_paths.len());
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for path in list_paths {
            let list = SiteList::load(path, &self.separator, &mut rng)?;
            if let Some(first) = seen.insert(list.name.clone(), path.clone()) {
                return Err(PlanError::DuplicateListName {
                    name: list.name,
                    first,
                    second: path.clone(),
                });
            }
            tracing::debug!(list = %list.name, sites = list.len(), "Loaded site list");
            lists.push(list);
        }

        let sizes: Vec<usize> = lists.iter().map(SiteList::len).collect();
        let allocation = allocate_workers(&sizes, total_workers)?;

        std::fs::create_dir_all(&self.chunks_dir).map_err(|source| PlanError::ChunkWrite {
            path: self.chunks_dir.clone(),
            source,
        })?;

        let mut plan = ShardPlan::default();
        let mut worker_id = 0;
        for (list, workers) in lists.into_iter().zip(allocation) {
            let size = list.len();
            let chunk = chunk_size(size, workers);
            if size == 0 {
                tracing::warn!(list = %list.name, "Site list has no sites; no shards created");
            }

            let chunks = split_contiguous(&list.sites, chunk);
            let shard_count = chunks.len();
            for (index, sites) in chunks.into_iter().enumerate() {
                let shard = Shard {
                    worker_id,
                    chunk_file: chunk_file_path(&self.chunks_dir, &self.run_date, &list.name, index),
                    list_name: list.name.clone(),
                    index,
                    sites,
                };
                shard.persist(&self.separator)?;
                plan.shards.push(shard);
                worker_id += 1;
            }

            tracing::info!(
                list = %list.name,
                sites = size,
                workers,
                chunk_size = chunk,
                shards = shard_count,
                "Planned list"
            );
            plan.lists.push(ListAllocation {
                name: list.name,
                source: list.source,
                sites: size,
                workers,
                chunk_size: chunk,
                shards: shard_count,
            });
        }

        Ok(plan)
    }
}

/// Expand command-line list arguments. Arguments containing glob
/// metacharacters are expanded (sorted); others pass through unchanged.
pub fn resolve_list_paths(args: &[String], base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for arg in args {
        let candidate = base_dir.join(arg);
        if !arg.contains(['*', '?', '[']) {
            paths.push(candidate);
            continue;
        }

        let pattern = candidate.to_string_lossy().to_string();
        let mut matched: Vec<PathBuf> = glob::glob(&pattern)
            .with_context(|| format!("Invalid list pattern '{}'", arg))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        if matched.is_empty() {
            bail!("List pattern '{}' matched no files", arg);
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}
