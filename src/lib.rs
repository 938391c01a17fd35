//! Shard scheduler and worker-pool orchestrator for large crawl runs.
//!
//! A run goes through four phases: plan shards from the input site lists,
//! launch one worker per shard, supervise the workers against a hard deadline,
//! then archive the run's working directories.

pub mod archive;
pub mod config;
pub mod errors;
pub mod events;
pub mod fleet_config;
pub mod launch;
pub mod lock;
pub mod plan;
pub mod pool;
pub mod report;
pub mod supervise;
pub mod ui;
