//! Staggered worker launch.
//!
//! Shards are submitted to the pool one at a time in plan order (list-major,
//! shard-minor) with a fixed pause between launches so browser start-up does not
//! spike all at once. A shard whose worker cannot start is recorded as never
//! started and the remaining shards still launch.

pub mod command;

pub use command::WorkerCommand;

use crate::events::{EventSender, FleetEvent, emit};
use crate::plan::Shard;
use crate::pool::{LaunchState, WorkerHandle, WorkerPool};
use std::time::Duration;

/// Launches shards onto a [`WorkerPool`].
pub struct Launcher {
    stagger: Duration,
    event_tx: Option<EventSender>,
}

impl Launcher {
    pub fn new(stagger: Duration) -> Self {
        Self {
            stagger,
            event_tx: None,
        }
    }

    /// Report launches on `tx`.
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Submit every shard, pausing `stagger` between launches.
    ///
    /// Returns one handle per shard, in launch order. Never fails: spawn
    /// failures come back as never-started handles.
    pub async fn launch_all<P>(&self, pool: &mut P, shards: &[Shard]) -> Vec<WorkerHandle>
    where
        P: WorkerPool + ?Sized,
    {
        let mut handles = Vec::with_capacity(shards.len());

        for (i, shard) in shards.iter().enumerate() {
            if i > 0 && !self.stagger.is_zero() {
                tokio::time::sleep(self.stagger).await;
            }

            tracing::debug!(
                worker_id = shard.worker_id,
                list = %shard.list_name,
                shard = shard.index,
                "Launching worker"
            );
            let handle = pool.submit(shard).await;
            let event = match &handle.launch {
                LaunchState::Started { pid } => FleetEvent::WorkerLaunched {
                    worker_id: handle.worker_id,
                    list: shard.list_name.clone(),
                    shard: shard.index,
                    pid: *pid,
                },
                LaunchState::NeverStarted { error } => FleetEvent::WorkerLaunchFailed {
                    worker_id: handle.worker_id,
                    list: shard.list_name.clone(),
                    shard: shard.index,
                    error: error.clone(),
                },
            };
            emit(&self.event_tx, event);
            handles.push(handle);
        }

        let failed = handles.iter().filter(|h| !h.is_started()).count();
        tracing::info!(
            launched = handles.len() - failed,
            failed,
            "Launch phase complete"
        );
        handles
    }
}
