//! Progress events emitted while launching and supervising workers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events emitted during a run, consumed by the terminal UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    /// A worker process was spawned.
    WorkerLaunched {
        worker_id: usize,
        list: String,
        shard: usize,
        pid: Option<u32>,
    },
    /// A worker could not be started.
    WorkerLaunchFailed {
        worker_id: usize,
        list: String,
        shard: usize,
        error: String,
    },
    /// One supervision poll finished.
    Tick {
        alive: usize,
        tracked: usize,
        elapsed: Duration,
    },
    /// A worker exited on its own.
    WorkerExited {
        worker_id: usize,
        exit_code: Option<i32>,
    },
    /// The hard deadline elapsed with workers still alive.
    DeadlineReached { alive: usize },
}

pub type EventSender = mpsc::UnboundedSender<FleetEvent>;

/// Send an event if anyone is listening; a closed channel is ignored.
pub(crate) fn emit(tx: &Option<EventSender>, event: FleetEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
