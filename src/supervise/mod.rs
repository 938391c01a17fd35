//! Deadline-driven supervision of launched workers.
//!
//! The supervisor polls every tracked worker at a fixed interval until either
//! all of them have exited (`Completed`) or the hard deadline elapses. On
//! timeout every worker still alive gets one cooperative termination request
//! (`TimeoutTerminating`) and supervision ends (`Terminated`).
//!
//! By default there is no escalation and no confirmation re-poll after the
//! termination request. Setting a termination grace period enables both: after
//! the grace the terminated workers are polled once more, and any still alive
//! are recorded as unconfirmed and force-killed.

use crate::errors::SupervisionError;
use crate::events::{EventSender, FleetEvent, emit};
use crate::pool::{WorkerHandle, WorkerPool, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Default polling interval (30 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest interval the supervisor will poll at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Supervisor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Running,
    Completed,
    TimeoutTerminating,
    Terminated,
}

impl SupervisorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Terminated)
    }

    fn can_transition_to(self, next: SupervisorState) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Completed)
                | (Self::Running, Self::TimeoutTerminating)
                | (Self::TimeoutTerminating, Self::Terminated)
        )
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::Completed => write!(f, "completed"),
            SupervisorState::TimeoutTerminating => write!(f, "timeout_terminating"),
            SupervisorState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Outcome of supervision, partitioning the handles it was given.
#[derive(Debug, Clone)]
pub struct SupervisionReport {
    /// `Completed` or `Terminated`
    pub state: SupervisorState,
    /// Workers that exited on their own
    pub completed: Vec<WorkerHandle>,
    /// Workers still alive at the deadline
    pub terminated: Vec<WorkerHandle>,
    /// Workers that never started; never polled or signalled
    pub never_started: Vec<WorkerHandle>,
    /// Termination requests that could not be delivered
    pub termination_failures: Vec<SupervisionError>,
    /// Workers still alive after the grace period (only with a grace period)
    pub unconfirmed: Vec<usize>,
    pub elapsed: Duration,
}

impl SupervisionReport {
    pub fn timed_out(&self) -> bool {
        self.state == SupervisorState::Terminated
    }

    /// Completed workers that exited with a non-zero or unknown code.
    pub fn failed_exits(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.completed.iter().filter(|h| h.exit_code != Some(0))
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    /// Escalate to a forceful kill after this long; `None` never escalates
    pub termination_grace: Option<Duration>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            termination_grace: None,
        }
    }
}

impl SupervisorConfig {
    /// Set the polling interval, raised to [`MIN_POLL_INTERVAL`] if shorter.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis() as u64,
                "Poll interval too short; using {}s",
                MIN_POLL_INTERVAL.as_secs()
            );
        }
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_termination_grace(mut self, grace: Option<Duration>) -> Self {
        self.termination_grace = grace;
        self
    }
}

/// Polls workers against a hard deadline.
pub struct Supervisor {
    config: SupervisorConfig,
    state: SupervisorState,
    event_tx: Option<EventSender>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            state: SupervisorState::Running,
            event_tx: None,
        }
    }

    /// Report ticks and exits on `tx`.
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn transition(&mut self, next: SupervisorState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid supervisor transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Supervisor state change");
        self.state = next;
    }

    /// Supervise `handles` until they all exit or `hard_deadline` elapses.
    pub async fn supervise<P>(
        &mut self,
        pool: &mut P,
        handles: Vec<WorkerHandle>,
        hard_deadline: Duration,
    ) -> SupervisionReport
    where
        P: WorkerPool + ?Sized,
    {
        let start = Instant::now();
        let (mut tracked, mut never_started): (Vec<_>, Vec<_>) =
            handles.into_iter().partition(WorkerHandle::is_started);
        let total = tracked.len();
        let mut completed = Vec::new();

        tracing::info!(
            workers = total,
            never_started = never_started.len(),
            deadline_secs = hard_deadline.as_secs(),
            "Supervising workers"
        );

        loop {
            let mut alive = Vec::with_capacity(tracked.len());
            for mut handle in tracked {
                match pool.poll(&handle).await {
                    WorkerStatus::Running => alive.push(handle),
                    WorkerStatus::Exited { exit_code } => {
                        handle.exit_code = exit_code;
                        match exit_code {
                            Some(0) => tracing::info!(worker_id = handle.worker_id, "Worker finished"),
                            _ => tracing::warn!(
                                worker_id = handle.worker_id,
                                exit_code = ?exit_code,
                                log = %handle.log_file.display(),
                                "Worker exited unsuccessfully"
                            ),
                        }
                        emit(
                            &self.event_tx,
                            FleetEvent::WorkerExited {
                                worker_id: handle.worker_id,
                                exit_code,
                            },
                        );
                        completed.push(handle);
                    }
                    WorkerStatus::NeverStarted => never_started.push(handle),
                }
            }
            tracked = alive;

            let elapsed = start.elapsed();
            emit(
                &self.event_tx,
                FleetEvent::Tick {
                    alive: tracked.len(),
                    tracked: total,
                    elapsed,
                },
            );

            if tracked.is_empty() {
                self.transition(SupervisorState::Completed);
                tracing::info!(
                    completed = completed.len(),
                    elapsed_secs = elapsed.as_secs(),
                    "All workers completed"
                );
                return SupervisionReport {
                    state: self.state,
                    completed,
                    terminated: Vec::new(),
                    never_started,
                    termination_failures: Vec::new(),
                    unconfirmed: Vec::new(),
                    elapsed,
                };
            }

            if elapsed >= hard_deadline {
                self.transition(SupervisorState::TimeoutTerminating);
                emit(
                    &self.event_tx,
                    FleetEvent::DeadlineReached {
                        alive: tracked.len(),
                    },
                );
                tracing::warn!(
                    alive = tracked.len(),
                    "Hard timeout reached; terminating remaining workers"
                );
                let (termination_failures, unconfirmed) = self.terminate(pool, &tracked).await;
                self.transition(SupervisorState::Terminated);
                return SupervisionReport {
                    state: self.state,
                    completed,
                    terminated: tracked,
                    never_started,
                    termination_failures,
                    unconfirmed,
                    elapsed: start.elapsed(),
                };
            }

            let remaining = hard_deadline - elapsed;
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }

    async fn terminate<P>(
        &self,
        pool: &mut P,
        alive: &[WorkerHandle],
    ) -> (Vec<SupervisionError>, Vec<usize>)
    where
        P: WorkerPool + ?Sized,
    {
        let mut failures = Vec::new();
        for handle in alive {
            if let Err(e) = pool.request_termination(handle).await {
                tracing::error!(worker_id = handle.worker_id, error = %e, "Termination request failed");
                failures.push(e);
            }
        }

        let mut unconfirmed = Vec::new();
        let Some(grace) = self.config.termination_grace else {
            return (failures, unconfirmed);
        };

        tokio::time::sleep(grace).await;
        for handle in alive {
            if pool.poll(handle).await != WorkerStatus::Running {
                continue;
            }
            let err = SupervisionError::TerminationNotConfirmed {
                worker_id: handle.worker_id,
            };
            tracing::warn!(worker_id = handle.worker_id, "{}; force-killing", err);
            unconfirmed.push(handle.worker_id);
            if let Err(e) = pool.force_kill(handle).await {
                tracing::error!(worker_id = handle.worker_id, error = %e, "Force kill failed");
                failures.push(e);
            }
        }
        (failures, unconfirmed)
    }
}
