//! Terminal progress for a fleet run.
//!
//! Output modes:
//! - `full`: launch progress bar and supervision spinner
//! - `minimal`: one line per launch, exit and deadline
//! - `json`: one JSON object per [`FleetEvent`]

use crate::archive::{ArchiveOutcome, ArchiveReport};
use crate::events::FleetEvent;
use crate::plan::ShardPlan;
use crate::supervise::SupervisionReport;
use crate::ui::icons::{CHECK, CLOCK, CROSS, FOLDER, PACKAGE, ROCKET, STOP, WARN};
use console::{Term, style};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Output mode for the fleet UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    #[default]
    Full,
    Minimal,
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "minimal" => Self::Minimal,
            _ => Self::Full,
        })
    }
}

impl UiMode {
    pub fn parse(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Launch bar plus supervision spinner, driven by [`FleetEvent`]s.
///
/// Events arrive from a single consumer task, so no interior locking is needed.
pub struct FleetUI {
    mode: UiMode,
    multi: MultiProgress,
    launch_bar: ProgressBar,
    watch_bar: ProgressBar,
    term: Term,
    verbose: bool,
}

impl FleetUI {
    pub fn new(total_shards: usize, mode: UiMode, verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let launch_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");
        let watch_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let (launch_bar, watch_bar) = if mode == UiMode::Full {
            let launch_bar = multi.add(ProgressBar::new(total_shards as u64));
            launch_bar.set_style(launch_style);
            launch_bar.set_prefix("Launch");
            let watch_bar = multi.add(ProgressBar::new_spinner());
            watch_bar.set_style(watch_style);
            watch_bar.set_prefix(" Watch");
            (launch_bar, watch_bar)
        } else {
            (ProgressBar::hidden(), ProgressBar::hidden())
        };

        Self {
            mode,
            multi,
            launch_bar,
            watch_bar,
            term: Term::stdout(),
            verbose,
        }
    }

    /// Print through the progress renderer so bars are not torn; plain stdout
    /// when there is no terminal to draw on.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.mode == UiMode::Full && !self.multi.is_hidden() {
            if self.multi.println(msg.as_ref()).is_err() {
                eprintln!("{}", msg.as_ref());
            }
        } else {
            let _ = writeln!(&self.term, "{}", msg.as_ref());
        }
    }

    pub fn handle_event(&self, event: &FleetEvent) {
        match self.mode {
            UiMode::Json => self.handle_json(event),
            UiMode::Minimal => self.handle_minimal(event),
            UiMode::Full => self.handle_full(event),
        }
    }

    fn handle_json(&self, event: &FleetEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(&self.term, "{}", json);
        }
    }

    fn handle_minimal(&self, event: &FleetEvent) {
        match event {
            FleetEvent::WorkerLaunched {
                worker_id,
                list,
                shard,
                ..
            } => self.print_line(format!("+ worker {} ({} shard {})", worker_id, list, shard)),
            FleetEvent::WorkerLaunchFailed {
                worker_id, error, ..
            } => self.print_line(format!("! worker {} failed to start: {}", worker_id, error)),
            FleetEvent::WorkerExited {
                worker_id,
                exit_code,
            } => self.print_line(format!(
                "- worker {} exited ({})",
                worker_id,
                format_exit(*exit_code)
            )),
            FleetEvent::DeadlineReached { alive } => {
                self.print_line(format!("deadline reached, terminating {} workers", alive))
            }
            FleetEvent::Tick { .. } => {}
        }
    }

    fn handle_full(&self, event: &FleetEvent) {
        match event {
            FleetEvent::WorkerLaunched {
                worker_id,
                list,
                shard,
                pid,
            } => {
                self.launch_bar.inc(1);
                self.launch_bar.set_message(format!(
                    "{} shard {} {}",
                    style(list).yellow(),
                    shard,
                    style(format!("(worker {})", worker_id)).dim()
                ));
                if self.verbose {
                    let pid = pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
                    self.print_line(format!(
                        "    {} worker {} pid {}",
                        ROCKET,
                        style(worker_id).cyan(),
                        pid
                    ));
                }
            }
            FleetEvent::WorkerLaunchFailed {
                worker_id,
                list,
                shard,
                error,
            } => {
                self.launch_bar.inc(1);
                self.print_line(format!(
                    "    {} worker {} ({} shard {}) failed to start: {}",
                    CROSS,
                    style(worker_id).red().bold(),
                    list,
                    shard,
                    style(error).dim()
                ));
            }
            FleetEvent::Tick {
                alive,
                tracked,
                elapsed,
            } => {
                if !self.launch_bar.is_finished() {
                    self.launch_bar.finish();
                    self.watch_bar
                        .enable_steady_tick(Duration::from_millis(120));
                }
                self.watch_bar.set_message(format!(
                    "{}/{} workers alive {}",
                    style(alive).cyan(),
                    tracked,
                    style(format!("({})", format_duration(*elapsed))).dim()
                ));
            }
            FleetEvent::WorkerExited {
                worker_id,
                exit_code,
            } => {
                let icon = if *exit_code == Some(0) { CHECK } else { WARN };
                if self.verbose || *exit_code != Some(0) {
                    self.print_line(format!(
                        "    {} worker {} exited ({})",
                        icon,
                        style(worker_id).cyan(),
                        format_exit(*exit_code)
                    ));
                }
            }
            FleetEvent::DeadlineReached { alive } => {
                self.print_line(format!(
                    "    {} Deadline reached, terminating {} workers",
                    CLOCK,
                    style(alive).red().bold()
                ));
            }
        }
    }

    /// Stop both bars.
    pub fn finish(&self) {
        if !self.launch_bar.is_finished() {
            self.launch_bar.finish();
        }
        self.watch_bar.finish_and_clear();
    }

    pub fn print_plan(&self, plan: &ShardPlan) {
        if self.mode == UiMode::Json {
            return;
        }
        self.print_line(format!(
            "{} {} sites across {} lists into {} shards",
            FOLDER,
            style(plan.total_sites()).yellow().bold(),
            plan.lists.len(),
            style(plan.shard_count()).yellow().bold()
        ));
        for list in &plan.lists {
            self.print_line(format!(
                "  {:<20} {:>8} sites  {:>3} workers  {:>6} per shard  {:>3} shards",
                style(&list.name).cyan(),
                list.sites,
                list.workers,
                list.chunk_size,
                list.shards
            ));
        }
    }

    pub fn print_supervision(&self, report: &SupervisionReport) {
        if self.mode == UiMode::Json {
            return;
        }
        let failed = report.failed_exits().count();
        let headline = if report.timed_out() {
            format!("{} Deadline reached", STOP)
        } else {
            format!("{} All workers finished", CHECK)
        };
        self.print_line(format!(
            "\n{} after {}",
            style(headline).bold(),
            format_duration(report.elapsed)
        ));
        self.print_line(format!(
            "  exited: {} ({} non-zero)  terminated: {}  never started: {}",
            style(report.completed.len()).green(),
            failed,
            style(report.terminated.len()).yellow(),
            style(report.never_started.len()).red()
        ));
        for e in &report.termination_failures {
            self.print_line(format!("  {} {}", CROSS, e));
        }
        if !report.unconfirmed.is_empty() {
            self.print_line(format!(
                "  {} still alive after grace period: {:?}",
                WARN, report.unconfirmed
            ));
        }
    }

    pub fn print_archives(&self, report: &ArchiveReport) {
        if self.mode == UiMode::Json {
            return;
        }
        for entry in &report.entries {
            let line = match &entry.outcome {
                ArchiveOutcome::Archived {
                    archive,
                    bytes,
                    files,
                } => format!(
                    "{} {} -> {} ({} files, {} bytes)",
                    PACKAGE,
                    entry.kind,
                    style(archive.display()).green(),
                    files,
                    bytes
                ),
                ArchiveOutcome::Missing => format!(
                    "{} {} not found, skipped",
                    style("-").dim(),
                    entry.source.display()
                ),
                ArchiveOutcome::Failed { error, source_kept } => format!(
                    "{} {} archive failed: {}{}",
                    CROSS,
                    entry.kind,
                    style(error).red(),
                    if *source_kept { " (directory kept)" } else { "" }
                ),
            };
            self.print_line(line);
        }
    }
}

fn format_exit(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "signal".to_string(),
    }
}

/// `1h 2m 3s`, `4m 5s`, `6s` or `700ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_mode_parse() {
        assert_eq!(UiMode::parse("json"), UiMode::Json);
        assert_eq!(UiMode::parse("MINIMAL"), UiMode::Minimal);
        assert_eq!(UiMode::parse("full"), UiMode::Full);
        assert_eq!(UiMode::parse("whatever"), UiMode::Full);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(43200)), "12h 0m 0s");
    }

    #[test]
    fn test_format_exit() {
        assert_eq!(format_exit(Some(0)), "code 0");
        assert_eq!(format_exit(None), "signal");
    }

    #[test]
    fn test_handle_events_in_every_mode() {
        let events = [
            FleetEvent::WorkerLaunched {
                worker_id: 0,
                list: "iffy".to_string(),
                shard: 0,
                pid: Some(1),
            },
            FleetEvent::WorkerLaunchFailed {
                worker_id: 1,
                list: "iffy".to_string(),
                shard: 1,
                error: "boom".to_string(),
            },
            FleetEvent::Tick {
                alive: 1,
                tracked: 1,
                elapsed: Duration::from_secs(30),
            },
            FleetEvent::WorkerExited {
                worker_id: 0,
                exit_code: Some(0),
            },
            FleetEvent::DeadlineReached { alive: 0 },
        ];
        for mode in [UiMode::Full, UiMode::Minimal, UiMode::Json] {
            let ui = FleetUI::new(2, mode, true);
            for event in &events {
                ui.handle_event(event);
            }
            ui.finish();
        }
    }
}
