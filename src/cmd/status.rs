//! Run history (`sitefleet status`).

use anyhow::Result;
use std::path::Path;

use super::super::Cli;
use super::load_config;

pub fn cmd_status(cli: &Cli, work_dir: &Path, all: bool) -> Result<()> {
    use sitefleet::archive::ArchiveOutcome;
    use sitefleet::config::CliOverrides;
    use sitefleet::report::{ReportStore, WorkerOutcome};

    let config = load_config(cli, work_dir, &CliOverrides::default())?;
    let store = ReportStore::new(&config.runs_dir);
    let runs = store.list_runs()?;

    if runs.is_empty() {
        println!();
        println!("No runs recorded in {}", config.runs_dir.display());
        println!();
        return Ok(());
    }

    if all {
        println!();
        println!(
            "{:<10} {:<12} {:<20} {:>7} {:>7} {:>10} {:>6}",
            "Run", "Date", "Started", "Exited", "Killed", "NotStarted", "Secs"
        );
        for path in &runs {
            match store.load(path) {
                Ok(report) => println!(
                    "{:<10} {:<12} {:<20} {:>7} {:>7} {:>10} {:>6.0}",
                    report.short_id(),
                    report.run_date,
                    report.started_at.format("%Y-%m-%d %H:%M:%S"),
                    report.count(WorkerOutcome::Exited),
                    report.count(WorkerOutcome::Terminated),
                    report.count(WorkerOutcome::NeverStarted),
                    report.supervision_secs
                ),
                Err(e) => println!("{:<10} unreadable: {}", path.display(), e),
            }
        }
        println!();
        return Ok(());
    }

    let report = store.load(&runs[0])?;
    println!();
    println!("Run {} ({})", report.short_id(), report.run_date);
    println!("Started:  {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(finished) = report.finished_at {
        println!("Finished: {}", finished.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(state) = report.supervision_state {
        println!("Outcome:  {} after {:.0}s", state, report.supervision_secs);
    }
    println!();

    println!("Lists:");
    for list in &report.lists {
        println!(
            "  {:<20} {:>8} sites  {:>3} workers  {:>3} shards",
            list.name, list.sites, list.workers, list.shards
        );
    }
    println!();

    println!(
        "Workers: {} exited, {} terminated, {} never started",
        report.count(WorkerOutcome::Exited),
        report.count(WorkerOutcome::Terminated),
        report.count(WorkerOutcome::NeverStarted)
    );
    for worker in &report.workers {
        let detail = match worker.outcome {
            WorkerOutcome::Exited if worker.exit_code == Some(0) => continue,
            WorkerOutcome::Exited => match worker.exit_code {
                Some(code) => format!("exit code {}", code),
                None => "killed by signal".to_string(),
            },
            WorkerOutcome::Terminated => "terminated at deadline".to_string(),
            WorkerOutcome::NeverStarted => {
                format!("never started: {}", worker.error.as_deref().unwrap_or("unknown"))
            }
        };
        println!(
            "  worker {:>3} ({} shard {}): {}  [{}]",
            worker.worker_id,
            worker.list,
            worker.shard,
            detail,
            worker.log_file.display()
        );
    }
    for failure in &report.termination_failures {
        println!("  termination failed: {}", failure);
    }
    if !report.unconfirmed.is_empty() {
        println!("  still alive after grace period: {:?}", report.unconfirmed);
    }

    if let Some(archives) = &report.archives {
        println!();
        println!("Archives:");
        for entry in &archives.entries {
            match &entry.outcome {
                ArchiveOutcome::Archived { archive, bytes, .. } => {
                    println!("  {:<8} {} ({} bytes)", entry.kind, archive.display(), bytes)
                }
                ArchiveOutcome::Missing => println!("  {:<8} not found", entry.kind),
                ArchiveOutcome::Failed { error, source_kept } => println!(
                    "  {:<8} FAILED: {}{}",
                    entry.kind,
                    error,
                    if *source_kept { " (directory kept)" } else { "" }
                ),
            }
        }
    }
    println!();

    Ok(())
}
