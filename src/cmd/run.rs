//! Full crawl run: plan, launch, supervise and archive (`sitefleet run`).

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use super::super::{Cli, PlanArgs};
use super::load_config;

/// Flags of the `run` subcommand.
pub struct RunOptions {
    pub plan: PlanArgs,
    pub timeout: Option<u64>,
    pub stagger: Option<u64>,
    pub poll_interval: Option<u64>,
    pub headless: bool,
    pub archive_prefix: Option<String>,
    pub no_archive: bool,
    pub ui: String,
}

pub async fn cmd_run(cli: &Cli, work_dir: &Path, options: RunOptions) -> Result<()> {
    use sitefleet::archive::finalize;
    use sitefleet::config::CliOverrides;
    use sitefleet::launch::Launcher;
    use sitefleet::lock::RunLock;
    use sitefleet::plan::{ShardPlanner, resolve_list_paths};
    use sitefleet::pool::ProcessPool;
    use sitefleet::report::{ReportStore, RunReport};
    use sitefleet::supervise::{Supervisor, SupervisorConfig};
    use sitefleet::ui::{FleetUI, UiMode};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    let overrides = CliOverrides {
        total_workers: options.plan.workers,
        hard_timeout_secs: options.timeout,
        stagger_secs: options.stagger,
        poll_interval_secs: options.poll_interval,
        headless: options.headless,
        seed: options.plan.seed,
        run_date: options.plan.date,
        archive_prefix: options.archive_prefix.clone(),
    };
    let config = load_config(cli, work_dir, &overrides)?;
    let _lock = RunLock::acquire(&config.state_dir)?;

    // Plan: any failure here aborts before a worker is launched.
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let list_paths = resolve_list_paths(&options.plan.lists, &cwd)?;
    let plan = ShardPlanner::from_config(&config)
        .plan(&list_paths, config.total_workers)
        .context("Failed to plan shards")?;
    config.ensure_directories()?;

    tracing::info!(
        run_date = %config.date_string(),
        lists = plan.lists.len(),
        shards = plan.shard_count(),
        sites = plan.total_sites(),
        deadline_secs = config.hard_deadline.as_secs(),
        "Starting run"
    );

    let mut report = RunReport::new(config.date_string(), config.total_workers, plan.lists.clone());
    let ui = Arc::new(FleetUI::new(
        plan.shard_count(),
        UiMode::parse(&options.ui),
        config.verbose,
    ));
    ui.print_plan(&plan);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let ui_task = {
        let ui = Arc::clone(&ui);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                ui.handle_event(&event);
            }
        })
    };

    // Launch and supervise. The deadline covers both phases.
    let mut pool = ProcessPool::from_config(&config);
    let started = Instant::now();
    let handles = Launcher::new(config.stagger)
        .with_events(event_tx.clone())
        .launch_all(&mut pool, &plan.shards)
        .await;

    let remaining = config.hard_deadline.saturating_sub(started.elapsed());
    let supervision = {
        let mut supervisor = Supervisor::new(
            SupervisorConfig::default()
                .with_poll_interval(config.poll_interval)
                .with_termination_grace(config.termination_grace),
        )
        .with_events(event_tx);
        supervisor.supervise(&mut pool, handles, remaining).await
    };

    // Every sender is gone now, so the UI task drains and exits.
    if let Err(e) = ui_task.await {
        tracing::warn!(error = %e, "UI task ended abnormally");
    }
    ui.finish();
    ui.print_supervision(&supervision);
    report.record_supervision(&supervision);

    // Archive
    if options.no_archive {
        tracing::info!("Archiving disabled; leaving working directories in place");
    } else {
        let data_dir = config.data_dir.clone();
        let chunks_dir = config.chunks_dir.clone();
        let prefix = config.archive_prefix.clone();
        let archives =
            tokio::task::spawn_blocking(move || finalize(&data_dir, &chunks_dir, &prefix))
                .await
                .context("Archive task failed")?;
        ui.print_archives(&archives);
        report.record_archives(archives);
    }

    report.finish();
    match ReportStore::new(&config.runs_dir).save(&report) {
        Ok(path) => tracing::info!(report = %path.display(), "Run report saved"),
        Err(e) => tracing::error!(error = %e, "Failed to save run report"),
    }

    Ok(())
}
