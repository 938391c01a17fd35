//! Standalone planning (`sitefleet plan`): writes shard files, launches nothing.

use anyhow::{Context, Result};
use std::path::Path;

use super::super::{Cli, PlanArgs};
use super::load_config;

pub fn cmd_plan(cli: &Cli, work_dir: &Path, args: &PlanArgs) -> Result<()> {
    use sitefleet::config::CliOverrides;
    use sitefleet::lock::RunLock;
    use sitefleet::plan::{ShardPlanner, resolve_list_paths};
    use sitefleet::ui::{FleetUI, UiMode};

    let overrides = CliOverrides {
        total_workers: args.workers,
        seed: args.seed,
        run_date: args.date,
        ..Default::default()
    };
    let config = load_config(cli, work_dir, &overrides)?;
    let _lock = RunLock::acquire(&config.state_dir)?;

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let list_paths = resolve_list_paths(&args.lists, &cwd)?;
    let plan = ShardPlanner::from_config(&config)
        .plan(&list_paths, config.total_workers)
        .context("Failed to plan shards")?;

    println!();
    FleetUI::new(0, UiMode::Minimal, cli.verbose).print_plan(&plan);
    println!();
    println!("{:<6} {:<20} {:<6} {:>8}  File", "Worker", "List", "Shard", "Sites");
    for shard in &plan.shards {
        println!(
            "{:<6} {:<20} {:<6} {:>8}  {}",
            shard.worker_id,
            shard.list_name,
            shard.index,
            shard.sites.len(),
            shard.chunk_file.display()
        );
    }
    println!();

    Ok(())
}
