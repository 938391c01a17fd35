//! Configuration view and validation commands (`sitefleet config`).

use anyhow::Result;
use std::path::Path;

use super::super::{Cli, ConfigCommands};
use super::load_config;

pub fn cmd_config(cli: &Cli, work_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    use sitefleet::config::CliOverrides;
    use sitefleet::fleet_config::{CONFIG_FILE_NAME, FleetToml};

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| work_dir.join(CONFIG_FILE_NAME));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Sitefleet Configuration");
            println!("=======================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                FleetToml::load(&config_path)?
            } else {
                println!("No fleet.toml found at {}", config_path.display());
                println!("Using default configuration.");
                FleetToml::default()
            };
            println!();

            println!("[run]");
            println!("  total_workers = {}", toml.run.total_workers);
            println!("  hard_timeout_secs = {}", toml.run.hard_timeout_secs);
            println!("  stagger_secs = {}", toml.run.stagger_secs);
            println!("  poll_interval_secs = {}", toml.run.poll_interval_secs);
            println!("  separator = {:?}", toml.run.separator);
            if let Some(seed) = toml.run.seed {
                println!("  seed = {}", seed);
            }
            if let Some(grace) = toml.run.termination_grace_secs {
                println!("  termination_grace_secs = {}", grace);
            }
            println!();

            println!("[worker]");
            println!("  command = {:?}", toml.worker.command);
            println!("  args = {:?}", toml.worker.args);
            println!("  headless = {}", toml.worker.headless);
            println!("  display_wrapper = {:?}", toml.worker.display_wrapper);
            println!();

            println!("[paths]");
            println!("  chunks_dir = {:?}", toml.paths.chunks_dir);
            println!("  data_dir = {:?}", toml.paths.data_dir);
            if let Some(prefix) = &toml.paths.archive_prefix {
                println!("  archive_prefix = {:?}", prefix);
            }
            println!();

            // Effective values after environment overrides
            println!("Effective values (with env overrides):");
            let config = load_config(cli, work_dir, &CliOverrides::default())?;
            println!("  worker = {:?}", config.worker.program);
            println!("  total_workers = {}", config.total_workers);
            println!("  chunks_dir = {}", config.chunks_dir.display());
            println!("  data_dir = {}", config.data_dir.display());
            println!("  archive_prefix = {}", config.archive_prefix.display());
            println!();

            if !config_path.exists() {
                println!("Run 'sitefleet config init' to create a fleet.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No fleet.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = FleetToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("fleet.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }

            FleetToml::default().save(&config_path)?;

            println!("Created fleet.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [run] total_workers, hard_timeout_secs, stagger_secs, poll_interval_secs");
            println!("  - [worker] command, args, headless, display_wrapper");
            println!("  - [paths] chunks_dir, data_dir, archive_prefix");
            println!();
        }
    }

    Ok(())
}
