use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd;

#[derive(Parser)]
#[command(name = "sitefleet")]
#[command(version, about = "Shard site lists across a pool of crawl workers")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding fleet.toml, chunks/ and datadir/ (defaults to the current directory)
    #[arg(long, global = true, env = "SITEFLEET_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Config file to use instead of <work-dir>/fleet.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file, one JSON object per line
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by `run` and `plan`.
#[derive(Args, Clone, Debug)]
pub struct PlanArgs {
    /// Site list files (glob patterns allowed)
    #[arg(required = true)]
    pub lists: Vec<String>,

    /// Total workers to distribute across all lists
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Fixed shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run date used in file names (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = sitefleet::config::parse_run_date)]
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan, launch, supervise and archive a crawl run
    Run {
        #[command(flatten)]
        plan: PlanArgs,

        /// Hard deadline for the whole run, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Pause between worker launches, in seconds
        #[arg(long)]
        stagger: Option<u64>,

        /// Liveness polling interval, in seconds
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Run workers under the virtual display wrapper
        #[arg(long)]
        headless: bool,

        /// Archive name prefix (defaults to <date>_crawl)
        #[arg(long)]
        archive_prefix: Option<String>,

        /// Leave chunks/ and datadir/ in place
        #[arg(long)]
        no_archive: bool,

        /// UI output mode: full, minimal, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Write shard files without launching anything
    Plan {
        #[command(flatten)]
        plan: PlanArgs,
    },
    /// Show the most recent run report
    Status {
        /// List every recorded run
        #[arg(long)]
        all: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default fleet.toml file
    Init,
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "sitefleet=debug" } else { "sitefleet=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let work_dir = match cli.work_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Run {
            plan,
            timeout,
            stagger,
            poll_interval,
            headless,
            archive_prefix,
            no_archive,
            ui,
        } => {
            let options = cmd::run::RunOptions {
                plan: plan.clone(),
                timeout: *timeout,
                stagger: *stagger,
                poll_interval: *poll_interval,
                headless: *headless,
                archive_prefix: archive_prefix.clone(),
                no_archive: *no_archive,
                ui: ui.clone(),
            };
            cmd::cmd_run(&cli, &work_dir, options).await?;
        }
        Commands::Plan { plan } => cmd::cmd_plan(&cli, &work_dir, plan)?,
        Commands::Status { all } => cmd::cmd_status(&cli, &work_dir, *all)?,
        Commands::Config { command } => cmd::cmd_config(&cli, &work_dir, command.clone())?,
    }

    Ok(())
}
