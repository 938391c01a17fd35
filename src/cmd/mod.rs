//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `run`    | `Run`            |
//! | `plan`   | `Plan`           |
//! | `status` | `Status`         |
//! | `config` | `Config`         |

pub mod config;
pub mod plan;
pub mod run;
pub mod status;

pub use config::cmd_config;
pub use plan::cmd_plan;
pub use run::cmd_run;
pub use status::cmd_status;

use super::Cli;
use anyhow::Result;
use sitefleet::config::{CliOverrides, Config};
use std::path::Path;

/// Resolve the runtime configuration for a command.
pub(crate) fn load_config(cli: &Cli, work_dir: &Path, overrides: &CliOverrides) -> Result<Config> {
    Config::load(work_dir, cli.config.as_deref(), overrides, cli.verbose)
}
