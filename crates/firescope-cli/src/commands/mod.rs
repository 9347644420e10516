//! Command implementations

mod bbox;
mod check;
mod config;
mod curves;
mod fetch;
mod repair;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Check(args) => check::execute(args, cli.storage, config_path, &output).await,
        Commands::Curves(args) => curves::execute(args, cli.storage, config_path, &output).await,
        Commands::Repair(args) => repair::execute(args, cli.storage, config_path, &output).await,
        Commands::Fetch(args) => fetch::execute(args, cli.storage, config_path, &output).await,
        Commands::Bbox(args) => bbox::execute(args, &output).await,
        Commands::Config => config::execute(config_path, &output),
    }
}
