//! Tessera - unified CLI entrypoint.
//!
//! Usage:
//!   tessera start --config config/tessera.toml [--redis-bind ADDR]
//!   tessera config validate --config config/tessera.toml
//!   tessera config show --format json

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tessera::cli::commands::{run_config, run_start};
use tessera::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(Path::new);

    match cli.command {
        Commands::Start(args) => run_start(args, config_path, cli.log_level).await,
        Commands::Config(args) => run_config(args, config_path),
    }
}
