//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tessera - in-memory region store with REST and Redis front-ends.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Tessera server.
    Start(commands::StartArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_globals() {
        let cli = Cli::parse_from([
            "tessera",
            "start",
            "--config",
            "a.toml",
            "--log-level",
            "debug",
            "--redis-bind",
            "127.0.0.1:7000",
        ]);
        assert_eq!(cli.config.as_deref(), Some("a.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Start(args) => assert_eq!(args.redis_bind.as_deref(), Some("127.0.0.1:7000")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_validate() {
        let cli = Cli::parse_from(["tessera", "config", "validate", "--config", "x.toml"]);
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
        assert!(matches!(
            cli.command,
            Commands::Config(commands::ConfigArgs {
                command: commands::ConfigCommand::Validate
            })
        ));
    }
}
