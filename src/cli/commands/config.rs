//! Config command implementation.

use crate::core::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate configuration file.
    Validate,
    /// Print configuration with defaults.
    Show {
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/tessera.toml";

/// Run the config command against the global `--config` path.
pub fn run_config(args: ConfigArgs, config_path: Option<&Path>) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    match args.command {
        ConfigCommand::Validate => {
            let summary = validate_config(&path)?;
            println!("{}", summary);
            Ok(())
        }
        ConfigCommand::Show { format } => {
            println!("{}", show_config(&path, &format)?);
            Ok(())
        }
    }
}

/// Load and validate a config file, returning a one-line summary.
pub fn validate_config(path: &Path) -> Result<String> {
    let config = Config::from_file(path)?;
    let redis = match config.listeners.redis {
        Some(ref redis) => format!("redis on {} (region {})", redis.bind, redis.region),
        None => "no redis listener".to_string(),
    };
    Ok(format!(
        "config valid: {} region(s), {}",
        config.region_specs().len(),
        redis
    ))
}

/// Render a config file with defaults filled in.
pub fn show_config(path: &Path, format: &str) -> Result<String> {
    let config = Config::from_file(path)?;
    match format {
        "json" => serde_json::to_string_pretty(&config).context("failed to render JSON"),
        "toml" => toml::to_string_pretty(&config).context("failed to render TOML"),
        other => anyhow::bail!("unsupported format: {} (expected toml or json)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_summary() {
        let file = write_config(
            "[[regions]]\nname = \"regionA\"\n\n[listeners.redis]\nbind = \"127.0.0.1:6379\"\n",
        );
        let summary = validate_config(file.path()).unwrap();
        assert_eq!(
            summary,
            "config valid: 2 region(s), redis on 127.0.0.1:6379 (region redis)"
        );
    }

    #[test]
    fn test_validate_rejects_bad_file() {
        let file = write_config("[server]\nlock_timeout_ms = 0\n");
        assert!(validate_config(file.path()).is_err());
        assert!(validate_config(Path::new("/nonexistent/tessera.toml")).is_err());
    }

    #[test]
    fn test_show_fills_defaults() {
        let file = write_config("");
        let toml = show_config(file.path(), "toml").unwrap();
        assert!(toml.contains("lock_timeout_ms = 5000"));
        let json = show_config(file.path(), "json").unwrap();
        assert!(json.contains("\"log_level\": \"info\""));
        assert!(show_config(file.path(), "yaml").is_err());
    }
}
