//! Start command implementation.

use super::config::DEFAULT_CONFIG_PATH;
use crate::core::config::{Config, ConfigOverrides};
use crate::core::runtime::Runtime;
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// Start the Tessera server.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Redis listener bind address (overrides config).
    #[arg(long)]
    pub redis_bind: Option<String>,
}

/// Initialize tracing subscriber if the telemetry feature is enabled.
#[cfg(feature = "telemetry")]
fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed by an embedding process.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "telemetry"))]
fn init_tracing(_level: &str) {}

/// Load configuration, falling back to defaults when the file is absent.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {:?}", path)),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Config::from_file(default_path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Run the start command.
pub async fn run_start(
    args: StartArgs,
    config_path: Option<&Path>,
    log_level: Option<String>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.apply_overrides(&ConfigOverrides {
        log_level,
        redis_bind: args.redis_bind,
    });
    config.validate().context("invalid configuration after overrides")?;

    init_tracing(&config.telemetry.log_level);

    let mut runtime = Runtime::new(config)?;
    runtime.run().await
}
