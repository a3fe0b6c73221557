//! CLI command implementations.

mod config;
mod start;

pub use config::{
    run_config, show_config, validate_config, ConfigArgs, ConfigCommand, DEFAULT_CONFIG_PATH,
};
pub use start::{load_config, run_start, StartArgs};
