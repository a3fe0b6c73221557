//! Configuration parsing and validation.
//!
//! Tessera configuration is loaded from TOML files with CLI overrides. Every
//! section has defaults, so an empty file describes a store with no regions and
//! no network listeners.

use crate::store::region::RegionSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Region names that collide with REST routes.
pub const RESERVED_REGION_NAMES: &[&str] = &["queries", "ping"];

/// Top-level Tessera configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store engine settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Regions created at startup.
    #[serde(default)]
    pub regions: Vec<RegionConfig>,

    /// Listener configuration for protocol adapters.
    #[serde(default)]
    pub listeners: ListenerConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Store engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Maximum wait for a per-key lock in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Lock table size that triggers a sweep of idle slots.
    #[serde(default = "default_lock_sweep_threshold")]
    pub lock_sweep_threshold: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_sweep_threshold: default_lock_sweep_threshold(),
        }
    }
}

impl ServerConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// A region declared in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,

    #[serde(rename = "type", default = "default_region_type")]
    pub region_type: String,

    #[serde(default)]
    pub key_constraint: Option<String>,

    #[serde(default)]
    pub value_constraint: Option<String>,
}

impl RegionConfig {
    pub fn to_spec(&self) -> RegionSpec {
        RegionSpec {
            name: self.name.clone(),
            region_type: self.region_type.clone(),
            key_constraint: self.key_constraint.clone(),
            value_constraint: self.value_constraint.clone(),
        }
    }
}

/// Listener configuration for protocol adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// TCP listener for the Redis adapter.
    #[serde(default)]
    pub redis: Option<RedisListenerConfig>,
}

/// Redis listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisListenerConfig {
    /// Bind address (e.g., "127.0.0.1:6379").
    pub bind: String,

    /// Region holding Redis keys; created at startup when not declared.
    #[serde(default = "default_redis_region")]
    pub region: String,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// Default value functions

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_lock_sweep_threshold() -> usize {
    1_024
}

fn default_region_type() -> String {
    "REPLICATE".to_string()
}

fn default_redis_region() -> String {
    "redis".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(ref redis_bind) = overrides.redis_bind {
            match self.listeners.redis {
                Some(ref mut redis) => redis.bind = redis_bind.clone(),
                None => {
                    self.listeners.redis = Some(RedisListenerConfig {
                        bind: redis_bind.clone(),
                        region: default_redis_region(),
                    })
                }
            }
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_server()?;
        self.validate_regions()?;
        self.validate_telemetry()?;
        self.validate_listeners()?;
        Ok(())
    }

    /// Specs for every region to create at startup, including the Redis region.
    pub fn region_specs(&self) -> Vec<RegionSpec> {
        let mut specs: Vec<RegionSpec> = self.regions.iter().map(RegionConfig::to_spec).collect();
        if let Some(ref redis) = self.listeners.redis {
            if !specs.iter().any(|s| s.name == redis.region) {
                specs.push(RegionSpec::new(redis.region.clone()));
            }
        }
        specs
    }

    fn validate_server(&self) -> Result<()> {
        if self.server.lock_timeout_ms == 0 {
            anyhow::bail!("server.lock_timeout_ms must be > 0");
        }
        if self.server.lock_sweep_threshold == 0 {
            anyhow::bail!("server.lock_sweep_threshold must be > 0");
        }
        Ok(())
    }

    fn validate_regions(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for region in &self.regions {
            validate_region_name(&region.name)?;
            if !seen.insert(region.name.as_str()) {
                anyhow::bail!("duplicate region name: {}", region.name);
            }
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }

    fn validate_listeners(&self) -> Result<()> {
        if let Some(ref redis) = self.listeners.redis {
            redis
                .bind
                .parse::<SocketAddr>()
                .with_context(|| format!("listeners.redis.bind is not a socket address: {}", redis.bind))?;
            validate_region_name(&redis.region).context("listeners.redis.region")?;
        }
        Ok(())
    }
}

fn validate_region_name(name: &str) -> Result<()> {
    if name.is_empty() {
        anyhow::bail!("region name must not be empty");
    }
    if name.contains('/') || name.contains(',') {
        anyhow::bail!("region name must not contain '/' or ',': {}", name);
    }
    if RESERVED_REGION_NAMES.contains(&name) {
        anyhow::bail!("region name is reserved: {}", name);
    }
    Ok(())
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override Redis bind address.
    pub redis_bind: Option<String>,
}
