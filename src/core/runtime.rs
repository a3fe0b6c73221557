//! Main runtime orchestration.
//!
//! The runtime coordinates component lifecycle:
//! - Start order: engine (regions) → adapters → listeners
//! - Shutdown order: listeners → adapters

use crate::adapters::redis::{RedisConfig, RedisService};
use crate::adapters::rest::RestAdapter;
use crate::core::config::Config;
use crate::engine::Engine;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Component health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Component is starting.
    Starting,
    /// Component is healthy and operational.
    Healthy,
    /// Component is not configured.
    Disabled,
    /// Component has failed.
    Failed,
    /// Component is stopping.
    Stopping,
    /// Component has stopped.
    Stopped,
}

/// Health status aggregated from all components.
#[derive(Debug, Clone)]
pub struct RuntimeHealth {
    /// Region catalog health.
    pub engine: ComponentHealth,
    /// Adapter health.
    pub adapters: ComponentHealth,
    /// Listener health.
    pub listeners: ComponentHealth,
}

impl Default for RuntimeHealth {
    fn default() -> Self {
        Self {
            engine: ComponentHealth::Starting,
            adapters: ComponentHealth::Starting,
            listeners: ComponentHealth::Starting,
        }
    }
}

impl RuntimeHealth {
    /// Check if the runtime is ready to serve requests.
    pub fn is_ready(&self) -> bool {
        matches!(
            (self.engine, self.adapters, self.listeners),
            (
                ComponentHealth::Healthy,
                ComponentHealth::Healthy,
                ComponentHealth::Healthy | ComponentHealth::Disabled
            )
        )
    }

    /// Check if the runtime is alive (not failed).
    pub fn is_alive(&self) -> bool {
        ![self.engine, self.adapters, self.listeners].contains(&ComponentHealth::Failed)
    }
}

/// Tessera runtime holding all component handles.
pub struct Runtime {
    config: Arc<Config>,

    /// Shared store engine.
    engine: Arc<Engine>,

    /// REST request handler, available once adapters are initialized.
    rest: Option<RestAdapter>,

    /// Redis listener, when configured.
    redis: Option<Arc<RedisService>>,

    health: RuntimeHealth,

    running: Arc<AtomicBool>,

    shutdown_tx: watch::Sender<bool>,

    shutdown_rx: watch::Receiver<bool>,
}

impl Runtime {
    /// Create a new runtime and its regions from the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let engine = Engine::from_config(&config).context("failed to create regions")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let health = RuntimeHealth {
            engine: ComponentHealth::Healthy,
            ..Default::default()
        };

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            rest: None,
            redis: None,
            health,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// REST handler for an embedding HTTP front-end.
    pub fn rest(&self) -> Option<&RestAdapter> {
        self.rest.as_ref()
    }

    /// Bound Redis address, once the listener is up.
    pub fn redis_addr(&self) -> Option<SocketAddr> {
        self.redis.as_ref().and_then(|r| r.local_addr())
    }

    pub fn health(&self) -> &RuntimeHealth {
        &self.health
    }

    pub fn is_ready(&self) -> bool {
        self.health.is_ready()
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Start adapters and listeners.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!(
            regions = self.engine.catalog().regions().len(),
            "starting Tessera runtime"
        );

        self.init_adapters();
        self.start_listeners().await?;

        self.running.store(true, Ordering::Release);
        tracing::info!("Tessera runtime started");
        Ok(())
    }

    fn init_adapters(&mut self) {
        tracing::debug!("initializing protocol adapters");

        self.rest = Some(RestAdapter::new(Arc::clone(&self.engine)));
        if let Some(ref redis) = self.config.listeners.redis {
            // Bind address was checked by Config::validate.
            if let Ok(bind_addr) = redis.bind.parse() {
                let config = RedisConfig::new(bind_addr, redis.region.clone());
                self.redis = Some(Arc::new(RedisService::new(config, Arc::clone(&self.engine))));
            }
        }

        self.health.adapters = ComponentHealth::Healthy;
        tracing::info!(redis = self.redis.is_some(), "protocol adapters initialized");
    }

    async fn start_listeners(&mut self) -> Result<()> {
        tracing::debug!("starting network listeners");

        match self.redis {
            Some(ref redis) => {
                if let Err(e) = redis.start().await {
                    self.health.listeners = ComponentHealth::Failed;
                    return Err(e).context("failed to start redis listener");
                }
                self.health.listeners = ComponentHealth::Healthy;
            }
            None => self.health.listeners = ComponentHealth::Disabled,
        }

        tracing::info!("network listeners started");
        Ok(())
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for shutdown signal.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// Run the runtime until ctrl-c or [`shutdown`](Self::shutdown).
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("shutdown signal received (SIGINT)");
            }
            _ = self.wait_for_shutdown() => {
                tracing::info!("shutdown requested by component");
            }
        }

        self.stop().await
    }

    /// Stop listeners and adapters.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("stopping Tessera runtime");
        self.running.store(false, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        self.health.listeners = ComponentHealth::Stopping;
        if let Some(redis) = self.redis.take() {
            redis.stop();
        }
        self.health.listeners = ComponentHealth::Stopped;

        self.health.adapters = ComponentHealth::Stopping;
        self.rest = None;
        self.health.adapters = ComponentHealth::Stopped;

        tracing::info!(
            used_memory = self.engine.catalog().accountant().used_memory(),
            "Tessera runtime stopped"
        );
        Ok(())
    }
}
