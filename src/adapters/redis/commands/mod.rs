//! Redis command handlers.
//!
//! Every handler operates on the single region the listener is bound to.
//! Writes go through the region's CAS coordinator so they serialize with
//! REST writes to the same key.
//!
//! | Category | Commands |
//! |----------|----------|
//! | Strings | GET, SET [NX\|XX], APPEND, STRLEN |
//! | Keys | DEL, EXISTS |
//! | Server | PING, ECHO, QUIT, DBSIZE, FLUSHDB, FLUSHALL, INFO |

pub mod keys;
pub mod server;
pub mod strings;

use crate::adapters::redis::{RedisCommand, RedisError, RedisValue};
use crate::engine::Engine;
use crate::store::cas::CasCoordinator;
use crate::store::region::Region;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Result of command execution.
pub type CommandResult = Result<RedisValue, RedisError>;

/// Command execution context.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Connection ID.
    pub connection_id: u64,
}

impl CommandContext {
    pub fn new(connection_id: u64) -> Self {
        Self { connection_id }
    }
}

/// Command handler trait.
///
/// Each command type implements this trait to handle execution.
pub trait CommandHandler: Send + Sync {
    /// Execute the command.
    ///
    /// Takes owned data so the returned future is `'static`.
    fn execute(
        &self,
        ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> Pin<Box<dyn Future<Output = CommandResult> + Send>>;

    /// Get the command name.
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required.
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited).
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether this command is a write operation.
    fn is_write(&self) -> bool {
        false
    }
}

/// Shared state for command execution.
pub struct CommandState {
    engine: Arc<Engine>,

    /// Region holding Redis keys.
    region: String,

    server_info: Arc<ServerInfo>,
}

impl CommandState {
    pub fn new(engine: Arc<Engine>, region: impl Into<String>, server_info: Arc<ServerInfo>) -> Self {
        Self {
            engine,
            region: region.into(),
            server_info,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn region_name(&self) -> &str {
        &self.region
    }

    /// The bound region.
    pub fn region(&self) -> Result<Arc<Region>, RedisError> {
        Ok(self.engine.catalog().region(&self.region)?)
    }

    /// Coordinator for writes to the bound region.
    pub fn coordinator(&self) -> Result<CasCoordinator, RedisError> {
        Ok(self.engine.catalog().coordinator(&self.region)?)
    }

    pub fn server_info(&self) -> &Arc<ServerInfo> {
        &self.server_info
    }
}

/// Server information reported by INFO.
#[derive(Debug)]
pub struct ServerInfo {
    /// Server version string.
    pub version: String,

    /// Redis compatibility version.
    pub redis_version: String,

    /// Server mode.
    pub mode: String,

    pub os: String,

    pub arch: String,

    pub pid: u32,

    started: Instant,

    /// Total connections received.
    pub total_connections: AtomicU64,

    /// Currently open connections.
    pub connected_clients: AtomicU64,

    /// Total commands processed.
    pub total_commands: AtomicU64,
}

impl ServerInfo {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            redis_version: "7.0.0".to_string(), // Compatibility version
            mode: "standalone".to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            pid: std::process::id(),
            started: Instant::now(),
            total_connections: AtomicU64::new(0),
            connected_clients: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Record a new connection.
    pub fn connection_opened(&self) -> u64 {
        self.connected_clients.fetch_add(1, Ordering::Relaxed);
        self.total_connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn connection_closed(&self) {
        self.connected_clients.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a command.
    pub fn command_executed(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Command router.
///
/// Routes commands to their handlers by name.
pub struct CommandRouter {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRouter {
    /// Create a new command router with all handlers registered.
    pub fn new() -> Self {
        let mut router = Self {
            handlers: HashMap::new(),
        };
        router.register_all();
        router
    }

    fn register_all(&mut self) {
        // String commands
        self.register(Arc::new(strings::GetHandler));
        self.register(Arc::new(strings::SetHandler));
        self.register(Arc::new(strings::AppendHandler));
        self.register(Arc::new(strings::StrLenHandler));

        // Key commands
        self.register(Arc::new(keys::DelHandler));
        self.register(Arc::new(keys::ExistsHandler));

        // Server commands
        self.register(Arc::new(server::PingHandler));
        self.register(Arc::new(server::EchoHandler));
        self.register(Arc::new(server::QuitHandler));
        self.register(Arc::new(server::DbSizeHandler));
        self.register(Arc::new(server::FlushDbHandler));
        self.register(Arc::new(server::FlushAllHandler));
        self.register(Arc::new(server::InfoHandler));
    }

    fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name().to_uppercase(), handler);
    }

    /// Get a handler for a command.
    pub fn get(&self, command: &str) -> Option<&Arc<dyn CommandHandler>> {
        self.handlers.get(&command.to_uppercase())
    }

    /// Execute a command.
    pub async fn execute(
        &self,
        ctx: CommandContext,
        cmd: RedisCommand,
        state: Arc<CommandState>,
    ) -> CommandResult {
        let handler = match self.get(&cmd.name) {
            Some(h) => h,
            None => {
                let preview = cmd
                    .args
                    .iter()
                    .take(3)
                    .map(|a| format!("'{}'", String::from_utf8_lossy(a)))
                    .collect::<Vec<_>>()
                    .join(" ");
                return Err(RedisError::generic(format!(
                    "unknown command '{}', with args beginning with: {}",
                    cmd.name.to_lowercase(),
                    preview
                )));
            }
        };

        if cmd.argc() < handler.min_args() {
            return Err(RedisError::wrong_arity(&cmd.name));
        }
        if let Some(max) = handler.max_args() {
            if cmd.argc() > max {
                return Err(RedisError::wrong_arity(&cmd.name));
            }
        }

        state.server_info().command_executed();
        tracing::trace!(
            conn = ctx.connection_id,
            command = %cmd.name,
            write = handler.is_write(),
            "executing command"
        );
        handler.execute(ctx, cmd, state).await
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}
