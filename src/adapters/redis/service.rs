//! Redis adapter service.
//!
//! Accepts TCP connections, decodes RESP2 commands and dispatches them to the
//! command router. Replies are written in request order, so pipelined
//! commands are answered in sequence.

use super::commands::{CommandContext, CommandRouter, CommandState, ServerInfo};
use super::protocol::{ParseResult, RespEncoder, RespParser};
use super::{RedisCommand, RedisError, RedisValue};
use crate::adapters::{AdapterHealth, AdapterState};
use crate::core::error::{TesseraError, TesseraResult};
use crate::engine::Engine;
use bytes::{Buf, BytesMut};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Redis adapter configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Bind address; port 0 picks a free port.
    pub bind_addr: SocketAddr,

    /// Region holding Redis keys.
    pub region: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl RedisConfig {
    pub fn new(bind_addr: SocketAddr, region: impl Into<String>) -> Self {
        Self {
            bind_addr,
            region: region.into(),
            max_connections: 10_000,
        }
    }
}

/// Redis adapter.
pub struct RedisService {
    config: RedisConfig,

    state: RwLock<AdapterState>,

    router: CommandRouter,

    command_state: Arc<CommandState>,

    /// Address actually bound once started.
    local_addr: RwLock<Option<SocketAddr>>,

    active_connections: AtomicU64,

    total_requests: AtomicU64,

    failed_requests: AtomicU64,

    shutdown_tx: watch::Sender<bool>,

    shutdown_rx: watch::Receiver<bool>,
}

impl RedisService {
    pub fn new(config: RedisConfig, engine: Arc<Engine>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let command_state = Arc::new(CommandState::new(
            engine,
            config.region.clone(),
            Arc::new(ServerInfo::new()),
        ));

        Self {
            config,
            state: RwLock::new(AdapterState::Created),
            router: CommandRouter::new(),
            command_state,
            local_addr: RwLock::new(None),
            active_connections: AtomicU64::new(0),
            total_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn name(&self) -> &'static str {
        "redis"
    }

    pub fn state(&self) -> AdapterState {
        *self.state.read()
    }

    pub fn health(&self) -> AdapterHealth {
        AdapterHealth {
            state: self.state(),
            active_connections: self.active_connections.load(Ordering::Relaxed) as usize,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            last_error: None,
        }
    }

    pub fn command_state(&self) -> &Arc<CommandState> {
        &self.command_state
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.read()
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// Fails when the bound region does not exist or the address cannot be
    /// bound. Returns the bound address.
    pub async fn start(self: &Arc<Self>) -> TesseraResult<SocketAddr> {
        *self.state.write() = AdapterState::Starting;

        let started = async {
            self.command_state.engine().catalog().region(&self.config.region)?;
            let listener = TcpListener::bind(self.config.bind_addr)
                .await
                .map_err(|e| TesseraError::internal(format!("redis bind {}: {}", self.config.bind_addr, e)))?;
            let addr = listener
                .local_addr()
                .map_err(|e| TesseraError::internal(e.to_string()))?;
            Ok::<_, TesseraError>((listener, addr))
        }
        .await;

        let (listener, addr) = match started {
            Ok(bound) => bound,
            Err(e) => {
                *self.state.write() = AdapterState::Failed;
                return Err(e);
            }
        };

        *self.local_addr.write() = Some(addr);
        *self.state.write() = AdapterState::Running;
        tracing::info!(addr = %addr, region = %self.config.region, "redis listener started");

        tokio::spawn(Arc::clone(self).accept_loop(listener));
        Ok(addr)
    }

    /// Stop accepting connections and close open ones.
    pub fn stop(&self) {
        *self.state.write() = AdapterState::ShuttingDown;
        let _ = self.shutdown_tx.send(true);
        *self.state.write() = AdapterState::Stopped;
        tracing::info!("redis listener stopped");
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => {
                            if self.active_connections.load(Ordering::Relaxed) as usize
                                >= self.config.max_connections
                            {
                                tracing::warn!(remote = %remote_addr, "connection limit reached");
                                reject(stream).await;
                                continue;
                            }
                            let connection_id =
                                self.command_state.server_info().connection_opened();
                            tokio::spawn(Arc::clone(&self).handle_connection(
                                stream,
                                remote_addr,
                                connection_id,
                            ));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "redis accept failed");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Handle a single connection.
    ///
    /// Processes commands until the peer closes the connection, sends QUIT,
    /// sends malformed input, or the service stops.
    pub async fn handle_connection(
        self: Arc<Self>,
        mut stream: TcpStream,
        remote_addr: SocketAddr,
        connection_id: u64,
    ) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(conn = connection_id, remote = %remote_addr, "redis connection opened");

        let mut parser = RespParser::new();
        let mut buffer = BytesMut::with_capacity(4096);
        let mut out = Vec::with_capacity(4096);
        let mut shutdown_rx = self.shutdown_rx.clone();

        'conn: loop {
            tokio::select! {
                result = stream.read_buf(&mut buffer) => {
                    match result {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {}
                    }

                    let mut close = false;
                    out.clear();
                    while !buffer.is_empty() && !close {
                        match parser.parse(&buffer) {
                            ParseResult::Ok(value, consumed) => {
                                buffer.advance(consumed);
                                let (response, quit) = self.dispatch(connection_id, value).await;
                                RespEncoder::encode_into(&response, &mut out);
                                close = quit;
                            }
                            ParseResult::Incomplete => break,
                            ParseResult::Error(e) => {
                                tracing::debug!(conn = connection_id, error = %e, "protocol error");
                                let error = RedisValue::err(format!("Protocol error: {}", e));
                                RespEncoder::encode_into(&error, &mut out);
                                close = true;
                            }
                        }
                    }

                    if !out.is_empty() && stream.write_all(&out).await.is_err() {
                        break 'conn;
                    }
                    if close {
                        break 'conn;
                    }
                }

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
        self.command_state.server_info().connection_closed();
        tracing::debug!(conn = connection_id, "redis connection closed");
    }

    /// Execute one decoded request. Returns the reply and whether to close.
    async fn dispatch(&self, connection_id: u64, value: RedisValue) -> (RedisValue, bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let cmd = match value {
            RedisValue::Array(items) => RedisCommand::from_array(items),
            _ => Err(RedisError::syntax()),
        };
        let cmd = match cmd {
            Ok(cmd) => cmd,
            Err(e) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                return (RedisValue::Error(e), false);
            }
        };

        let quit = cmd.name == "QUIT";
        let result = self
            .router
            .execute(
                CommandContext::new(connection_id),
                cmd,
                Arc::clone(&self.command_state),
            )
            .await;

        match result {
            Ok(reply) => (reply, quit),
            Err(e) => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
                (RedisValue::Error(e), false)
            }
        }
    }
}

async fn reject(mut stream: TcpStream) {
    let reply = RespEncoder::encode(&RedisValue::err("max number of clients reached"));
    let _ = stream.write_all(&reply).await;
}
