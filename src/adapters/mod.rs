//! Protocol adapters.
//!
//! Adapters translate external protocol requests into store operations on a
//! shared [`Engine`](crate::engine::Engine):
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │                 Protocol Adapters                 │
//! ├─────────────────────────┬─────────────────────────┤
//! │  REST (request handler) │  Redis (TCP listener)   │
//! │                         │                         │
//! │  - regions / keys       │  - GET/SET [NX|XX]      │
//! │  - PUT REPLACE / CAS    │  - APPEND/STRLEN        │
//! │  - queries              │  - DEL/EXISTS/INFO      │
//! └─────────────────────────┴─────────────────────────┘
//! ```
//!
//! - [`rest`] - JSON request handler for an external HTTP front-end
//! - [`redis`] - Redis RESP2 adapter

pub mod redis;
pub mod rest;

/// Adapter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Adapter is created but not started.
    Created,
    /// Adapter is starting up.
    Starting,
    /// Adapter is running and accepting connections.
    Running,
    /// Adapter is shutting down gracefully.
    ShuttingDown,
    /// Adapter has stopped.
    Stopped,
    /// Adapter encountered a fatal error.
    Failed,
}

/// Adapter health status.
#[derive(Debug, Clone)]
pub struct AdapterHealth {
    /// Current state.
    pub state: AdapterState,

    /// Number of active connections.
    pub active_connections: usize,

    /// Total requests processed.
    pub total_requests: u64,

    /// Failed requests.
    pub failed_requests: u64,

    /// Last error message (if any).
    pub last_error: Option<String>,
}
