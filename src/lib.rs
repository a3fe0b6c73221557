//! Tessera - in-memory region store with REST and Redis front-ends.
//!
//! Tessera keeps named regions of key/value entries in memory. Values are
//! either JSON documents or raw byte strings. All writes funnel through a
//! single compare-and-set path so that conditional updates on one key are
//! serialized, while an OQL-style query evaluator reads documents across
//! a region.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Client Protocols                         │
//! │          REST (regions, keys, queries)   │   Redis RESP         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Protocol Adapters                          │
//! │          request routing, status mapping, arity checks          │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Engine                               │
//! │     Region Catalog │ CAS Coordinator │ Query Service            │
//! └─────────────────────────────────────────────────────────────────┘
//!                                  │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Entry Store                             │
//! │          Regions │ Per-key Locks │ Memory Accountant            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! ## Core
//! - [`core::config`] - Configuration parsing and validation
//! - [`core::runtime`] - Main runtime orchestration
//! - [`core::error`] - Error types and adapter-specific mapping
//!
//! ## Store
//! - [`store::region`] - Region entries and mutation
//! - [`store::cas`] - Compare-and-set coordinator
//! - [`store::memory`] - Memory accounting
//!
//! ## Query
//! - [`query::parser`] - Query text to AST
//! - [`query::eval`] - Evaluation against a region
//! - [`query::registry`] - Named prepared queries
//!
//! ## Adapters
//! - [`adapters::rest`] - REST resource handler
//! - [`adapters::redis`] - Redis RESP listener
//!
//! ## CLI
//! - [`cli::commands`] - CLI command implementations

// Core infrastructure
pub mod core;

// Entry store
pub mod store;

// Query evaluation
pub mod query;

// Engine facade
pub mod engine;

// Protocol adapters
pub mod adapters;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, error, runtime};
pub use engine::Engine;
pub use error::{TesseraError, TesseraResult};
