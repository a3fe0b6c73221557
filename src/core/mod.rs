//! Core runtime infrastructure.
//!
//! - [`config`] - Configuration parsing and validation
//! - [`runtime`] - Main runtime orchestration
//! - [`error`] - Error types and adapter-specific mapping

pub mod config;
pub mod error;
pub mod runtime;
