//! HTTP handler definitions for the `tsid` server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod whoami;

pub use health::{health_handler, liveness_handler};
pub use whoami::whoami_handler;

use std::sync::Arc;
use std::time::Instant;

use super::NetworkConfig;

/// Shared application state passed to axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Network configuration (bind address, request timeout).
    pub config: Arc<NetworkConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
