//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. It holds only values fixed at startup; each scrape
//! builds its own snapshot and registry.

use package_exporter::{Collector, CommandRunner};
use std::sync::Arc;

use crate::config::Config;
use crate::health_stats::HealthStats;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub config: Arc<Config>,
    /// Selected once at startup, never re-evaluated.
    pub collector: Collector,
    pub runner: Arc<dyn CommandRunner>,
    pub health_stats: Arc<HealthStats>,
}
