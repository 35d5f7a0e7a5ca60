// Application state module
// Shared, read-mostly state handed to every connection

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::types::Config;
use crate::handler::RouteTable;

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,

    /// Connections currently being served
    pub active_connections: Arc<AtomicUsize>,
}

impl AppState {
    /// Create `AppState` serving the default route table
    pub fn new(config: &Config) -> Self {
        Self::with_routes(config, RouteTable::default_routes())
    }

    pub fn with_routes(config: &Config, routes: RouteTable) -> Self {
        Self {
            config: config.clone(),
            routes,
            cached_access_log: AtomicBool::new(config.logging.access_log),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
