use std::sync::Arc;

use crate::config::ServerConfig;
use crate::trade::Trade;

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`.
///
/// The trade table is built once before the listener starts and never
/// mutated afterwards, so concurrent handlers read it without locks. Tests
/// construct it directly with fixture tables.
pub struct AppState {
    pub config: ServerConfig,
    pub table: Vec<Trade>,
}

impl AppState {
    pub fn new(config: ServerConfig, table: Vec<Trade>) -> Arc<Self> {
        Arc::new(Self { config, table })
    }
}
