use std::sync::Arc;

use crate::config::Config;
use crate::source::snapshot::SnapshotStore;
use crate::source::DataSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable adapter. Default: `HttpDataSource`; tests swap in an in-memory one.
    pub source: Arc<dyn DataSource>,
    pub snapshots: Arc<SnapshotStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(source: Arc<dyn DataSource>, config: Config) -> Self {
        Self {
            source,
            snapshots: Arc::new(SnapshotStore::new()),
            config,
        }
    }
}
