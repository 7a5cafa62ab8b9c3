use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::pipeline::orchestrator::BatchOrchestrator;
use crate::services::storage::LocalStorage;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<LocalStorage>,
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Projects with a batch run in flight; one run per project at a time.
    pub runs_in_flight: Arc<Mutex<HashSet<i64>>>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: AppConfig,
        storage: LocalStorage,
        orchestrator: BatchOrchestrator,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            storage: Arc::new(storage),
            orchestrator: Arc::new(orchestrator),
            runs_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}
