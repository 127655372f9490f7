//! Application state

use std::sync::Arc;

use todo_core::task::{SqliteTaskStore, TaskService};

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    task_service: TaskService<SqliteTaskStore>,
}

impl AppState {
    /// Connect to the configured database and wire up the task service
    pub async fn new(config: &ServerConfig) -> todo_core::Result<Self> {
        if config.database_url.is_none() {
            tokio::fs::create_dir_all(&config.data_dir).await?;
        }

        let store = SqliteTaskStore::connect(&config.database_url(), config.max_connections).await?;
        if config.seed_demo {
            store.seed_demo().await?;
        }

        Ok(Self::with_store(store))
    }

    pub fn with_store(store: SqliteTaskStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                task_service: TaskService::new(store),
            }),
        }
    }

    /// Get reference to the task service
    pub fn task_service(&self) -> &TaskService<SqliteTaskStore> {
        &self.inner.task_service
    }

    pub fn task_store(&self) -> &SqliteTaskStore {
        self.inner.task_service.store()
    }
}
