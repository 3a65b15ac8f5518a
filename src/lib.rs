pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::store::{MemoryTodoStore, SqliteTodoStore, TodoStore};

/// Pick the store named by the configuration.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn TodoStore>, AppError> {
    let store: Arc<dyn TodoStore> = match &config.database_url {
        Some(url) => {
            info!("opening database {}", url);
            Arc::new(SqliteTodoStore::connect(url).await?)
        }
        None => Arc::new(MemoryTodoStore::new()),
    };
    info!("using {} store", store.backend());
    Ok(store)
}
