pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Todo, UpdateTodoRequest};

pub use memory::MemoryTodoStore;
pub use sqlite::SqliteTodoStore;

/// Persistence for the todo collection.
///
/// Stores do not validate input. Unknown ids are reported as `Ok(None)` /
/// `Ok(false)` so the service layer decides how to surface them.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Todo>, AppError>;
    async fn create(&self, title: String) -> Result<Todo, AppError>;
    async fn update(&self, id: &str, req: UpdateTodoRequest) -> Result<Option<Todo>, AppError>;
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Fresh record with a new id. `created_at` is truncated to microseconds,
/// the precision the SQLite store keeps.
pub(crate) fn new_todo(title: String) -> Todo {
    Todo {
        id: Uuid::new_v4().to_string(),
        title,
        completed: false,
        created_at: Utc::now().trunc_subsecs(6),
    }
}
