use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{DeleteResponse, NewTodoRequest, Todo, UpdateTodoRequest};
use crate::store::TodoStore;

/// Validates requests and hands them to the store.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn list(&self) -> Result<Vec<Todo>, AppError> {
        let todos = self.store.list().await?;
        debug!("listed {} todos", todos.len());
        Ok(todos)
    }

    pub async fn create(&self, req: NewTodoRequest) -> Result<Todo, AppError> {
        let title = match req.title {
            Some(title) if !is_blank(&title) => title,
            _ => return Err(AppError::Validation("title required".to_string())),
        };

        let todo = self.store.create(title).await?;
        info!("created todo {}", todo.id);
        Ok(todo)
    }

    pub async fn update(&self, id: &str, req: UpdateTodoRequest) -> Result<Todo, AppError> {
        if req.title.as_deref().is_some_and(is_blank) {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }

        let todo = self
            .store
            .update(id, req)
            .await?
            .ok_or(AppError::NotFound)?;
        info!("updated todo {}", todo.id);
        Ok(todo)
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteResponse, AppError> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound);
        }
        info!("deleted todo {}", id);
        Ok(DeleteResponse {
            message: "Todo deleted".to_string(),
        })
    }
}

fn is_blank(title: &str) -> bool {
    title.trim().is_empty()
}
