use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Todo, UpdateTodoRequest};
use crate::store::{TodoStore, new_todo};

/// Process-local store. Lists in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTodoStore {
    todos: RwLock<Vec<Todo>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn list(&self) -> Result<Vec<Todo>, AppError> {
        Ok(self.todos.read().await.clone())
    }

    async fn create(&self, title: String) -> Result<Todo, AppError> {
        let todo = new_todo(title);
        self.todos.write().await.push(todo.clone());
        Ok(todo)
    }

    async fn update(&self, id: &str, req: UpdateTodoRequest) -> Result<Option<Todo>, AppError> {
        let mut todos = self.todos.write().await;
        let Some(todo) = todos.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        todo.apply(req);
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut todos = self.todos.write().await;
        match todos.iter().position(|t| t.id == id) {
            Some(index) => {
                todos.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
