use std::sync::Arc;

use crate::services::TodoService;
use crate::store::TodoStore;

#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}

impl AppState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self {
            todos: TodoService::new(store),
        }
    }
}
