pub mod todo;

pub use todo::{DeleteResponse, HealthResponse, NewTodoRequest, Todo, UpdateTodoRequest};
