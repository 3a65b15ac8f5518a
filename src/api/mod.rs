use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use axum::routing::put;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::cors::CorsLayer;

use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/{id}", put(update_todo).delete(delete_todo))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, AppError> {
    let todos = state.todos.list().await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(state): State<AppState>,
    payload: Result<Json<NewTodoRequest>, JsonRejection>
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let Json(req) = payload?;
    let todo = state.todos.create(req).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTodoRequest>, JsonRejection>
) -> Result<Json<Todo>, AppError> {
    let Json(req) = payload?;
    let todo = state.todos.update(&id, req).await?;
    Ok(Json(todo))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>
) -> Result<Json<DeleteResponse>, AppError> {
    let response = state.todos.delete(&id).await?;
    Ok(Json(response))
}
