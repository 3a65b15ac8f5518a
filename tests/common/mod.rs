#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use todo_sync::api::router;
use todo_sync::client::{ClientError, TodoApi};
use todo_sync::models::{DeleteResponse, Todo, UpdateTodoRequest};
use todo_sync::state::AppState;
use todo_sync::store::{MemoryTodoStore, TodoStore};

/// Serve the router on an ephemeral port and return its base URL.
pub async fn spawn_server(store: Arc<dyn TodoStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = router(AppState::new(store));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub async fn spawn_memory_server() -> String {
    spawn_server(Arc::new(MemoryTodoStore::new())).await
}

/// Scripted stand-in for the server.
///
/// Mutations are applied to `todos` as soon as the call arrives, and a list
/// snapshots `todos` on arrival. When a gate is set for updates or lists,
/// the response is then held until that gate opens.
#[derive(Default)]
pub struct FakeApi {
    pub todos: Mutex<Vec<Todo>>,
    fail_with: Mutex<Option<ClientError>>,
    update_gate: Mutex<Option<Arc<Notify>>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    next_id: AtomicUsize,
    pub calls: AtomicUsize,
    pub updates_seen: AtomicUsize,
    pub lists_seen: AtomicUsize,
}

impl FakeApi {
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let api = Self::default();
        *api.todos.lock().unwrap() = todos;
        api
    }

    /// Every following call fails with `err` until `succeed` is called.
    pub fn fail(&self, err: ClientError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }

    pub fn succeed(&self) {
        *self.fail_with.lock().unwrap() = None;
    }

    /// Hold the next update response(s) until the returned handle is notified.
    pub fn gate_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn ungate_updates(&self) {
        *self.update_gate.lock().unwrap() = None;
    }

    /// Hold list responses issued from now on until the returned handle is
    /// notified. Each call replaces the gate for later lists only.
    pub fn gate_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn ungate_lists(&self) {
        *self.list_gate.lock().unwrap() = None;
    }

    pub fn server_todos(&self) -> Vec<Todo> {
        self.todos.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub fn todo(id: &str, title: &str, completed: bool) -> Todo {
    Todo {
        id: id.to_string(),
        title: title.to_string(),
        completed,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl TodoApi for FakeApi {
    async fn list(&self) -> Result<Vec<Todo>, ClientError> {
        self.check()?;
        let snapshot = self.server_todos();
        self.lists_seen.fetch_add(1, Ordering::SeqCst);

        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(snapshot)
    }

    async fn create(&self, title: &str) -> Result<Todo, ClientError> {
        self.check()?;
        if title.trim().is_empty() {
            return Err(ClientError::Validation("title required".to_string()));
        }
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let created = todo(&id, title, false);
        // the fake "server" appends, so its order differs from the cache's
        self.todos.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, req: &UpdateTodoRequest) -> Result<Todo, ClientError> {
        self.check()?;
        let updated = {
            let mut todos = self.todos.lock().unwrap();
            let existing = todos
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(ClientError::NotFound)?;
            existing.apply(req.clone());
            existing.clone()
        };
        self.updates_seen.fetch_add(1, Ordering::SeqCst);

        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<DeleteResponse, ClientError> {
        self.check()?;
        let mut todos = self.todos.lock().unwrap();
        let index = todos
            .iter()
            .position(|t| t.id == id)
            .ok_or(ClientError::NotFound)?;
        todos.remove(index);
        Ok(DeleteResponse {
            message: "Todo deleted".to_string(),
        })
    }
}
