//! Local cache of the todo collection kept in step with the server.
//!
//! Every cache change happens after the server has confirmed the
//! operation; a failed call leaves the cache as it was. Failures are both
//! recorded in [`SyncState::error`] and returned to the caller.
//!
//! Concurrent calls are ordered by ticket, drawn when a call is issued.
//! An update response is dropped if a later-issued mutation for that id has
//! already been applied, or if the id has left the cache in the meantime.
//! A fetched list replaces the cache except for records mutated by calls
//! issued after the list was requested; those keep their cached outcome,
//! removals included. A list older than one already applied is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::client::api::TodoApi;
use crate::client::error::ClientError;
use crate::models::{Todo, UpdateTodoRequest};

/// What presentation code observes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Newest additions first.
    pub todos: Vec<Todo>,
    /// Raised only while the whole collection is being fetched.
    pub loading: bool,
    /// Last failure message; overwritten, never accumulated.
    pub error: Option<String>,
}

/// Latest mutation applied to one id.
#[derive(Debug, Clone, Copy)]
struct Mark {
    ticket: u64,
    removed: bool,
}

#[derive(Default)]
struct Inner {
    state: SyncState,
    activated: bool,
    marks: HashMap<String, Mark>,
    /// Fetches in flight; `loading` is raised while non-zero.
    fetching: usize,
    /// Ticket of the last list applied to the cache.
    fetched: u64,
}

pub struct TodoSynchronizer<A> {
    api: A,
    inner: Mutex<Inner>,
    tx: watch::Sender<SyncState>,
    tickets: AtomicU64,
}

impl<A: TodoApi> TodoSynchronizer<A> {
    pub fn new(api: A) -> Self {
        let (tx, _rx) = watch::channel(SyncState::default());
        Self {
            api,
            inner: Mutex::new(Inner::default()),
            tx,
            tickets: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Receives a fresh [`SyncState`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SyncState {
        self.tx.borrow().clone()
    }

    /// Initial load. Only the first call fetches.
    pub async fn activate(&self) -> Result<(), ClientError> {
        let first = self
            .commit(|inner| !std::mem::replace(&mut inner.activated, true))
            .await;
        if !first {
            return Ok(());
        }
        self.refetch().await
    }

    /// Replace the cache with the server's collection.
    pub async fn refetch(&self) -> Result<(), ClientError> {
        let ticket = self.ticket();
        self.commit(|inner| {
            inner.fetching += 1;
            inner.state.loading = true;
        })
        .await;

        let result = self.api.list().await;

        self.commit(|inner| {
            inner.fetching -= 1;
            inner.state.loading = inner.fetching > 0;
            match &result {
                Ok(_) if ticket < inner.fetched => {
                    debug!("dropping list {} older than applied list {}", ticket, inner.fetched)
                }
                Ok(todos) => {
                    inner.state.todos = reconcile(&inner.state.todos, todos, &inner.marks, ticket);
                    inner.marks.retain(|_, mark| mark.ticket > ticket);
                    inner.fetched = ticket;
                    inner.state.error = None;
                }
                Err(err) => inner.state.error = Some(err.to_string()),
            }
        })
        .await;

        match result {
            Ok(todos) => {
                debug!("fetched {} todos", todos.len());
                Ok(())
            }
            Err(err) => Err(self.report("fetch", err)),
        }
    }

    /// Create a todo and put it at the front of the cache.
    pub async fn add(&self, title: &str) -> Result<Todo, ClientError> {
        let ticket = self.ticket();
        let todo = match self.api.create(title).await {
            Ok(todo) => todo,
            Err(err) => return Err(self.fail("add", err).await),
        };

        self.commit(|inner| {
            inner.marks.insert(todo.id.clone(), Mark { ticket, removed: false });
            match inner.state.todos.iter_mut().find(|t| t.id == todo.id) {
                // already picked up by a refetch that raced this call
                Some(existing) => *existing = todo.clone(),
                None => inner.state.todos.insert(0, todo.clone()),
            }
            inner.state.error = None;
        })
        .await;

        Ok(todo)
    }

    /// Apply a partial update and swap in the server's copy of the record.
    pub async fn update(&self, id: &str, req: UpdateTodoRequest) -> Result<Todo, ClientError> {
        let ticket = self.ticket();
        let todo = match self.api.update(id, &req).await {
            Ok(todo) => todo,
            Err(err) => return Err(self.fail("update", err).await),
        };

        self.commit(|inner| {
            let stale = inner.marks.get(id).is_some_and(|mark| mark.ticket > ticket);
            match inner.state.todos.iter_mut().find(|t| t.id == id) {
                Some(existing) if !stale => {
                    *existing = todo.clone();
                    inner.marks.insert(id.to_string(), Mark { ticket, removed: false });
                }
                Some(_) => debug!("dropping stale update for todo {}", id),
                None => debug!("dropping update for todo {} no longer cached", id),
            }
            inner.state.error = None;
        })
        .await;

        Ok(todo)
    }

    /// Flip `completed` on a cached todo.
    pub async fn toggle(&self, id: &str) -> Result<Todo, ClientError> {
        let completed = self
            .tx
            .borrow()
            .todos
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.completed);

        match completed {
            Some(completed) => self.update(id, UpdateTodoRequest::completed(!completed)).await,
            None => Err(self.fail("toggle", ClientError::NotFound).await),
        }
    }

    pub async fn remove(&self, id: &str) -> Result<(), ClientError> {
        let ticket = self.ticket();
        if let Err(err) = self.api.delete(id).await {
            return Err(self.fail("remove", err).await);
        }

        self.commit(|inner| {
            inner.state.todos.retain(|t| t.id != id);
            inner.marks.insert(id.to_string(), Mark { ticket, removed: true });
            inner.state.error = None;
        })
        .await;

        Ok(())
    }

    fn ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Mutate under the lock and publish the result.
    async fn commit<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().await;
        let out = f(&mut inner);
        self.tx.send_replace(inner.state.clone());
        out
    }

    async fn fail(&self, op: &str, err: ClientError) -> ClientError {
        self.commit(|inner| inner.state.error = Some(err.to_string()))
            .await;
        self.report(op, err)
    }

    fn report(&self, op: &str, err: ClientError) -> ClientError {
        warn!("{} failed: {}", op, err);
        err
    }
}

/// Merge a list requested at `since` into the cache. Records mutated after
/// `since` keep their cached state; records added after it and missing
/// from the list stay at the front.
fn reconcile(
    cached: &[Todo],
    listed: &[Todo],
    marks: &HashMap<String, Mark>,
    since: u64,
) -> Vec<Todo> {
    let newer = |id: &str| marks.get(id).copied().filter(|mark| mark.ticket > since);

    let mut todos: Vec<Todo> = cached
        .iter()
        .filter(|todo| newer(&todo.id).is_some_and(|mark| !mark.removed))
        .filter(|todo| listed.iter().all(|l| l.id != todo.id))
        .cloned()
        .collect();

    for todo in listed {
        match newer(&todo.id) {
            Some(mark) if mark.removed => {}
            Some(_) => {
                let current = cached.iter().find(|c| c.id == todo.id).unwrap_or(todo);
                todos.push(current.clone());
            }
            None => todos.push(todo.clone()),
        }
    }
    todos
}
