//! Client side of the todo API: an HTTP binding and a synchronizer that
//! keeps a local cache in step with the server.

pub mod api;
pub mod error;
pub mod sync;

pub use api::{HttpTodoApi, TodoApi};
pub use error::ClientError;
pub use sync::{SyncState, TodoSynchronizer};
