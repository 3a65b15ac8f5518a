use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::AppError;
use crate::models::{Todo, UpdateTodoRequest};
use crate::store::{TodoStore, new_todo};

/// SQLite-backed store. Lists newest first.
#[derive(Debug, Clone)]
pub struct SqliteTodoStore {
    db: SqlitePool,
}

#[derive(Debug, FromRow)]
struct TodoRow {
    id: String,
    title: String,
    completed: bool,
    created_at: String,
}

impl TryFrom<TodoRow> for Todo {
    type Error = AppError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let created_at = parse_timestamp(&row.created_at).ok_or_else(|| {
            AppError::Internal(format!("invalid created_at for todo {}: {}", row.id, row.created_at))
        })?;
        Ok(Todo {
            id: row.id,
            title: row.title,
            completed: row.completed,
            created_at,
        })
    }
}

impl SqliteTodoStore {
    /// Open (creating if missing) the database at `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. Pinned to one connection that never
    /// expires, since each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(db: SqlitePool) -> Result<Self, AppError> {
        sqlx::migrate!("./migrations").run(&db).await?;
        Ok(Self { db })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

#[async_trait]
impl TodoStore for SqliteTodoStore {
    async fn list(&self) -> Result<Vec<Todo>, AppError> {
        let rows = sqlx::query_as::<_, TodoRow>(
            r#"
            SELECT id, title, completed, created_at
            FROM todos
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Todo::try_from).collect()
    }

    async fn create(&self, title: String) -> Result<Todo, AppError> {
        let todo = new_todo(title);

        sqlx::query(
            r#"
            INSERT INTO todos (id, title, completed, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&todo.id)
        .bind(&todo.title)
        .bind(todo.completed)
        .bind(format_timestamp(&todo.created_at))
        .execute(&self.db)
        .await?;

        debug!("inserted todo {}", todo.id);
        Ok(todo)
    }

    async fn update(&self, id: &str, req: UpdateTodoRequest) -> Result<Option<Todo>, AppError> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, TodoRow>(
            "SELECT id, title, completed, created_at FROM todos WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut current = Todo::try_from(row)?;
        current.apply(req);

        sqlx::query(
            r#"
            UPDATE todos
            SET title = ?1,
                completed = ?2
            WHERE id = ?3
            "#,
        )
        .bind(&current.title)
        .bind(current.completed)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(current))
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(result > 0)
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

/// Fixed-width UTC form so lexical order matches chronological order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let b = a + chrono::Duration::microseconds(1500);
        let (fa, fb) = (format_timestamp(&a), format_timestamp(&b));
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
        assert_eq!(parse_timestamp(&fb), Some(b));
    }

    #[tokio::test]
    async fn rejects_corrupt_timestamps() {
        let store = SqliteTodoStore::in_memory().await.unwrap();
        sqlx::query("INSERT INTO todos (id, title, completed, created_at) VALUES ('x', 't', 0, 'yesterday')")
            .execute(store.pool())
            .await
            .unwrap();

        assert!(matches!(store.list().await, Err(AppError::Internal(_))));
    }
}
