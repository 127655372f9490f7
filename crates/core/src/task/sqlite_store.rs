//! SQLite-backed task storage
//!
//! Stores tasks in a single `tasks` table through an sqlx connection pool.
//! Every query is written once, generic over the executor, so the pool and
//! an open transaction run exactly the same SQL.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor, Transaction};
use tokio::sync::Mutex;

use super::model::{Task, TaskCriterion, TaskStatus};
use super::repository::{TaskRepository, TaskStore, TaskTransaction};
use crate::{Error, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    summary     VARCHAR(256) NOT NULL,
    description TEXT,
    status      VARCHAR(16)  NOT NULL
)
"#;

const DEMO_TASKS: [(&str, &str, TaskStatus); 2] = [
    ("Spring Boot を学ぶ", "TODO アプリを作る", TaskStatus::Done),
    ("Spring Security を学ぶ", "ログイン機能を作る", TaskStatus::Todo),
];

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    summary: String,
    description: Option<String>,
    status: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = Error;

    fn try_from(row: TaskRow) -> Result<Self> {
        let status = TaskStatus::from_str(&row.status).map_err(|_| {
            Error::Storage(format!(
                "Task {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Task {
            id: Some(row.id),
            summary: row.summary,
            description: row.description,
            status,
        })
    }
}

/// Pool-backed task store
#[derive(Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Connect using a `sqlite:` URL, creating the database file if missing,
    /// and make sure the schema exists.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        Self::connect_with(options, max_connections).await
    }

    /// Open (or create) a database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        Self::connect_with(options, 5).await
    }

    async fn connect_with(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create the `tasks` table if it does not exist
    pub async fn init(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert the demo tasks when the table is empty.
    /// Returns how many rows were inserted.
    pub async fn seed_demo(&self) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&mut *tx)
            .await?;
        if count > 0 {
            return Ok(0);
        }

        for (summary, description, status) in DEMO_TASKS {
            let task = Task::new(summary)
                .with_description(description)
                .with_status(status);
            insert_task(&mut *tx, &task).await?;
        }
        tx.commit().await?;

        tracing::info!("Seeded {} demo tasks", DEMO_TASKS.len());
        Ok(DEMO_TASKS.len())
    }

    /// Round-trip a trivial query to check the database is reachable
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskStore {
    async fn select(&self, criterion: &TaskCriterion) -> Result<Vec<Task>> {
        select_tasks(&self.pool, criterion).await
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<Task>> {
        select_task_by_id(&self.pool, id).await
    }

    async fn insert(&self, task: &Task) -> Result<i64> {
        insert_task(&self.pool, task).await
    }

    async fn select_max_id(&self) -> Result<Option<i64>> {
        select_max_task_id(&self.pool).await
    }

    async fn update(&self, task: &Task) -> Result<u64> {
        update_task(&self.pool, task).await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        delete_task(&self.pool, id).await
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn begin(&self) -> Result<Box<dyn TaskTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTaskTransaction {
            tx: Mutex::new(tx),
        }))
    }
}

/// An open SQLite transaction. Rolled back on drop unless committed.
pub struct SqliteTaskTransaction {
    tx: Mutex<Transaction<'static, Sqlite>>,
}

#[async_trait]
impl TaskRepository for SqliteTaskTransaction {
    async fn select(&self, criterion: &TaskCriterion) -> Result<Vec<Task>> {
        let mut tx = self.tx.lock().await;
        select_tasks(&mut **tx, criterion).await
    }

    async fn select_by_id(&self, id: i64) -> Result<Option<Task>> {
        let mut tx = self.tx.lock().await;
        select_task_by_id(&mut **tx, id).await
    }

    async fn insert(&self, task: &Task) -> Result<i64> {
        let mut tx = self.tx.lock().await;
        insert_task(&mut **tx, task).await
    }

    async fn select_max_id(&self) -> Result<Option<i64>> {
        let mut tx = self.tx.lock().await;
        select_max_task_id(&mut **tx).await
    }

    async fn update(&self, task: &Task) -> Result<u64> {
        let mut tx = self.tx.lock().await;
        update_task(&mut **tx, task).await
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut tx = self.tx.lock().await;
        delete_task(&mut **tx, id).await
    }
}

#[async_trait]
impl TaskTransaction for SqliteTaskTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}

// ============================================================================
// Queries
// ============================================================================

async fn select_tasks<'e, E>(executor: E, criterion: &TaskCriterion) -> Result<Vec<Task>>
where
    E: SqliteExecutor<'e>,
{
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT id, summary, description, status FROM tasks");
    let mut keyword = " WHERE ";

    // instr() keeps the match case-sensitive and treats % and _ literally,
    // unlike SQLite's LIKE.
    if let Some(term) = criterion.summary_term() {
        query
            .push(keyword)
            .push("instr(summary, ")
            .push_bind(term.to_string())
            .push(") > 0");
        keyword = " AND ";
    }

    if !criterion.statuses.is_empty() {
        query.push(keyword).push("status IN (");
        let mut statuses = query.separated(", ");
        for status in &criterion.statuses {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");
    }

    query.push(" ORDER BY id");

    let rows: Vec<TaskRow> = query.build_query_as::<TaskRow>().fetch_all(executor).await?;
    rows.into_iter().map(Task::try_from).collect()
}

async fn select_task_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Task>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<TaskRow> =
        sqlx::query_as("SELECT id, summary, description, status FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(executor)
            .await?;
    row.map(Task::try_from).transpose()
}

async fn insert_task<'e, E>(executor: E, task: &Task) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("INSERT INTO tasks (summary, description, status) VALUES (?, ?, ?)")
        .bind(task.summary.as_str())
        .bind(task.description.as_deref())
        .bind(task.status.as_str())
        .execute(executor)
        .await?;
    Ok(result.last_insert_rowid())
}

async fn select_max_task_id<'e, E>(executor: E) -> Result<Option<i64>>
where
    E: SqliteExecutor<'e>,
{
    let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM tasks")
        .fetch_one(executor)
        .await?;
    Ok(max_id)
}

async fn update_task<'e, E>(executor: E, task: &Task) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let Some(id) = task.id else {
        return Ok(0);
    };
    let result =
        sqlx::query("UPDATE tasks SET summary = ?, description = ?, status = ? WHERE id = ?")
            .bind(task.summary.as_str())
            .bind(task.description.as_deref())
            .bind(task.status.as_str())
            .bind(id)
            .execute(executor)
            .await?;
    Ok(result.rows_affected())
}

async fn delete_task<'e, E>(executor: E, id: i64) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
