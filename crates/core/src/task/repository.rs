//! Task repository traits
//!
//! Defines the interface for task storage operations.

use async_trait::async_trait;

use super::model::{Task, TaskCriterion};
use crate::Result;

/// Repository interface for task queries and mutations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks matching `criterion`, in primary-key order
    async fn select(&self, criterion: &TaskCriterion) -> Result<Vec<Task>>;

    /// Get a task by ID
    async fn select_by_id(&self, id: i64) -> Result<Option<Task>>;

    /// Insert a task, ignoring `task.id`, and return the generated ID
    async fn insert(&self, task: &Task) -> Result<i64>;

    /// Largest ID currently assigned.
    ///
    /// Not safe for recovering the ID of a fresh insert when creates run
    /// concurrently; use the value returned by [`TaskRepository::insert`].
    async fn select_max_id(&self) -> Result<Option<i64>>;

    /// Replace summary, description and status of the row with `task.id`.
    /// Returns the number of rows affected.
    async fn update(&self, task: &Task) -> Result<u64>;

    /// Delete a task by ID. Returns the number of rows affected.
    async fn delete(&self, id: i64) -> Result<u64>;
}

/// A repository scoped to one open transaction
#[async_trait]
pub trait TaskTransaction: TaskRepository {
    /// Make the transaction's writes visible. Dropping without committing
    /// rolls them back.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// A repository that can open transactional scopes over itself
#[async_trait]
pub trait TaskStore: TaskRepository {
    async fn begin(&self) -> Result<Box<dyn TaskTransaction>>;
}
