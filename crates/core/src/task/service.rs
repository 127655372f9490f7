//! Task service
//!
//! Orchestrates repository calls. Writes never return the caller's value
//! directly: the row is read back inside the same transaction so the result
//! carries the store-assigned id and whatever the store actually saved.

use super::model::{Task, TaskCriterion};
use super::repository::TaskStore;
use crate::{Error, Result};

pub struct TaskService<S> {
    store: S,
}

impl<S: TaskStore> TaskService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tasks matching `criterion`
    pub async fn find(&self, criterion: &TaskCriterion) -> Result<Vec<Task>> {
        self.store.select(criterion).await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Task>> {
        self.store.select_by_id(id).await
    }

    /// Insert `task` (its id is ignored) and return the stored row.
    ///
    /// Falls back to the input if the re-read comes back empty.
    pub async fn create(&self, task: Task) -> Result<Task> {
        let tx = self.store.begin().await?;
        let id = tx.insert(&task).await?;
        let created = tx.select_by_id(id).await?;
        tx.commit().await?;

        tracing::debug!(task_id = id, "Created task");
        Ok(created.unwrap_or(task))
    }

    /// Replace every field of the task with `task.id` and return the stored row.
    ///
    /// Fails with [`Error::TaskNotFound`] when no row has that id.
    pub async fn update(&self, task: Task) -> Result<Task> {
        let id = task
            .id
            .ok_or_else(|| Error::InvalidInput("Cannot update a task without an id".to_string()))?;

        let tx = self.store.begin().await?;
        if tx.update(&task).await? == 0 {
            return Err(Error::TaskNotFound(id));
        }
        let updated = tx.select_by_id(id).await?;
        tx.commit().await?;

        tracing::debug!(task_id = id, status = %task.status, "Updated task");
        Ok(updated.unwrap_or(task))
    }

    /// Delete by id. Deleting an id that does not exist is not an error.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let removed = self.store.delete(id).await?;
        if removed == 0 {
            tracing::debug!(task_id = id, "Delete matched no task");
        }
        Ok(())
    }
}
