//! Task module
//!
//! This module contains task-related types and logic.

mod model;
mod repository;
mod service;
mod sqlite_store;
mod validation;

pub use model::*;
pub use repository::{TaskRepository, TaskStore, TaskTransaction};
pub use service::TaskService;
pub use sqlite_store::{SqliteTaskStore, SqliteTaskTransaction};
pub use validation::*;
