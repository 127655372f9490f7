//! Core library for the task tracker
//!
//! This crate contains the business logic behind the HTTP layer:
//! - Task model and search criteria
//! - Input validation
//! - The repository traits and their SQLite implementation
//! - The task service that owns the reread-after-write pattern

pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
