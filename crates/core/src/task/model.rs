//! Task model definitions

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Task status. There is no enforced transition graph between values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Doing => "DOING",
            Self::Done => "DONE",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    /// Exact, case-sensitive match on the upper-case names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "TODO" => Ok(Self::Todo),
            "DOING" => Ok(Self::Doing),
            "DONE" => Ok(Self::Done),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported task status '{}'",
                value
            ))),
        }
    }
}

/// A unit of work.
///
/// `id` is `None` until the store assigns one. Values are never mutated after
/// a write; the service re-reads the row and returns a fresh `Task` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub summary: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl Task {
    /// Create an unsaved task with the given summary
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            id: None,
            summary: summary.into(),
            description: None,
            status: TaskStatus::default(),
        }
    }

    /// Set the id
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }
}

/// Search filter for task listings.
///
/// A blank `summary_contains` and an empty `statuses` set both mean
/// "no filter" for that predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCriterion {
    pub summary_contains: Option<String>,
    pub statuses: BTreeSet<TaskStatus>,
}

impl TaskCriterion {
    /// Criterion matching every task
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_summary(mut self, term: impl Into<String>) -> Self {
        self.summary_contains = Some(term.into());
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    /// The summary term, if it should constrain the search
    pub fn summary_term(&self) -> Option<&str> {
        self.summary_contains
            .as_deref()
            .filter(|term| !term.is_empty())
    }

    /// Whether `task` satisfies both predicates
    pub fn matches(&self, task: &Task) -> bool {
        let summary_ok = self
            .summary_term()
            .map_or(true, |term| task.summary.contains(term));
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&task.status);
        summary_ok && status_ok
    }
}
