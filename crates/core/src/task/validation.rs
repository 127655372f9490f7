//! Input validation for task create/update payloads
//!
//! Rules live here rather than in the store: the `tasks` table accepts any
//! summary length, so the 256 character limit is only enforced on input.

use serde::Serialize;

use super::model::{Task, TaskStatus};

pub const SUMMARY_MAX_CHARS: usize = 256;

// The front end shows these as-is.
pub const SUMMARY_REQUIRED: &str = "概要は必須です";
pub const SUMMARY_SIZE: &str = "概要は256文字以内で入力してください";
pub const STATUS_REQUIRED: &str = "ステータスは必須です";
pub const STATUS_PATTERN: &str = "ステータスはTODO, DOING, DONEのいずれかで指定してください";

/// Which rule a field broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationCode {
    NotBlank,
    Size,
    Pattern,
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub default_message: String,
    pub code: ViolationCode,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            default_message: message.into(),
            code,
        }
    }
}

/// Ordered list of field errors. Order follows field declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.0
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

/// Raw, unvalidated task input as received from a client
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Validated task fields, ready to become a [`Task`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub summary: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl TaskDraft {
    /// Check every field, collecting at most one error per field.
    pub fn validate(self) -> Result<TaskFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let summary = match self.summary {
            Some(s) if s.trim().is_empty() => {
                errors.push(FieldError::new("summary", ViolationCode::NotBlank, SUMMARY_REQUIRED));
                None
            }
            None => {
                errors.push(FieldError::new("summary", ViolationCode::NotBlank, SUMMARY_REQUIRED));
                None
            }
            Some(s) if s.chars().count() > SUMMARY_MAX_CHARS => {
                errors.push(FieldError::new("summary", ViolationCode::Size, SUMMARY_SIZE));
                None
            }
            Some(s) => Some(s),
        };

        let status = match self.status.as_deref() {
            None => {
                errors.push(FieldError::new("status", ViolationCode::NotBlank, STATUS_REQUIRED));
                None
            }
            Some(s) if s.trim().is_empty() => {
                errors.push(FieldError::new("status", ViolationCode::NotBlank, STATUS_REQUIRED));
                None
            }
            Some(s) => match parse_status(s) {
                Ok(status) => Some(status),
                Err(e) => {
                    errors.push(e);
                    None
                }
            },
        };

        match (summary, status) {
            (Some(summary), Some(status)) if errors.is_empty() => Ok(TaskFields {
                summary,
                description: self.description,
                status,
            }),
            _ => Err(errors),
        }
    }
}

impl TaskFields {
    /// An unsaved task; the store assigns the id.
    pub fn into_new_task(self) -> Task {
        Task {
            id: None,
            summary: self.summary,
            description: self.description,
            status: self.status,
        }
    }

    /// A task addressed at an existing row
    pub fn into_task(self, id: i64) -> Task {
        Task {
            id: Some(id),
            ..self.into_new_task()
        }
    }
}

/// Parse a client-supplied status, reporting failures against field `status`.
pub fn parse_status(value: &str) -> Result<TaskStatus, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new("status", ViolationCode::Pattern, STATUS_PATTERN))
}
