//! Task API endpoints
//!
//! RESTful API for task CRUD operations.

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use todo_core::task::{
    parse_status, FieldError, Task, TaskCriterion, TaskDraft, TaskStatus, ValidationErrors,
};

use crate::state::AppState;

type RouteError = Response;

// ============================================================================
// Request/Response types
// ============================================================================

/// Body of `POST /api/tasks` and `PUT /api/tasks/{id}`.
///
/// Every field is optional here so that missing values are reported as
/// validation errors rather than as deserialization failures.
#[derive(Debug, Default, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl From<TaskRequest> for TaskDraft {
    fn from(req: TaskRequest) -> Self {
        Self {
            summary: req.summary,
            description: req.description,
            status: req.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Option<i64>,
    pub summary: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            summary: task.summary,
            description: task.description,
            status: task.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub message: String,
    pub errors: Vec<FieldError>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn validation_response(errors: ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ValidationErrorResponse {
            message: "Validation failed".to_string(),
            errors: errors.into_vec(),
        }),
    )
        .into_response()
}

fn map_task_error(err: todo_core::Error) -> Response {
    match err {
        todo_core::Error::TaskNotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("Task {} not found", id))
        }
        todo_core::Error::InvalidInput(message) => error_response(StatusCode::BAD_REQUEST, message),
        err => {
            tracing::error!("Task store failure: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn json_body(payload: Result<Json<TaskRequest>, JsonRejection>) -> Result<TaskRequest, RouteError> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))
}

// ============================================================================
// Query parsing
// ============================================================================

/// Build a search criterion from `summary=<s>&status=<S>[&status=<S>...]`.
///
/// `status` may repeat and each value may itself be a comma-separated list.
fn parse_search_query(raw: Option<&str>) -> Result<TaskCriterion, RouteError> {
    let mut criterion = TaskCriterion::all();
    let mut errors = ValidationErrors::new();

    for pair in raw.unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key)?;
        let value = decode_component(value)?;

        match key.as_str() {
            "summary" => criterion.summary_contains = Some(value),
            "status" => {
                for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    match parse_status(item) {
                        Ok(status) => {
                            criterion.statuses.insert(status);
                        }
                        Err(e) if !errors.has_field("status") => errors.push(e),
                        Err(_) => {}
                    }
                }
            }
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(criterion)
    } else {
        Err(validation_response(errors))
    }
}

fn decode_component(raw: &str) -> Result<String, RouteError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Malformed query string"))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List tasks matching the query filters
async fn list_tasks(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<TaskResponse>>, RouteError> {
    let criterion = parse_search_query(query.as_deref())?;
    let tasks = state
        .task_service()
        .find(&criterion)
        .await
        .map_err(map_task_error)?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// GET /api/tasks/{id} - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TaskResponse>, RouteError> {
    let task = state
        .task_service()
        .find_by_id(id)
        .await
        .map_err(map_task_error)?;

    match task {
        Some(t) => Ok(Json(TaskResponse::from(t))),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Task {} not found", id),
        )),
    }
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), RouteError> {
    let req = json_body(payload)?;
    let fields = TaskDraft::from(req)
        .validate()
        .map_err(validation_response)?;

    let created = state
        .task_service()
        .create(fields.into_new_task())
        .await
        .map_err(map_task_error)?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(created))))
}

/// PUT /api/tasks/{id} - Replace a task
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>, RouteError> {
    let req = json_body(payload)?;
    let fields = TaskDraft::from(req)
        .validate()
        .map_err(validation_response)?;

    let updated = state
        .task_service()
        .update(fields.into_task(id))
        .await
        .map_err(map_task_error)?;

    Ok(Json(TaskResponse::from(updated)))
}

/// DELETE /api/tasks/{id} - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, RouteError> {
    state
        .task_service()
        .delete(id)
        .await
        .map_err(map_task_error)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use todo_core::task::SqliteTaskStore;

    use crate::state::AppState;

    async fn build_app() -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::open(temp_dir.path().join("todo.db"))
            .await
            .unwrap();
        store.seed_demo().await.unwrap();
        let app = super::router().with_state(AppState::with_store(store));
        (app, temp_dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, payload)
    }

    fn ids(payload: &Value) -> Vec<i64> {
        payload
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn list_returns_all_tasks_in_id_order() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&payload), vec![1, 2]);
        assert_eq!(payload[0]["summary"], "Spring Boot を学ぶ");
        assert_eq!(payload[0]["description"], "TODO アプリを作る");
        assert_eq!(payload[0]["status"], "DONE");
        assert_eq!(payload[1]["status"], "TODO");
    }

    #[tokio::test]
    async fn list_filters_by_summary_and_status() {
        let (app, _temp_dir) = build_app().await;

        let (_, by_summary) = send(&app, "GET", "/api/tasks?summary=Spring+Boot", None).await;
        assert_eq!(ids(&by_summary), vec![1]);

        let (_, encoded) = send(&app, "GET", "/api/tasks?summary=Spring%20Security", None).await;
        assert_eq!(ids(&encoded), vec![2]);

        let (_, by_status) = send(&app, "GET", "/api/tasks?status=TODO", None).await;
        assert_eq!(ids(&by_status), vec![2]);

        let (_, combined) =
            send(&app, "GET", "/api/tasks?summary=Spring&status=DONE", None).await;
        assert_eq!(ids(&combined), vec![1]);

        let (_, repeated) =
            send(&app, "GET", "/api/tasks?status=TODO&status=DONE", None).await;
        assert_eq!(ids(&repeated), vec![1, 2]);

        let (_, comma) = send(&app, "GET", "/api/tasks?status=TODO,DOING", None).await;
        assert_eq!(ids(&comma), vec![2]);

        let (_, blank) = send(&app, "GET", "/api/tasks?summary=&status=", None).await;
        assert_eq!(ids(&blank), vec![1, 2]);
    }

    #[tokio::test]
    async fn list_rejects_unknown_status() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(&app, "GET", "/api/tasks?status=LATER", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["errors"][0]["field"], "status");
        assert_eq!(payload["errors"][0]["code"], "Pattern");
    }

    #[tokio::test]
    async fn get_task_found_and_missing() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(&app, "GET", "/api/tasks/2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["id"], 2);
        assert_eq!(payload["summary"], "Spring Security を学ぶ");

        let (status, _) = send(&app, "GET", "/api/tasks/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/api/tasks/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_returns_created_task_with_generated_id() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({"summary": "New task", "description": "details", "status": "TODO"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(payload["id"], 3);
        assert_eq!(payload["summary"], "New task");
        assert_eq!(payload["description"], "details");
        assert_eq!(payload["status"], "TODO");

        let (status, fetched) = send(&app, "GET", "/api/tasks/3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, payload);
    }

    #[tokio::test]
    async fn create_without_description_stores_null() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({"summary": "Bare", "status": "DOING"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(payload["description"].is_null());
    }

    #[tokio::test]
    async fn create_with_blank_summary_is_rejected() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({"summary": "", "description": "x", "status": "TODO"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["message"], "Validation failed");
        let errors = payload["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["field"], "summary");
        assert_eq!(errors[0]["code"], "NotBlank");
        assert_eq!(errors[0]["defaultMessage"], "概要は必須です");

        // Nothing was written
        let (_, all) = send(&app, "GET", "/api/tasks", None).await;
        assert_eq!(ids(&all), vec![1, 2]);
    }

    #[tokio::test]
    async fn create_reports_every_invalid_field() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "POST",
            "/api/tasks",
            Some(json!({"summary": "a".repeat(257)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["errors"][0]["field"], "summary");
        assert_eq!(payload["errors"][0]["code"], "Size");
        assert_eq!(payload["errors"][1]["field"], "status");
        assert_eq!(payload["errors"][1]["code"], "NotBlank");
    }

    #[tokio::test]
    async fn create_with_malformed_json_is_bad_request() {
        let (app, _temp_dir) = build_app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/tasks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "PUT",
            "/api/tasks/1",
            Some(json!({"summary": "Updated", "description": "changed", "status": "DOING"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["id"], 1);
        assert_eq!(payload["summary"], "Updated");
        assert_eq!(payload["status"], "DOING");

        let (_, fetched) = send(&app, "GET", "/api/tasks/1", None).await;
        assert_eq!(fetched["description"], "changed");
    }

    #[tokio::test]
    async fn update_with_invalid_status_is_rejected() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(
            &app,
            "PUT",
            "/api/tasks/1",
            Some(json!({"summary": "Still valid", "status": "INVALID"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["errors"][0]["field"], "status");

        let (_, unchanged) = send(&app, "GET", "/api/tasks/1", None).await;
        assert_eq!(unchanged["status"], "DONE");
    }

    #[tokio::test]
    async fn update_missing_task_is_not_found() {
        let (app, _temp_dir) = build_app().await;

        let (status, _) = send(
            &app,
            "PUT",
            "/api/tasks/999",
            Some(json!({"summary": "Ghost", "status": "TODO"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (app, _temp_dir) = build_app().await;

        let (status, payload) = send(&app, "DELETE", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(payload.is_null());

        let (status, _) = send(&app, "GET", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", "/api/tasks/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
