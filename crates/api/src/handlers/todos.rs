//! Handlers for the `/todos` resource.
//!
//! Every handler is scoped to the authenticated person. A todo owned by
//! someone else is reported as not found.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use todo_core::error::CoreError;
use todo_core::todo::BulkAction;
use todo_db::models::todo::{CreateTodo, Todo, UpdateTodo};
use todo_db::services::TodoService;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::TodoListParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of `POST /todos/bulk-actions`.
#[derive(Debug, Serialize)]
pub struct BulkActionResult {
    pub message: String,
    /// Updated todos, for `toggle-all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
    /// Number of todos removed, for `clear-completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
}

fn not_found(id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Todo",
        id: id.to_string(),
    })
}

/// Fetch an active todo that belongs to `user`.
async fn find_owned(service: &TodoService, user: &AuthUser, id: &str) -> AppResult<Todo> {
    service
        .get_todo_by_id(id)
        .await?
        .filter(|todo| todo.person_id == user.person_id)
        .ok_or_else(|| not_found(id))
}

/// GET /api/v1/todos
pub async fn list(
    user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<TodoListParams>,
) -> AppResult<Json<DataResponse<Vec<Todo>>>> {
    let service = state.todo_service(&user);
    let todos = match params.status {
        Some(status) => {
            service
                .get_todos_by_completion(&user.person_id, status.completed())
                .await?
        }
        None => service.get_todos_by_person_id(&user.person_id).await?,
    };
    Ok(Json(DataResponse { data: todos }))
}

/// POST /api/v1/todos
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateTodo>,
) -> AppResult<(StatusCode, Json<DataResponse<Todo>>)> {
    let service = state.todo_service(&user);
    let todo = service
        .save_todo(Todo::new(user.person_id.clone(), input.title))
        .await?;

    tracing::info!(
        todo_id = %todo.entity_id(),
        person_id = %user.person_id,
        "Todo created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: todo })))
}

/// GET /api/v1/todos/{id}
pub async fn get_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Todo>>> {
    let service = state.todo_service(&user);
    let todo = find_owned(&service, &user, &id).await?;
    Ok(Json(DataResponse { data: todo }))
}

/// PUT /api/v1/todos/{id}
///
/// When the body carries `version`, the update only applies if the todo is
/// still at that version.
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> AppResult<Json<DataResponse<Todo>>> {
    let service = state.todo_service(&user);
    let mut todo = find_owned(&service, &user, &id).await?;

    if let Some(expected) = &input.version {
        if expected != todo.version() {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Todo {id} is at version {}, not {expected}",
                todo.version()
            ))));
        }
    }

    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }

    let todo = service.save_todo(todo).await?;
    Ok(Json(DataResponse { data: todo }))
}

/// DELETE /api/v1/todos/{id}
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let service = state.todo_service(&user);
    let todo = find_owned(&service, &user, &id).await?;

    if service.delete_todo(&todo).await? {
        tracing::info!(todo_id = %id, person_id = %user.person_id, "Todo deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(&id))
    }
}

/// PATCH /api/v1/todos/toggle/{id}
pub async fn toggle(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Todo>>> {
    let service = state.todo_service(&user);
    find_owned(&service, &user, &id).await?;

    let todo = service
        .toggle_todo_completion(&id)
        .await?
        .ok_or_else(|| not_found(&id))?;
    Ok(Json(DataResponse { data: todo }))
}

/// GET /api/v1/todos/{id}/history
pub async fn history(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<Todo>>>> {
    let service = state.todo_service(&user);
    find_owned(&service, &user, &id).await?;

    let revisions = service.history(&id).await?;
    Ok(Json(DataResponse { data: revisions }))
}

/// POST /api/v1/todos/bulk-actions
///
/// The body is parsed by hand so an unknown `action` is reported as a
/// 400 with a readable message rather than a bare extractor rejection.
pub async fn bulk_action(
    user: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<DataResponse<BulkActionResult>>> {
    let action: BulkAction = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid bulk action: {e}")))?;
    let service = state.todo_service(&user);

    let result = match action {
        BulkAction::ToggleAll { completed } => {
            let todos = service
                .mark_all_todos_completed(&user.person_id, completed)
                .await?;
            let label = if completed { "completed" } else { "active" };
            BulkActionResult {
                message: format!("Marked {} todos as {label}", todos.len()),
                todos: Some(todos),
                deleted_count: None,
            }
        }
        BulkAction::ClearCompleted => {
            let deleted = service.delete_completed_todos(&user.person_id).await?;
            BulkActionResult {
                message: format!("Deleted {deleted} completed todos"),
                todos: None,
                deleted_count: Some(deleted),
            }
        }
    };

    Ok(Json(DataResponse { data: result }))
}
