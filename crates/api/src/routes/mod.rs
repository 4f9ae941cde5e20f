pub mod health;
pub mod todos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /todos                          list (?status=), create
/// /todos/bulk-actions             toggle-all, clear-completed (POST)
/// /todos/toggle/{id}              toggle completion (PATCH)
/// /todos/{id}                     get, update, delete
/// /todos/{id}/history             archived revisions (GET)
/// ```
///
/// Every route requires a Bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/todos", todos::router())
}
