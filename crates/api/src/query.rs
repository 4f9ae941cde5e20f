//! Query parameter types for API handlers.

use serde::Deserialize;
use todo_core::todo::TodoStatus;

/// Query parameters for `GET /todos` (`?status=active|completed`).
///
/// Without `status` every todo of the caller is listed.
#[derive(Debug, Default, Deserialize)]
pub struct TodoListParams {
    pub status: Option<TodoStatus>,
}
