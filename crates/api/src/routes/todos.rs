use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::todos;
use crate::state::AppState;

/// Routes mounted at `/todos`.
///
/// ```text
/// GET    /                 list
/// POST   /                 create
/// POST   /bulk-actions     bulk_action
/// PATCH  /toggle/{id}      toggle
/// GET    /{id}             get_by_id
/// PUT    /{id}             update
/// DELETE /{id}             delete
/// GET    /{id}/history     history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(todos::list).post(todos::create))
        .route("/bulk-actions", post(todos::bulk_action))
        .route("/toggle/{id}", patch(todos::toggle))
        .route(
            "/{id}",
            get(todos::get_by_id)
                .put(todos::update)
                .delete(todos::delete),
        )
        .route("/{id}/history", get(todos::history))
}
