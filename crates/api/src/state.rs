use std::sync::Arc;

use todo_db::models::todo::Todo;
use todo_db::services::TodoService;
use todo_db::store::{RecordBackend, RecordStore};

use crate::config::ServerConfig;
use crate::middleware::auth::AuthUser;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Backend holding todo records (PostgreSQL or in-memory).
    pub todo_backend: Arc<dyn RecordBackend<Todo>>,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// A [`TodoService`] whose writes are attributed to `user`.
    pub fn todo_service(&self, user: &AuthUser) -> TodoService {
        let store = RecordStore::new(Arc::clone(&self.todo_backend))
            .acting_as(user.person_id.clone());
        TodoService::new(store)
    }
}
