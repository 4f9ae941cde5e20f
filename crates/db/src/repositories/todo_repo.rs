//! Repository for the `todo` and `todo_audit` tables.

use std::sync::Arc;

use sqlx::query_builder::Separated;
use sqlx::{PgPool, Postgres};

use crate::models::todo::Todo;
use crate::store::{PgBackend, PgRecord, RecordBackend, RecordStore};

impl PgRecord for Todo {
    const TABLE: &'static str = "todo";
    const AUDIT_TABLE: &'static str = "todo_audit";
    const COLUMNS: &'static [&'static str] = &["person_id", "title", "completed"];

    fn push_values(&self, row: &mut Separated<'_, '_, Postgres, &'static str>) {
        row.push_bind(self.person_id.clone())
            .push_bind(self.title.clone())
            .push_bind(self.completed);
    }
}

/// Constructors for todo stores.
pub struct TodoRepo;

impl TodoRepo {
    /// A todo store backed by the `todo` / `todo_audit` tables.
    pub fn postgres(pool: PgPool) -> RecordStore<Todo> {
        RecordStore::new(Self::postgres_backend(pool))
    }

    /// The shared PostgreSQL backend for todos.
    pub fn postgres_backend(pool: PgPool) -> Arc<dyn RecordBackend<Todo>> {
        Arc::new(PgBackend::<Todo>::new(pool))
    }
}
