//! Integration tests for the PostgreSQL record backend.
//!
//! Exercises the todo store against a real database to verify that:
//! - Inserts land in `todo` with a sentinel `previous_version`
//! - Updates archive the prior revision into `todo_audit`
//! - Stale saves are rejected by the row-locked compare-and-swap
//! - Soft deletes hide the todo but keep its history
//!
//! Requires `DATABASE_URL` pointing at a PostgreSQL server.

use assert_matches::assert_matches;
use sqlx::PgPool;
use todo_core::error::CoreError;
use todo_core::types::SENTINEL_VERSION;
use todo_db::models::todo::Todo;
use todo_db::repositories::TodoRepo;
use todo_db::services::TodoService;
use todo_db::store::{Filter, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn service(pool: PgPool) -> TodoService {
    TodoService::new(TodoRepo::postgres(pool).acting_as("p1"))
}

async fn audit_count(pool: &PgPool, entity_id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM todo_audit WHERE entity_id = $1")
        .bind(entity_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

// ---------------------------------------------------------------------------
// Test: insert writes the first revision
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_insert_writes_first_revision(pool: PgPool) {
    let service = service(pool.clone());
    let todo = service
        .save_todo(Todo::new("p1", "  Buy milk  "))
        .await
        .unwrap();

    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.meta.previous_version, SENTINEL_VERSION);
    assert_eq!(todo.meta.changed_by_id.as_deref(), Some("p1"));
    assert_eq!(audit_count(&pool, todo.entity_id()).await, 0);

    let fetched = service.get_todo_by_id(todo.entity_id()).await.unwrap().unwrap();
    assert_eq!(fetched, todo);
}

// ---------------------------------------------------------------------------
// Test: updates archive the superseded revision
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_updates_archive_previous_revisions(pool: PgPool) {
    let service = service(pool.clone());
    let todo = service.save_todo(Todo::new("p1", "Buy milk")).await.unwrap();

    service.toggle_todo_completion(todo.entity_id()).await.unwrap();
    service.toggle_todo_completion(todo.entity_id()).await.unwrap();

    assert_eq!(audit_count(&pool, todo.entity_id()).await, 2);

    let store = TodoRepo::postgres(pool);
    assert_eq!(store.verify_chain(todo.entity_id()).await.unwrap(), 3);

    let history = store.history(todo.entity_id()).await.unwrap();
    assert!(history.iter().all(|revision| !revision.meta.active));
    assert_eq!(history.last().unwrap().version(), todo.version());
}

// ---------------------------------------------------------------------------
// Test: stale save is rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_stale_save_conflicts(pool: PgPool) {
    let service = service(pool);
    let base = service.save_todo(Todo::new("p1", "Buy milk")).await.unwrap();

    let mut first = base.clone();
    first.completed = true;
    let mut second = base.clone();
    second.title = "Buy bread".to_string();

    let (a, b) = tokio::join!(service.save_todo(first), service.save_todo(second));
    let conflicts = [&a, &b]
        .iter()
        .filter(|result| matches!(result, Err(StoreError::Core(CoreError::Conflict(_)))))
        .count();
    assert_eq!(conflicts, 1, "exactly one racing save must lose");
    assert!(a.is_ok() || b.is_ok());
}

// ---------------------------------------------------------------------------
// Test: soft delete hides the todo and keeps its history
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_soft_delete_keeps_history(pool: PgPool) {
    let service = service(pool.clone());
    let todo = service.save_todo(Todo::new("p1", "Buy milk")).await.unwrap();

    assert!(service.delete_todo_by_id(todo.entity_id()).await.unwrap());
    assert!(!service.delete_todo_by_id(todo.entity_id()).await.unwrap());
    assert!(service.get_todo_by_id(todo.entity_id()).await.unwrap().is_none());
    assert_eq!(audit_count(&pool, todo.entity_id()).await, 1);

    let err = service.save_todo(todo).await.unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Test: filtered lists use person and completion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_filtered_lists(pool: PgPool) {
    let service = service(pool.clone());
    for (title, completed) in [("One", true), ("Two", true), ("Three", false)] {
        let mut todo = Todo::new("p1", title);
        todo.completed = completed;
        service.save_todo(todo).await.unwrap();
    }
    service.save_todo(Todo::new("p2", "Other")).await.unwrap();

    assert_eq!(service.get_todos_by_person_id("p1").await.unwrap().len(), 3);
    assert_eq!(service.delete_completed_todos("p1").await.unwrap(), 2);
    assert_eq!(service.get_todos_by_person_id("p1").await.unwrap().len(), 1);

    let store = TodoRepo::postgres(pool);
    let completed = store
        .get_one(&Filter::new().eq("person_id", "p1").eq("completed", true))
        .await
        .unwrap();
    assert!(completed.is_none());
}
