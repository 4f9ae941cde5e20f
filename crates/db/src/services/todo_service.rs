//! Todo list operations for one person.
//!
//! The service holds no state of its own; every call is one or more
//! [`RecordStore`] operations. It does not check ownership: callers pass the
//! `person_id` / `todo_id` pair they have already authorised.
//!
//! Bulk operations save or delete records one at a time with no spanning
//! transaction. If one step fails the error is returned and the steps before
//! it stay committed.

use todo_core::todo::normalize_title;

use crate::models::todo::Todo;
use crate::store::{Filter, RecordStore, StoreResult};

#[derive(Clone)]
pub struct TodoService {
    todos: RecordStore<Todo>,
}

impl TodoService {
    pub fn new(todos: RecordStore<Todo>) -> Self {
        Self { todos }
    }

    /// Create or update a todo. The title is trimmed before storage.
    pub async fn save_todo(&self, mut todo: Todo) -> StoreResult<Todo> {
        todo.title = normalize_title(&todo.title)?;
        self.todos.save(todo).await
    }

    pub async fn get_todos_by_person_id(&self, person_id: &str) -> StoreResult<Vec<Todo>> {
        self.todos
            .get_many(&Filter::new().eq("person_id", person_id))
            .await
    }

    /// The active todo with this id, or `None`.
    pub async fn get_todo_by_id(&self, todo_id: &str) -> StoreResult<Option<Todo>> {
        self.todos.get_one(&Filter::by_entity_id(todo_id)).await
    }

    /// Soft-delete a todo. Returns `false` if it was already gone.
    pub async fn delete_todo(&self, todo: &Todo) -> StoreResult<bool> {
        self.todos.delete(todo).await
    }

    /// Soft-delete a todo by id. Returns `false` if no active todo has it.
    pub async fn delete_todo_by_id(&self, todo_id: &str) -> StoreResult<bool> {
        match self.get_todo_by_id(todo_id).await? {
            Some(todo) => self.delete_todo(&todo).await,
            None => Ok(false),
        }
    }

    pub async fn get_completed_todos_by_person_id(
        &self,
        person_id: &str,
    ) -> StoreResult<Vec<Todo>> {
        self.get_todos_by_completion(person_id, true).await
    }

    /// Todos that are not yet completed.
    pub async fn get_active_todos_by_person_id(&self, person_id: &str) -> StoreResult<Vec<Todo>> {
        self.get_todos_by_completion(person_id, false).await
    }

    pub async fn get_todos_by_completion(
        &self,
        person_id: &str,
        completed: bool,
    ) -> StoreResult<Vec<Todo>> {
        self.todos
            .get_many(
                &Filter::new()
                    .eq("person_id", person_id)
                    .eq("completed", completed),
            )
            .await
    }

    /// Flip `completed` on a todo. Returns `None` if it does not exist.
    ///
    /// A toggle that races another write to the same todo fails with a
    /// conflict; the caller decides whether to retry.
    pub async fn toggle_todo_completion(&self, todo_id: &str) -> StoreResult<Option<Todo>> {
        let Some(mut todo) = self.get_todo_by_id(todo_id).await? else {
            return Ok(None);
        };
        todo.completed = !todo.completed;
        self.save_todo(todo).await.map(Some)
    }

    /// Set `completed` on every todo of a person and return the updated todos.
    pub async fn mark_all_todos_completed(
        &self,
        person_id: &str,
        completed: bool,
    ) -> StoreResult<Vec<Todo>> {
        let todos = self.get_todos_by_person_id(person_id).await?;
        let mut updated = Vec::with_capacity(todos.len());
        for mut todo in todos {
            todo.completed = completed;
            updated.push(self.save_todo(todo).await?);
        }
        tracing::info!(person_id, completed, count = updated.len(), "Marked all todos");
        Ok(updated)
    }

    /// Delete every completed todo of a person. Returns how many were deleted.
    pub async fn delete_completed_todos(&self, person_id: &str) -> StoreResult<usize> {
        let completed = self.get_completed_todos_by_person_id(person_id).await?;
        let mut deleted = 0;
        for todo in &completed {
            if self.delete_todo(todo).await? {
                deleted += 1;
            }
        }
        tracing::info!(person_id, deleted, "Cleared completed todos");
        Ok(deleted)
    }

    /// Archived revisions of a todo, newest first.
    pub async fn history(&self, todo_id: &str) -> StoreResult<Vec<Todo>> {
        self.todos.history(todo_id).await
    }
}
