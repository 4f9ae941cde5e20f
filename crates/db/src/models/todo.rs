//! Todo entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use todo_core::error::CoreError;
use todo_core::todo::normalize_title;
use todo_core::types::{check_record_id, RecordId};

use crate::models::versioned::{FieldKind, FieldValue, VersionMeta, Versioned};

/// A row from the `todo` table (or `todo_audit` for archived revisions).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Todo {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub meta: VersionMeta,
    pub person_id: RecordId,
    pub title: String,
    pub completed: bool,
}

impl Todo {
    /// An unsaved, not-yet-completed todo owned by `person_id`.
    pub fn new(person_id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        Self {
            meta: VersionMeta::unsaved(),
            person_id: person_id.into(),
            title: title.into(),
            completed: false,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.meta.entity_id
    }

    pub fn version(&self) -> &str {
        &self.meta.version
    }
}

impl Versioned for Todo {
    const ENTITY: &'static str = "Todo";

    const FIELDS: &'static [(&'static str, FieldKind)] = &[
        ("person_id", FieldKind::Text),
        ("title", FieldKind::Text),
        ("completed", FieldKind::Bool),
    ];

    fn meta(&self) -> &VersionMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut VersionMeta {
        &mut self.meta
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "person_id" => Some(FieldValue::Text(self.person_id.clone())),
            "title" => Some(FieldValue::Text(self.title.clone())),
            "completed" => Some(FieldValue::Bool(self.completed)),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.person_id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Todo person_id must not be empty".to_string(),
            ));
        }
        check_record_id("person_id", &self.person_id)?;
        let normalized = normalize_title(&self.title)?;
        if normalized != self.title {
            return Err(CoreError::Validation(
                "Todo title must not have surrounding whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request body for creating a todo.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodo {
    pub title: String,
}

/// Request body for updating a todo. All fields are optional.
///
/// When `version` is present the update is rejected with a conflict unless it
/// matches the todo's current version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub version: Option<RecordId>,
}
