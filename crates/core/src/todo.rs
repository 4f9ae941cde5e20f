//! Todo field rules and bulk-action vocabulary.
//!
//! Titles are trimmed before storage and must fit the `varchar(255)` column.
//! Bulk actions mirror the two list-wide operations clients may request.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Trim surrounding whitespace from a title and validate the result.
///
/// Returns the trimmed title, or a validation error if it is empty or too
/// long.
pub fn normalize_title(title: &str) -> Result<String, CoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Todo title must not be empty".to_string(),
        ));
    }
    let len = trimmed.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Todo title too long: {len} chars (max {MAX_TITLE_LEN})"
        )));
    }
    Ok(trimmed.to_string())
}

/// A list-wide operation over one person's todos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum BulkAction {
    /// Set `completed` on every todo. Defaults to `true` when omitted.
    ToggleAll {
        #[serde(default = "default_completed")]
        completed: bool,
    },
    /// Delete every completed todo.
    ClearCompleted,
}

fn default_completed() -> bool {
    true
}

/// Completion filter for list queries (`?status=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    /// Not yet completed.
    Active,
    Completed,
}

impl TodoStatus {
    /// The `completed` column value this status selects.
    pub fn completed(self) -> bool {
        matches!(self, TodoStatus::Completed)
    }
}
