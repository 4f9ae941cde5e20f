//! Equality filters for store reads.

use todo_core::error::CoreError;

use crate::models::versioned::{FieldValue, Versioned};

/// A conjunction of `field = value` terms.
///
/// An empty filter matches every active record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    terms: Vec<(String, FieldValue)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `field = value` term.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    /// Filter on a single logical entity.
    pub fn by_entity_id(entity_id: impl Into<String>) -> Self {
        Self::new().eq("entity_id", entity_id.into())
    }

    pub fn terms(&self) -> &[(String, FieldValue)] {
        &self.terms
    }

    /// Check that every term names a filterable field of `T` with a value of
    /// the matching kind.
    pub fn check<T: Versioned>(&self) -> Result<(), CoreError> {
        for (field, value) in &self.terms {
            match T::field_kind(field) {
                None => {
                    return Err(CoreError::Validation(format!(
                        "Unknown filter field '{field}' for {}",
                        T::ENTITY
                    )))
                }
                Some(kind) if kind != value.kind() => {
                    return Err(CoreError::Validation(format!(
                        "Filter field '{field}' expects a {kind:?} value"
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Whether `record` satisfies every term. Activity is not considered.
    pub fn matches<T: Versioned>(&self, record: &T) -> bool {
        self.terms
            .iter()
            .all(|(field, value)| record.field_value(field).as_ref() == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::todo::Todo;

    fn todo(person_id: &str, completed: bool) -> Todo {
        let mut todo = Todo::new(person_id, "Buy milk");
        todo.completed = completed;
        todo
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&todo("p1", false)));
    }

    #[test]
    fn all_terms_must_match() {
        let filter = Filter::new().eq("person_id", "p1").eq("completed", true);
        assert!(filter.matches(&todo("p1", true)));
        assert!(!filter.matches(&todo("p1", false)));
        assert!(!filter.matches(&todo("p2", true)));
    }

    #[test]
    fn null_changed_by_never_matches() {
        let filter = Filter::new().eq("changed_by_id", "");
        assert!(!filter.matches(&todo("p1", false)));
    }

    #[test]
    fn check_rejects_unknown_fields() {
        let err = Filter::new().eq("colour", "red").check::<Todo>().unwrap_err();
        assert!(err.to_string().contains("Unknown filter field 'colour'"));
    }

    #[test]
    fn check_rejects_kind_mismatch() {
        let err = Filter::new()
            .eq("completed", "true")
            .check::<Todo>()
            .unwrap_err();
        assert!(err.to_string().contains("expects a Bool value"));
    }

    #[test]
    fn check_accepts_known_fields() {
        let filter = Filter::by_entity_id("abc").eq("person_id", "p1").eq("completed", false);
        assert!(filter.check::<Todo>().is_ok());
    }
}
