//! Columns and behaviour shared by every entity under version control.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use todo_core::error::CoreError;
use todo_core::types::{RecordId, Timestamp, SENTINEL_VERSION};

/// Version-control columns embedded in every persisted entity.
///
/// `entity_id` identifies the logical entity for its whole history while
/// `version` identifies one revision. `previous_version` links each revision
/// to the one it replaced; the first revision points at [`SENTINEL_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct VersionMeta {
    pub entity_id: RecordId,
    pub version: RecordId,
    pub previous_version: RecordId,
    pub active: bool,
    pub changed_by_id: Option<RecordId>,
    pub changed_on: Timestamp,
}

impl VersionMeta {
    /// Metadata for a record that has never been saved.
    pub fn unsaved() -> Self {
        Self {
            entity_id: RecordId::new(),
            version: RecordId::new(),
            previous_version: SENTINEL_VERSION.to_string(),
            active: true,
            changed_by_id: None,
            changed_on: chrono::Utc::now(),
        }
    }

    /// A record with no `entity_id` is inserted rather than updated.
    pub fn is_new(&self) -> bool {
        self.entity_id.is_empty()
    }
}

impl Default for VersionMeta {
    fn default() -> Self {
        Self::unsaved()
    }
}

/// Value of a filterable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Bool(_) => FieldKind::Bool,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Column type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
}

/// Version-control fields that filters may reference. `active` is excluded:
/// reads always select active rows.
pub const META_FIELDS: &[(&str, FieldKind)] = &[
    ("entity_id", FieldKind::Text),
    ("version", FieldKind::Text),
    ("previous_version", FieldKind::Text),
    ("changed_by_id", FieldKind::Text),
];

/// An entity persisted through [`crate::store::RecordStore`].
pub trait Versioned: Clone + Send + Sync + 'static {
    /// Human-readable entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Entity-specific filterable fields and their kinds.
    const FIELDS: &'static [(&'static str, FieldKind)];

    fn meta(&self) -> &VersionMeta;

    fn meta_mut(&mut self) -> &mut VersionMeta;

    /// Value of an entity-specific field listed in [`Self::FIELDS`].
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Reject records whose required fields are missing or malformed.
    fn validate(&self) -> Result<(), CoreError> {
        Ok(())
    }

    /// Value of any filterable field, version-control or entity-specific.
    ///
    /// A null `changed_by_id` has no value and never matches a filter term.
    fn field_value(&self, name: &str) -> Option<FieldValue> {
        let meta = self.meta();
        match name {
            "entity_id" => Some(FieldValue::Text(meta.entity_id.clone())),
            "version" => Some(FieldValue::Text(meta.version.clone())),
            "previous_version" => Some(FieldValue::Text(meta.previous_version.clone())),
            "changed_by_id" => meta.changed_by_id.clone().map(FieldValue::Text),
            other => self.field(other),
        }
    }

    /// Kind of a filterable field, or `None` if filters may not use it.
    fn field_kind(name: &str) -> Option<FieldKind> {
        META_FIELDS
            .iter()
            .chain(Self::FIELDS.iter())
            .find(|(field, _)| *field == name)
            .map(|(_, kind)| *kind)
    }
}
