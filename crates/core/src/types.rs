use crate::error::CoreError;

/// Entity, version and person identifiers are opaque strings. Ids minted by
/// this crate are 32-character lowercase hex (UUID v4, simple format).
pub type RecordId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Longest identifier the `VARCHAR(32)` id columns accept.
pub const MAX_RECORD_ID_LEN: usize = 32;

/// `previous_version` value of a first revision (no predecessor).
pub const SENTINEL_VERSION: &str = "00000000000000000000000000000000";

/// Mint a fresh identifier for an entity or a revision.
pub fn new_record_id() -> RecordId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Whether `version` is the "no predecessor" sentinel.
pub fn is_sentinel(version: &str) -> bool {
    version == SENTINEL_VERSION
}

/// Reject an identifier that would not fit an id column.
pub fn check_record_id(field: &str, id: &str) -> Result<(), CoreError> {
    let len = id.chars().count();
    if len > MAX_RECORD_ID_LEN {
        return Err(CoreError::Validation(format!(
            "{field} too long: {len} chars (max {MAX_RECORD_ID_LEN})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_32_hex_chars() {
        let id = new_record_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn minted_ids_are_unique_and_never_the_sentinel() {
        let a = new_record_id();
        let b = new_record_id();
        assert_ne!(a, b);
        assert!(!is_sentinel(&a));
    }

    #[test]
    fn sentinel_is_32_zeros() {
        assert_eq!(SENTINEL_VERSION.len(), 32);
        assert!(is_sentinel("00000000000000000000000000000000"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn record_ids_longer_than_the_column_are_rejected() {
        assert!(check_record_id("person_id", &new_record_id()).is_ok());
        let err = check_record_id("person_id", &"a".repeat(MAX_RECORD_ID_LEN + 1)).unwrap_err();
        assert!(err.to_string().contains("person_id too long"));
    }
}
