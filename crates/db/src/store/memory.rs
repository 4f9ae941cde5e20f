//! In-process backend: a live map plus an append-only audit arena.
//!
//! All tables sit behind one `RwLock`, so each compare-and-swap runs under a
//! single write guard.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use todo_core::error::CoreError;
use todo_core::types::RecordId;

use crate::models::versioned::Versioned;
use crate::store::{Filter, RecordBackend, ReplaceOutcome, StoreResult};

struct Tables<T> {
    live: HashMap<RecordId, T>,
    audit: Vec<T>,
    /// `(entity_id, version)` -> position in `audit`.
    audit_index: HashMap<(RecordId, RecordId), usize>,
}

/// Memory-backed [`RecordBackend`]. Contents are lost when dropped.
pub struct MemoryBackend<T> {
    tables: RwLock<Tables<T>>,
}

impl<T> MemoryBackend<T> {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                live: HashMap::new(),
                audit: Vec::new(),
                audit_index: HashMap::new(),
            }),
        }
    }
}

impl<T> Default for MemoryBackend<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Versioned> RecordBackend<T> for MemoryBackend<T> {
    async fn insert(&self, record: &T) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let entity_id = &record.meta().entity_id;
        if tables.live.contains_key(entity_id) {
            return Err(CoreError::Conflict(format!(
                "{} {entity_id} already exists",
                T::ENTITY
            ))
            .into());
        }
        tables.live.insert(entity_id.clone(), record.clone());
        Ok(())
    }

    async fn replace(&self, expected_version: &str, next: &T) -> StoreResult<ReplaceOutcome> {
        let mut tables = self.tables.write().await;
        let entity_id = &next.meta().entity_id;

        let Some(live) = tables.live.get(entity_id) else {
            return Ok(ReplaceOutcome::Missing);
        };
        if !live.meta().active || live.meta().version != expected_version {
            return Ok(ReplaceOutcome::Conflict {
                live_version: live.meta().version.clone(),
                live_active: live.meta().active,
            });
        }

        let mut archived = live.clone();
        archived.meta_mut().active = false;
        let key = (entity_id.clone(), archived.meta().version.clone());
        if tables.audit_index.contains_key(&key) {
            return Err(CoreError::Conflict(format!(
                "{} {entity_id} version {} is already archived",
                T::ENTITY,
                key.1
            ))
            .into());
        }

        let position = tables.audit.len();
        tables.audit.push(archived);
        tables.audit_index.insert(key, position);
        tables.live.insert(entity_id.clone(), next.clone());
        Ok(ReplaceOutcome::Replaced)
    }

    async fn find_active(&self, filter: &Filter) -> StoreResult<Vec<T>> {
        let tables = self.tables.read().await;
        Ok(tables
            .live
            .values()
            .filter(|record| record.meta().active && filter.matches(*record))
            .cloned()
            .collect())
    }

    async fn find_live(&self, entity_id: &str) -> StoreResult<Option<T>> {
        let tables = self.tables.read().await;
        Ok(tables.live.get(entity_id).cloned())
    }

    async fn find_archived(&self, entity_id: &str) -> StoreResult<Vec<T>> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .filter(|record| record.meta().entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
